//! Configuration for the allocator facade and the namespace context.
//!
//! Both structs deserialize from any serde format with every field optional,
//! so a manifest only needs to spell out what it changes.

use serde::{Deserialize, Serialize};

/// Default bound on the ancestor walk used by absolute-ization.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default path segment separator.
pub const DEFAULT_SEPARATOR: char = '\\';

/// Allocator settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
    /// Upper bound on live bytes; `None` means only the system limit applies.
    pub limit_bytes: Option<usize>,
}

impl AllocatorConfig {
    pub const fn unlimited() -> Self {
        Self { limit_bytes: None }
    }

    pub const fn with_limit(limit_bytes: usize) -> Self {
        Self {
            limit_bytes: Some(limit_bytes),
        }
    }
}

/// Settings for a [`Namespace`](crate::namespace::Namespace) context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamespaceConfig {
    /// Character separating segments in textual paths.
    pub separator: char,
    /// Maximum number of ancestors visited before giving up.
    pub max_depth: usize,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
