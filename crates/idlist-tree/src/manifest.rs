//! TOML manifest describing a tree namespace.
//!
//! ```toml
//! [namespace]
//! separator = "\\"
//!
//! [allocator]
//! limit_bytes = 65536
//!
//! [tree]
//! case_sensitive = false
//! paths = ['c:\windows\system\kernel32.dll', 'c:\users']
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use idlist::{AllocatorConfig, MAX_PAYLOAD_LEN, NamespaceConfig};
use serde::Deserialize;
use thiserror::Error;

use crate::hash::{TOKEN_OVERHEAD, fold};

/// Parsed manifest.
#[derive(Debug, Clone)]
pub struct TreeManifest {
    pub namespace: NamespaceConfig,
    pub allocator: AllocatorConfig,
    /// Whether segment lookups distinguish case.
    pub case_sensitive: bool,
    /// All nodes, including auto-generated parents.
    pub(crate) entries: Vec<TreeEntry>,
}

/// A single node with computed properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Full separator-delimited path as first spelled in the manifest.
    pub path: String,
    /// Last segment.
    pub name: String,
    /// Tree depth (1 = direct child of the root).
    pub depth: usize,
    /// Parent path (None for direct children of the root)
    pub parent: Option<String>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    namespace: NamespaceConfig,
    #[serde(default)]
    allocator: AllocatorConfig,
    tree: RawTree,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTree {
    #[serde(default)]
    case_sensitive: bool,
    paths: Vec<String>,
}

impl TreeManifest {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(content)?;
        let entries = Self::expand_paths(&raw.tree.paths, &raw.namespace, raw.tree.case_sensitive)?;

        Ok(Self {
            namespace: raw.namespace,
            allocator: raw.allocator,
            case_sensitive: raw.tree.case_sensitive,
            entries,
        })
    }

    /// Entries ordered parents-first.
    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand paths to include all parent nodes.
    ///
    /// e.g., `a\b\c` expands to `a`, `a\b`, `a\b\c`
    fn expand_paths(
        paths: &[String],
        namespace: &NamespaceConfig,
        case_sensitive: bool,
    ) -> Result<Vec<TreeEntry>, ManifestError> {
        let sep = namespace.separator;
        let joiner = sep.to_string();
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries: Vec<TreeEntry> = Vec::new();

        for path in paths {
            if path.is_empty() {
                return Err(ManifestError::Validation("empty path not allowed".into()));
            }
            if path.starts_with(sep) || path.ends_with(sep) {
                return Err(ManifestError::Validation(format!(
                    "invalid path '{path}': cannot start or end with '{sep}'"
                )));
            }

            let segments: Vec<&str> = path.split(sep).collect();
            if segments.len() > namespace.max_depth {
                return Err(ManifestError::Validation(format!(
                    "path '{path}' is {} levels deep, the limit is {}",
                    segments.len(),
                    namespace.max_depth
                )));
            }

            for seg in &segments {
                if seg.is_empty() {
                    return Err(ManifestError::Validation(format!(
                        "invalid path '{path}': empty segment"
                    )));
                }
                if seg.contains('\0') {
                    return Err(ManifestError::Validation(format!(
                        "invalid path '{path}': segment contains NUL"
                    )));
                }
                if seg.len() + TOKEN_OVERHEAD > MAX_PAYLOAD_LEN {
                    return Err(ManifestError::Validation(format!(
                        "invalid path '{path}': segment is {} bytes long",
                        seg.len()
                    )));
                }
            }

            // Add all ancestors and the path itself
            for depth in 1..=segments.len() {
                let ancestor = segments[..depth].join(joiner.as_str());
                if seen.insert(fold(&ancestor, case_sensitive)) {
                    let parent = (depth > 1).then(|| segments[..depth - 1].join(joiner.as_str()));
                    entries.push(TreeEntry {
                        path: ancestor,
                        name: segments[depth - 1].to_string(),
                        depth,
                        parent,
                    });
                }
            }
        }

        // Parents first, then by path for deterministic output
        entries.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));

        Ok(entries)
    }
}

/// Errors during manifest loading.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
