//! # Hierarchical Item Identifier Lists (idlist)
//!
//! Compact binary paths through a hierarchical namespace. Each path segment
//! is an opaque token chosen by a namespace provider; a list is those tokens
//! packed back to back, each prefixed by its own size, and ended by a
//! zero-size record.
//!
//! ## Layout
//!
//! ```text
//! ┌────┬───────────┬────┬───────────────┬────┬─────┬────┐
//! │ cb │ token "a" │ cb │ token "b"     │ cb │ ... │ 0  │
//! │u16 │ cb - 2    │u16 │ cb - 2        │u16 │     │u16 │
//! └────┴───────────┴────┴───────────────┴────┴─────┴────┘
//! ```
//!
//! ## Relative and Absolute Lists
//!
//! A list returned by a provider node is relative to that node. Prefixing it
//! with the tokens of every ancestor gives an absolute list that means the
//! same thing from the namespace root:
//!
//! ```ignore
//! use idlist::{IdList, Namespace};
//!
//! let ns = Namespace::new(provider);
//! let rel = ns.resolve_path(r"system\kernel32.dll", Some(&windows_dir))?;
//! let abs = ns.absolute(&windows_dir, &rel)?;
//!
//! let (parent, file) = abs.split()?;
//! assert_eq!(parent.concat(&file)?, abs);
//! ```

pub mod algebra;
pub mod alloc;
pub mod config;
pub mod error;
pub mod layout;
pub mod list;
pub mod namespace;
pub mod strret;

pub use alloc::{Allocator, AllocatorRef, AllocatorStats, Block, SystemAllocator};
pub use config::{AllocatorConfig, NamespaceConfig};
pub use error::{IdListError, Result};
pub use layout::{ItemRecord, Items, MAX_PAYLOAD_LEN, SIZE_FIELD_LEN, TERMINATOR, TERMINATOR_SIZE};
pub use list::IdList;
pub use namespace::{
    Ancestor, HostWindow, InterfaceId, ItemToken, Namespace, NamespaceProvider, ObjectRequest,
};
pub use strret::{ProviderString, StrRet};
