//! In-memory namespace provider for idlist.
//!
//! This crate provides tools for:
//! - Parsing tree manifests (`tree.toml`)
//! - Building a [`TreeProvider`] that hands out FNV-1a based item tokens
//! - Wiring it into an [`idlist::Namespace`] with the manifest's settings
//!
//! # Usage
//!
//! ```ignore
//! let ns = idlist_tree::load("tree.toml")?;
//! let list = ns.resolve_path(r"c:\windows\system", None)?;
//! let (parent, item) = list.split()?;
//! ```

pub mod hash;
pub mod manifest;
pub mod tree;

pub use hash::{NAME_OFFSET, fnv1a_64, item_token};
pub use manifest::{ManifestError, TreeEntry, TreeManifest};
pub use tree::{ACTIONS_INTERFACE, ITEM_INTERFACE, NodeId, TreeObject, TreeProvider};

use std::path::Path;

use idlist::{Namespace, SystemAllocator};

/// Load a manifest from disk and build a namespace over it.
///
/// The namespace gets its own allocator configured from the manifest's
/// `[allocator]` section.
pub fn load(path: impl AsRef<Path>) -> Result<Namespace<TreeProvider>, ManifestError> {
    let manifest = TreeManifest::from_file(path)?;
    namespace(&manifest)
}

/// Build a namespace from an already parsed manifest.
pub fn namespace(manifest: &TreeManifest) -> Result<Namespace<TreeProvider>, ManifestError> {
    Ok(Namespace::with_config(
        TreeProvider::from_manifest(manifest)?,
        manifest.namespace,
        SystemAllocator::new(manifest.allocator).into_ref(),
    ))
}
