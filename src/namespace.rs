//! Namespace bridge — operations that call out to a namespace provider.
//!
//! A [`Namespace`] bundles a provider with an allocator handle and its
//! configuration. It replaces process-wide "desktop folder" state: the root
//! node is asked for once and cached.
//!
//! Provider errors are propagated as-is. The bridge only adds
//! [`IdListError::PathNotFound`] (segment lookups that come back empty) and
//! [`IdListError::DepthExceeded`] (ancestor walks that never reach the root).

use std::fmt;
use std::sync::OnceLock;

use tracing::{debug, trace, warn};

use crate::alloc::{self, AllocatorRef};
use crate::config::NamespaceConfig;
use crate::error::{IdListError, Result};
use crate::layout::{TERMINATOR, push_record};
use crate::list::IdList;
use crate::strret::StrRet;

/// Opaque payload of one item record, as produced by a provider.
pub type ItemToken = Vec<u8>;

/// A node's parent together with the node's own token under that parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ancestor<N> {
    pub node: N,
    pub token: ItemToken,
}

/// Identifier of an interface a caller wants an object to implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u128);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Opaque handle of a host window that objects may parent UI to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostWindow(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectRequest {
    pub interface: InterfaceId,
    pub host: Option<HostWindow>,
}

impl ObjectRequest {
    pub const fn new(interface: InterfaceId) -> Self {
        Self {
            interface,
            host: None,
        }
    }

    pub const fn with_host(mut self, host: HostWindow) -> Self {
        self.host = Some(host);
        self
    }
}

/// The service that gives meaning to item tokens.
pub trait NamespaceProvider {
    type Node: Clone + fmt::Debug;
    type Object;

    /// The global namespace root.
    fn root(&self) -> Self::Node;

    /// Token of the child of `node` named `segment`, or `None` if absent.
    fn resolve_segment(&self, node: &Self::Node, segment: &str) -> Result<Option<ItemToken>>;

    /// Node reached by following `relative` down from `node`.
    fn bind_to_sub_node(&self, node: &Self::Node, relative: &IdList<'_>) -> Result<Self::Node>;

    /// Parent of `node`, or `None` when `node` is the root.
    fn parent(&self, node: &Self::Node) -> Result<Option<Ancestor<Self::Node>>>;

    /// Object for a direct child of `node`. Providers may reject lists with
    /// more than one record.
    fn object_of(
        &self,
        node: &Self::Node,
        item: &IdList<'_>,
        request: &ObjectRequest,
    ) -> Result<Self::Object>;

    /// Display name of a direct child of `node`.
    fn display_name(&self, node: &Self::Node, item: &IdList<'_>) -> Result<StrRet>;

    /// Tokens of the children of `node`.
    fn children(&self, node: &Self::Node) -> Result<Vec<ItemToken>>;
}

/// A provider plus the allocator and settings the bridge uses with it.
pub struct Namespace<P: NamespaceProvider> {
    provider: P,
    allocator: AllocatorRef,
    config: NamespaceConfig,
    root: OnceLock<P::Node>,
}

impl<P: NamespaceProvider> Namespace<P> {
    /// Default settings and the shared allocator.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, NamespaceConfig::default(), alloc::shared())
    }

    pub fn with_config(provider: P, config: NamespaceConfig, allocator: AllocatorRef) -> Self {
        Self {
            provider,
            allocator,
            config,
            root: OnceLock::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn allocator(&self) -> &AllocatorRef {
        &self.allocator
    }

    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    /// The root node, fetched from the provider on first use.
    pub fn root(&self) -> &P::Node {
        self.root.get_or_init(|| {
            let root = self.provider.root();
            debug!(?root, "resolved namespace root");
            root
        })
    }

    fn start<'n>(&'n self, node: Option<&'n P::Node>) -> &'n P::Node {
        node.unwrap_or_else(|| self.root())
    }

    /// Resolve a separator-delimited path (e.g. `a\b\c`) relative to `node`,
    /// or to the root when `node` is `None`.
    ///
    /// Empty segments are skipped, so an empty path yields a list with no
    /// records that names `node` itself.
    pub fn resolve_path(&self, path: &str, node: Option<&P::Node>) -> Result<IdList<'static>> {
        let segments: Vec<&str> = path
            .split(self.config.separator)
            .filter(|s| !s.is_empty())
            .collect();

        let mut current = self.start(node).clone();
        let mut records = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            let token = self
                .provider
                .resolve_segment(&current, segment)?
                .ok_or_else(|| {
                    debug!(segment, path, "path segment not found");
                    IdListError::PathNotFound {
                        segment: segment.to_string(),
                        path: path.to_string(),
                    }
                })?;

            let mut single = Vec::new();
            push_record(&mut single, &token)?;
            records.extend_from_slice(&single);

            if i + 1 < segments.len() {
                single.extend_from_slice(&TERMINATOR);
                let item = IdList::borrowed(&single)?;
                current = self.provider.bind_to_sub_node(&current, &item)?;
            }
        }

        trace!(path, segments = segments.len(), "resolved path");
        IdList::from_parts_in(&self.allocator, &[&records])
    }

    /// In-place form of [`resolve_path`](Self::resolve_path). `list` is
    /// released first and stays null on failure.
    pub fn set_path(&self, list: &mut IdList<'_>, path: &str, node: Option<&P::Node>) -> Result<()> {
        list.free();
        *list = self.resolve_path(path, node)?;
        Ok(())
    }

    /// Make `relative` (meaningful under `node`) absolute by prefixing the
    /// tokens of every ancestor level, root first.
    pub fn absolute(&self, node: &P::Node, relative: &IdList<'_>) -> Result<IdList<'static>> {
        let mut chain: Vec<ItemToken> = Vec::new();
        let mut current = node.clone();

        while let Some(Ancestor { node: parent, token }) = self.provider.parent(&current)? {
            if chain.len() >= self.config.max_depth {
                warn!(limit = self.config.max_depth, ?node, "ancestor walk did not reach the root");
                return Err(IdListError::DepthExceeded {
                    limit: self.config.max_depth,
                });
            }
            chain.push(token);
            current = parent;
        }

        let mut prefix = Vec::new();
        for token in chain.iter().rev() {
            push_record(&mut prefix, token)?;
        }

        trace!(levels = chain.len(), "absolute list assembled");
        IdList::from_parts_in(&self.allocator, &[&prefix, relative.records()])
    }

    /// In-place form of [`absolute`](Self::absolute).
    pub fn make_absolute(
        &self,
        list: &mut IdList<'_>,
        node: &P::Node,
        relative: &IdList<'_>,
    ) -> Result<()> {
        list.free();
        *list = self.absolute(node, relative)?;
        Ok(())
    }

    /// Object for any list rooted at `node` (the root when `None`), even
    /// when the provider only hands out objects for direct children.
    ///
    /// Multi-record lists are split; the parent chain is bound to a sub-node
    /// which is then asked for the final record.
    pub fn ui_object_of(
        &self,
        list: &IdList<'_>,
        request: &ObjectRequest,
        node: Option<&P::Node>,
    ) -> Result<P::Object> {
        let start = self.start(node);
        if list.item_count() <= 1 {
            return self.provider.object_of(start, list, request);
        }

        let (parent, item) = list.split_in(&self.allocator)?;
        let sub = self.provider.bind_to_sub_node(start, &parent)?;
        trace!(?sub, interface = %request.interface, "bound parent chain for object lookup");
        self.provider.object_of(&sub, &item, request)
    }

    /// Children of `node` as single-level lists.
    pub fn children_of(&self, node: Option<&P::Node>) -> Result<Vec<IdList<'static>>> {
        let start = self.start(node);
        self.provider
            .children(start)?
            .iter()
            .map(|token| {
                let mut record = Vec::new();
                push_record(&mut record, token)?;
                IdList::from_parts_in(&self.allocator, &[&record])
            })
            .collect()
    }

    /// Display name of a direct child of `node` as a plain string.
    pub fn display_name_of(&self, item: &IdList<'_>, node: Option<&P::Node>) -> Result<String> {
        let ret = self.provider.display_name(self.start(node), item)?;
        Ok(item.extract_str(ret))
    }
}

impl<P> fmt::Debug for Namespace<P>
where
    P: NamespaceProvider + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .field("root", &self.root.get())
            .finish()
    }
}
