//! Tree provider — an in-memory namespace built from a manifest.

use std::collections::HashMap;

use idlist::{
    Ancestor, HostWindow, IdList, IdListError, InterfaceId, ItemToken, NamespaceProvider,
    ObjectRequest, StrRet,
};
use tracing::{debug, trace};

use crate::hash::{NAME_OFFSET, TokenHeader, fold, item_token};
use crate::manifest::{ManifestError, TreeManifest};

/// Objects that describe a node.
pub const ITEM_INTERFACE: InterfaceId = InterfaceId(0x6964_6c69_7374_0001);

/// Objects that list the actions available on a node.
pub const ACTIONS_INTERFACE: InterfaceId = InterfaceId(0x6964_6c69_7374_0002);

const SUPPORTED_INTERFACES: &[InterfaceId] = &[ITEM_INTERFACE, ACTIONS_INTERFACE];

/// Handle of a node in a [`TreeProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct TreeNode {
    name: String,
    path: String,
    parent: Option<NodeId>,
    token: ItemToken,
    children: Vec<NodeId>,
}

/// Object handed out by [`TreeProvider::object_of`](NamespaceProvider::object_of).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeObject {
    pub node: NodeId,
    pub path: String,
    pub interface: InterfaceId,
    pub host: Option<HostWindow>,
}

/// Namespace provider over a fixed tree.
///
/// Provides:
/// - Segment name → token lookup under each node
/// - Token → child binding for multi-level lists
/// - Parent walks for absolute lists
/// - Objects for direct children only
#[derive(Debug)]
pub struct TreeProvider {
    nodes: Vec<TreeNode>,
    by_name: HashMap<(NodeId, String), NodeId>,
    by_token: HashMap<(NodeId, ItemToken), NodeId>,
    path_to_id: HashMap<String, NodeId>,
    case_sensitive: bool,
    separator: char,
}

impl TreeProvider {
    /// Build the tree from manifest entries (parents always come first).
    ///
    /// An entry whose parent has not been built yet is a validation error.
    pub fn from_manifest(manifest: &TreeManifest) -> Result<Self, ManifestError> {
        let mut provider = Self {
            nodes: vec![TreeNode {
                name: String::new(),
                path: String::new(),
                parent: None,
                token: ItemToken::new(),
                children: Vec::new(),
            }],
            by_name: HashMap::new(),
            by_token: HashMap::new(),
            path_to_id: HashMap::new(),
            case_sensitive: manifest.case_sensitive,
            separator: manifest.namespace.separator,
        };

        for entry in manifest.entries() {
            let parent = match &entry.parent {
                Some(path) => provider.node(path).ok_or_else(|| {
                    ManifestError::Validation(format!(
                        "'{}' appears before its parent '{path}'",
                        entry.path
                    ))
                })?,
                None => NodeId::ROOT,
            };
            provider.insert(parent, &entry.name, &entry.path);
        }

        debug!(nodes = provider.len(), "tree provider built");
        Ok(provider)
    }

    fn insert(&mut self, parent: NodeId, name: &str, path: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        let token = item_token(name, self.case_sensitive);

        self.by_name
            .insert((parent, fold(name, self.case_sensitive)), id);
        self.by_token.insert((parent, token.clone()), id);
        self.path_to_id
            .insert(fold(path, self.case_sensitive), id);
        self.nodes[parent.0].children.push(id);
        self.nodes.push(TreeNode {
            name: name.to_string(),
            path: path.to_string(),
            parent: Some(parent),
            token,
            children: Vec::new(),
        });
        id
    }

    fn get(&self, id: NodeId) -> Result<&TreeNode, IdListError> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| IdListError::provider(format!("unknown node {}", id.0)))
    }

    /// Path → node. The empty path names the root.
    pub fn node(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(NodeId::ROOT);
        }
        self.path_to_id
            .get(&fold(path, self.case_sensitive))
            .copied()
    }

    /// Node → path as spelled in the manifest.
    pub fn path_of(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.path.as_str())
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.name.as_str())
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Child of `parent` whose token equals `payload`.
    pub fn child_by_token(&self, parent: NodeId, payload: &[u8]) -> Option<NodeId> {
        // Payloads shorter than the header are never tree tokens.
        TokenHeader::read(payload)?;
        self.by_token.get(&(parent, payload.to_vec())).copied()
    }

    /// All nodes in DFS order: parent before children, siblings by name.
    pub fn dfs_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.dfs_collect(NodeId::ROOT, &mut out);
        out
    }

    fn dfs_collect(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        let mut kids = self.nodes[id.0].children.clone();
        kids.sort_by(|a, b| self.nodes[a.0].name.cmp(&self.nodes[b.0].name));
        for kid in kids {
            self.dfs_collect(kid, out);
        }
    }

    fn child_of(&self, node: NodeId, item: &IdList<'_>) -> Result<NodeId, IdListError> {
        let record = item
            .first_item()
            .ok_or_else(|| IdListError::provider("empty item list"))?;
        self.child_by_token(node, record.payload()).ok_or_else(|| {
            IdListError::provider(format!(
                "'{}' has no child {:?}",
                self.nodes[node.0].path, record
            ))
        })
    }
}

impl NamespaceProvider for TreeProvider {
    type Node = NodeId;
    type Object = TreeObject;

    fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn resolve_segment(&self, node: &NodeId, segment: &str) -> idlist::Result<Option<ItemToken>> {
        self.get(*node)?;
        let found = self
            .by_name
            .get(&(*node, fold(segment, self.case_sensitive)))
            .map(|id| self.nodes[id.0].token.clone());
        trace!(node = node.0, segment, found = found.is_some(), "resolve segment");
        Ok(found)
    }

    fn bind_to_sub_node(&self, node: &NodeId, relative: &IdList<'_>) -> idlist::Result<NodeId> {
        self.get(*node)?;
        let mut current = *node;
        for record in relative.items() {
            current = self.child_by_token(current, record.payload()).ok_or_else(|| {
                IdListError::provider(format!(
                    "cannot bind {:?} under '{}'",
                    record, self.nodes[current.0].path
                ))
            })?;
        }
        Ok(current)
    }

    fn parent(&self, node: &NodeId) -> idlist::Result<Option<Ancestor<NodeId>>> {
        let n = self.get(*node)?;
        Ok(n.parent.map(|parent| Ancestor {
            node: parent,
            token: n.token.clone(),
        }))
    }

    fn object_of(
        &self,
        node: &NodeId,
        item: &IdList<'_>,
        request: &ObjectRequest,
    ) -> idlist::Result<TreeObject> {
        self.get(*node)?;
        if !SUPPORTED_INTERFACES.contains(&request.interface) {
            return Err(IdListError::provider(format!(
                "interface {} is not supported",
                request.interface
            )));
        }

        let target = match item.item_count() {
            0 => *node,
            1 => self.child_of(*node, item)?,
            n => {
                return Err(IdListError::provider(format!(
                    "objects are only available for direct children, got {n} levels"
                )));
            }
        };

        Ok(TreeObject {
            node: target,
            path: self.nodes[target.0].path.clone(),
            interface: request.interface,
            host: request.host,
        })
    }

    fn display_name(&self, node: &NodeId, item: &IdList<'_>) -> idlist::Result<StrRet> {
        let n = self.get(*node)?;
        if item.is_empty() {
            return Ok(StrRet::Ansi(n.name.as_bytes().to_vec()));
        }
        self.child_of(*node, item)?;
        Ok(StrRet::Offset(NAME_OFFSET))
    }

    fn children(&self, node: &NodeId) -> idlist::Result<Vec<ItemToken>> {
        let n = self.get(*node)?;
        Ok(n.children
            .iter()
            .map(|id| self.nodes[id.0].token.clone())
            .collect())
    }
}
