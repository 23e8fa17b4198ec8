//! Namespace bridge behaviour against an in-memory provider with fixed-size
//! tokens.

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};

use idlist::{
    Ancestor, AllocatorRef, IdList, IdListError, InterfaceId, ItemToken, Namespace,
    NamespaceConfig, NamespaceProvider, ObjectRequest, ProviderString, StrRet, SystemAllocator,
    TERMINATOR, layout::push_record,
};

const TOKEN_LEN: usize = 4;
const ITEM_OBJECT: InterfaceId = InterfaceId(0x0001);

type Path = Vec<String>;

fn token(segment: &str) -> ItemToken {
    let mut t = vec![b'_'; TOKEN_LEN];
    for (dst, src) in t.iter_mut().zip(segment.bytes()) {
        *dst = src;
    }
    t
}

#[derive(Debug)]
struct Tree {
    known: BTreeSet<Path>,
    names: HashMap<ItemToken, String>,
    root_calls: Cell<usize>,
}

impl Tree {
    fn new(paths: &[&str]) -> Self {
        let mut known = BTreeSet::new();
        let mut names = HashMap::new();
        known.insert(Vec::new());
        for path in paths {
            let segs: Vec<String> = path.split('\\').map(str::to_string).collect();
            for depth in 1..=segs.len() {
                known.insert(segs[..depth].to_vec());
            }
            for seg in segs {
                names.insert(token(&seg), seg);
            }
        }
        Self {
            known,
            names,
            root_calls: Cell::new(0),
        }
    }

    fn name_of(&self, payload: &[u8]) -> idlist::Result<&String> {
        self.names
            .get(payload)
            .ok_or_else(|| IdListError::provider(format!("unknown token {payload:?}")))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Object {
    path: Path,
    interface: InterfaceId,
}

impl NamespaceProvider for Tree {
    type Node = Path;
    type Object = Object;

    fn root(&self) -> Path {
        self.root_calls.set(self.root_calls.get() + 1);
        Vec::new()
    }

    fn resolve_segment(&self, node: &Path, segment: &str) -> idlist::Result<Option<ItemToken>> {
        let mut child = node.clone();
        child.push(segment.to_string());
        Ok(self.known.contains(&child).then(|| token(segment)))
    }

    fn bind_to_sub_node(&self, node: &Path, relative: &IdList<'_>) -> idlist::Result<Path> {
        let mut current = node.clone();
        for record in relative.items() {
            current.push(self.name_of(record.payload())?.clone());
            if !self.known.contains(&current) {
                return Err(IdListError::provider("no such folder"));
            }
        }
        Ok(current)
    }

    fn parent(&self, node: &Path) -> idlist::Result<Option<Ancestor<Path>>> {
        Ok(node.split_last().map(|(last, rest)| Ancestor {
            node: rest.to_vec(),
            token: token(last),
        }))
    }

    fn object_of(
        &self,
        node: &Path,
        item: &IdList<'_>,
        request: &ObjectRequest,
    ) -> idlist::Result<Object> {
        if item.item_count() > 1 {
            return Err(IdListError::provider("only direct children are supported"));
        }
        let mut path = node.clone();
        if let Some(record) = item.first_item() {
            path.push(self.name_of(record.payload())?.clone());
        }
        Ok(Object {
            path,
            interface: request.interface,
        })
    }

    fn display_name(&self, _node: &Path, item: &IdList<'_>) -> idlist::Result<StrRet> {
        let record = item
            .first_item()
            .ok_or_else(|| IdListError::provider("empty item"))?;
        let name = self.name_of(record.payload())?;
        Ok(StrRet::Wide(ProviderString::new(name)?))
    }

    fn children(&self, node: &Path) -> idlist::Result<Vec<ItemToken>> {
        Ok(self
            .known
            .iter()
            .filter(|p| p.len() == node.len() + 1 && p.starts_with(node))
            .map(|p| token(p.last().unwrap()))
            .collect())
    }
}

fn namespace(paths: &[&str]) -> (Namespace<Tree>, AllocatorRef) {
    let alloc = SystemAllocator::default().into_ref();
    let ns = Namespace::with_config(Tree::new(paths), NamespaceConfig::default(), alloc.clone());
    (ns, alloc)
}

fn manual(segments: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for s in segments {
        push_record(&mut out, &token(s)).unwrap();
    }
    out.extend_from_slice(&TERMINATOR);
    out
}

fn path(segments: &[&str]) -> Path {
    segments.iter().map(|s| s.to_string()).collect()
}

#[test]
fn resolve_path_concatenates_segment_tokens() {
    let (ns, alloc) = namespace(&[r"a\b\c"]);
    {
        let list = ns.resolve_path(r"a\b\c", None).unwrap();
        assert_eq!(list.item_count(), 3);
        assert_eq!(list.size(), 3 * (2 + TOKEN_LEN) + 2);
        assert_eq!(list.as_bytes(), manual(&["a", "b", "c"]).as_slice());
    }
    assert_eq!(alloc.stats().live_blocks, 0);
}

#[test]
fn resolve_path_tolerates_empty_segments() {
    let (ns, _alloc) = namespace(&[r"a\b"]);
    let list = ns.resolve_path(r"\a\\b\", None).unwrap();
    assert_eq!(list.as_bytes(), manual(&["a", "b"]).as_slice());

    let empty = ns.resolve_path("", None).unwrap();
    assert!(empty.is_owned());
    assert!(empty.is_empty());
}

#[test]
fn resolve_path_relative_to_a_node() {
    let (ns, _alloc) = namespace(&[r"a\b\c"]);
    let list = ns.resolve_path(r"b\c", Some(&path(&["a"]))).unwrap();
    assert_eq!(list.as_bytes(), manual(&["b", "c"]).as_slice());
}

#[test]
fn missing_segment_reports_path_not_found() {
    let (ns, alloc) = namespace(&[r"a\b\c"]);
    let mut list = IdList::copy_of_in(&alloc, &manual(&["a"])).unwrap();

    let err = ns.set_path(&mut list, r"a\x\c", None).unwrap_err();
    assert_eq!(
        err,
        IdListError::PathNotFound {
            segment: "x".into(),
            path: r"a\x\c".into(),
        }
    );
    assert!(list.is_null());
    assert_eq!(alloc.stats().live_blocks, 0);
}

#[test]
fn root_is_requested_once() {
    let (ns, _alloc) = namespace(&["a"]);
    ns.resolve_path("a", None).unwrap();
    ns.resolve_path("a", None).unwrap();
    ns.children_of(None).unwrap();
    assert_eq!(ns.provider().root_calls.get(), 1);
}

#[test]
fn absolute_under_root_is_unchanged() {
    let (ns, _alloc) = namespace(&[r"a\b"]);
    let rel = ns.resolve_path(r"a\b", None).unwrap();
    let abs = ns.absolute(&Vec::new(), &rel).unwrap();
    assert_eq!(abs, rel);
}

#[test]
fn absolute_prefixes_ancestor_tokens() {
    let (ns, alloc) = namespace(&[r"c:\windows\system\kernel32.dll"]);
    let system = path(&["c:", "windows", "system"]);
    {
        let rel = ns.resolve_path("kernel32.dll", Some(&system)).unwrap();
        assert!(rel.is_single_level());

        let mut abs = IdList::new();
        ns.make_absolute(&mut abs, &system, &rel).unwrap();
        let direct = ns
            .resolve_path(r"c:\windows\system\kernel32.dll", None)
            .unwrap();
        assert_eq!(abs, direct);
    }
    assert_eq!(alloc.stats().live_blocks, 0);
}

#[derive(Debug)]
struct Loop;

impl NamespaceProvider for Loop {
    type Node = u8;
    type Object = ();

    fn root(&self) -> u8 {
        0
    }
    fn resolve_segment(&self, _: &u8, _: &str) -> idlist::Result<Option<ItemToken>> {
        Ok(None)
    }
    fn bind_to_sub_node(&self, node: &u8, _: &IdList<'_>) -> idlist::Result<u8> {
        Ok(*node)
    }
    fn parent(&self, node: &u8) -> idlist::Result<Option<Ancestor<u8>>> {
        match node {
            0 => Ok(None),
            9 => Err(IdListError::provider("parent lookup failed")),
            n => Ok(Some(Ancestor {
                node: *n,
                token: vec![*n],
            })),
        }
    }
    fn object_of(&self, _: &u8, _: &IdList<'_>, _: &ObjectRequest) -> idlist::Result<()> {
        Ok(())
    }
    fn display_name(&self, _: &u8, _: &IdList<'_>) -> idlist::Result<StrRet> {
        Ok(StrRet::Ansi(b"loop".to_vec()))
    }
    fn children(&self, _: &u8) -> idlist::Result<Vec<ItemToken>> {
        Ok(Vec::new())
    }
}

#[test]
fn cyclic_parent_chain_is_bounded() {
    let alloc = SystemAllocator::default().into_ref();
    let config = NamespaceConfig {
        max_depth: 5,
        ..NamespaceConfig::default()
    };
    let ns = Namespace::with_config(Loop, config, alloc.clone());

    let err = ns.absolute(&3, &IdList::new()).unwrap_err();
    assert_eq!(err, IdListError::DepthExceeded { limit: 5 });

    let err = ns.absolute(&9, &IdList::new()).unwrap_err();
    assert_eq!(err, IdListError::provider("parent lookup failed"));
    assert_eq!(alloc.stats().total_acquired, 0);
}

#[test]
fn ui_object_of_single_record_matches_direct_call() {
    let (ns, _alloc) = namespace(&[r"a\b"]);
    let request = ObjectRequest::new(ITEM_OBJECT);
    let a = path(&["a"]);
    let item = ns.resolve_path("b", Some(&a)).unwrap();

    let via_bridge = ns.ui_object_of(&item, &request, Some(&a)).unwrap();
    let direct = ns.provider().object_of(&a, &item, &request).unwrap();
    assert_eq!(via_bridge, direct);
}

#[test]
fn ui_object_of_reaches_deep_items() {
    let (ns, alloc) = namespace(&[r"c:\windows\system\kernel32.dll"]);
    let request = ObjectRequest::new(ITEM_OBJECT);
    {
        let list = ns.resolve_path(r"windows\system\kernel32.dll", Some(&path(&["c:"]))).unwrap();

        // The provider on its own refuses multi-level lists.
        assert!(ns.provider().object_of(&path(&["c:"]), &list, &request).is_err());

        let object = ns.ui_object_of(&list, &request, Some(&path(&["c:"]))).unwrap();
        assert_eq!(object.path, path(&["c:", "windows", "system", "kernel32.dll"]));
        assert_eq!(object.interface, ITEM_OBJECT);
    }
    assert_eq!(alloc.stats().live_blocks, 0);
}

#[test]
fn ui_object_of_propagates_binding_errors() {
    let (ns, _alloc) = namespace(&[r"a\b"]);
    let bogus = manual(&["zz", "b"]);
    let list = IdList::borrowed(&bogus).unwrap();

    let err = ns
        .ui_object_of(&list, &ObjectRequest::new(ITEM_OBJECT), None)
        .unwrap_err();
    assert!(matches!(err, IdListError::Provider { .. }));
}

#[test]
fn children_and_display_names() {
    let (ns, alloc) = namespace(&[r"a\b", r"a\c", "d"]);
    {
        let a = path(&["a"]);
        let children = ns.children_of(Some(&a)).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.is_single_level()));

        let names: Vec<String> = children
            .iter()
            .map(|c| ns.display_name_of(c, Some(&a)).unwrap())
            .collect();
        assert_eq!(names, vec!["b".to_string(), "c".to_string()]);
    }
    // Provider strings come from the shared allocator; the namespace's own
    // allocator must be balanced.
    assert_eq!(alloc.stats().live_blocks, 0);
}
