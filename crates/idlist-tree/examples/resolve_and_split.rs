//! Resolve textual paths to identifier lists and take them apart again.
//!
//! This example shows how to:
//! - Build a namespace from an inline tree manifest
//! - Resolve paths to lists and walk their records
//! - Split a list, rebuild it, and make a relative list absolute
//! - Fetch an object for a deep item and read display names

use idlist::{IdList, ObjectRequest};
use idlist_tree::{ITEM_INTERFACE, TreeManifest, namespace};

const MANIFEST: &str = r#"
[allocator]
limit_bytes = 65536

[tree]
paths = [
    'c:\windows\system\kernel32.dll',
    'c:\windows\fonts',
    'c:\users\guest',
]
"#;

fn dump(label: &str, list: &IdList<'_>) {
    println!("  {label:<10} {} records, {} bytes", list.item_count(), list.size());
    for record in list.items() {
        println!("    {record:?}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Resolve and Split Example ===\n");

    let manifest = TreeManifest::from_str(MANIFEST)?;
    let ns = namespace(&manifest)?;

    // 1. Path -> list
    println!("Resolve:");
    let full = ns.resolve_path(r"c:\windows\system\kernel32.dll", None)?;
    dump("full", &full);
    println!();

    // 2. Split into parent chain + last item, then put it back together
    println!("Split:");
    let (parent, item) = full.split()?;
    dump("parent", &parent);
    dump("item", &item);
    let rebuilt = (&parent + &item)?;
    println!("  rebuilt == full: {}", rebuilt == full);
    println!();

    // 3. Relative list under a node -> absolute list
    println!("Absolute:");
    let system = ns
        .provider()
        .node(r"c:\windows\system")
        .ok_or("system node missing")?;
    let relative = ns.resolve_path("kernel32.dll", Some(&system))?;
    let absolute = ns.absolute(&system, &relative)?;
    dump("relative", &relative);
    dump("absolute", &absolute);
    println!("  absolute == full: {}", absolute == full);
    println!();

    // 4. Objects and names for items below direct children
    println!("Objects and names:");
    let object = ns.ui_object_of(&full, &ObjectRequest::new(ITEM_INTERFACE), None)?;
    println!("  object for full list -> {}", object.path);
    for child in ns.children_of(None)? {
        println!("  root child: {}", ns.display_name_of(&child, None)?);
    }

    let stats = ns.allocator().stats();
    println!(
        "\nAllocator: {} live blocks, {} bytes",
        stats.live_blocks, stats.live_bytes
    );

    Ok(())
}
