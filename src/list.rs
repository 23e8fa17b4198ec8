//! The identifier list type and its ownership rules.
//!
//! An [`IdList`] is in one of three states:
//!
//! - null — no buffer at all, nothing to release;
//! - owned — a [`Block`] acquired from an allocator, released exactly once;
//! - borrowed — an alias of someone else's buffer, never released here.
//!
//! Every mutating operation releases an owned buffer before installing the
//! replacement, and builds the replacement completely before installing it,
//! so a failure leaves the list null rather than half-written.

use std::fmt;
use std::mem;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::alloc::{self, AllocatorRef, Block};
use crate::error::Result;
use crate::layout::{self, ItemRecord, Items, TERMINATOR, TERMINATOR_SIZE};

enum Storage<'a> {
    Null,
    Owned(Block),
    Borrowed(&'a [u8]),
}

/// A hierarchical identifier list: item records followed by a terminator.
pub struct IdList<'a> {
    storage: Storage<'a>,
}

impl Default for IdList<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IdList<'a> {
    /// A null list.
    pub const fn new() -> Self {
        Self {
            storage: Storage::Null,
        }
    }

    /// Alias an externally owned list without copying it.
    ///
    /// The bytes are validated; anything after the terminator is ignored.
    pub fn borrowed(bytes: &'a [u8]) -> Result<Self> {
        let len = layout::validate(bytes)?;
        Ok(Self {
            storage: Storage::Borrowed(&bytes[..len]),
        })
    }

    /// Copy an external list into a buffer from the shared allocator.
    pub fn copy_of(bytes: &[u8]) -> Result<IdList<'static>> {
        Self::copy_of_in(&alloc::shared(), bytes)
    }

    pub fn copy_of_in(allocator: &AllocatorRef, bytes: &[u8]) -> Result<IdList<'static>> {
        let len = layout::validate(bytes)?;
        IdList::from_parts_in(allocator, &[&bytes[..len - TERMINATOR_SIZE]])
    }

    /// Build an owned list from concatenated record runs (no terminators),
    /// with a single allocation.
    pub(crate) fn from_parts_in(
        allocator: &AllocatorRef,
        parts: &[&[u8]],
    ) -> Result<IdList<'static>> {
        let records: usize = parts.iter().map(|p| p.len()).sum();
        let len = records + TERMINATOR_SIZE;
        let mut block = Block::acquire(allocator, len)?;

        let out = block.as_mut_slice();
        let mut at = 0;
        for part in parts {
            out[at..at + part.len()].copy_from_slice(part);
            at += part.len();
        }
        out[at..].copy_from_slice(&TERMINATOR);

        debug_assert_eq!(layout::validate(block.as_slice()).ok(), Some(len));
        Ok(IdList {
            storage: Storage::Owned(block),
        })
    }

    /// Deep copy using the shared allocator. A null list copies to null.
    pub fn try_clone(&self) -> Result<IdList<'static>> {
        self.try_clone_in(&alloc::shared())
    }

    pub fn try_clone_in(&self, allocator: &AllocatorRef) -> Result<IdList<'static>> {
        if self.is_null() {
            return Ok(IdList::new());
        }
        IdList::from_parts_in(allocator, &[self.records()])
    }

    /// Turn into an owned list, copying only when the list is borrowed.
    pub fn into_owned(self) -> Result<IdList<'static>> {
        self.into_owned_in(&alloc::shared())
    }

    pub fn into_owned_in(self, allocator: &AllocatorRef) -> Result<IdList<'static>> {
        match self.storage {
            Storage::Null => Ok(IdList::new()),
            Storage::Owned(block) => Ok(IdList {
                storage: Storage::Owned(block),
            }),
            Storage::Borrowed(bytes) => {
                IdList::from_parts_in(allocator, &[&bytes[..bytes.len() - TERMINATOR_SIZE]])
            }
        }
    }

    /// Replace the contents with a deep copy of `other`.
    ///
    /// The current buffer is released first; on failure the list is null.
    pub fn set(&mut self, other: &IdList<'_>) -> Result<()> {
        self.set_in(&alloc::shared(), other)
    }

    pub fn set_in(&mut self, allocator: &AllocatorRef, other: &IdList<'_>) -> Result<()> {
        self.free();
        *self = other.try_clone_in(allocator)?;
        Ok(())
    }

    /// Point at an external list without copying it.
    pub fn set_borrowed(&mut self, bytes: &'a [u8]) -> Result<()> {
        self.free();
        *self = IdList::borrowed(bytes)?;
        Ok(())
    }

    /// Replace the contents with a copy of an external list.
    pub fn make_copy_of(&mut self, bytes: &[u8]) -> Result<()> {
        self.make_copy_of_in(&alloc::shared(), bytes)
    }

    pub fn make_copy_of_in(&mut self, allocator: &AllocatorRef, bytes: &[u8]) -> Result<()> {
        self.free();
        *self = IdList::copy_of_in(allocator, bytes)?;
        Ok(())
    }

    /// Release an owned buffer and reset to null. Idempotent.
    pub fn free(&mut self) {
        if let Storage::Owned(block) = mem::replace(&mut self.storage, Storage::Null) {
            trace!(len = block.len(), "freeing owned list");
            drop(block);
        }
    }

    /// Release the current list and hand back the cleared slot, for
    /// out-parameter style fills.
    pub fn as_mut_slot(&mut self) -> &mut Self {
        self.free();
        self
    }

    /// The encoded list, terminator included. A null list reads as a lone
    /// terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Null => &TERMINATOR,
            Storage::Owned(block) => block.as_slice(),
            Storage::Borrowed(bytes) => bytes,
        }
    }

    /// The encoded records without the terminator.
    #[inline]
    pub fn records(&self) -> &[u8] {
        let bytes = self.as_bytes();
        &bytes[..bytes.len() - TERMINATOR_SIZE]
    }

    /// Total size in bytes, terminator included, found by walking the
    /// records. A null list has the size of a lone terminator.
    pub fn size(&self) -> usize {
        self.items().map(|r| r.size()).sum::<usize>() + TERMINATOR_SIZE
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.storage, Storage::Null)
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    #[inline]
    pub fn is_borrowed(&self) -> bool {
        matches!(self.storage, Storage::Borrowed(_))
    }

    /// True when the list has no item records (null or terminator only).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first_item().is_none()
    }

    /// Allocator backing an owned list.
    pub fn allocator(&self) -> Option<&AllocatorRef> {
        match &self.storage {
            Storage::Owned(block) => Some(block.allocator()),
            _ => None,
        }
    }

    #[inline]
    pub fn items(&self) -> Items<'_> {
        Items::new(self.as_bytes())
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// Exactly one record: the form direct-child provider calls accept.
    pub fn is_single_level(&self) -> bool {
        let mut items = self.items();
        items.next().is_some() && items.next().is_none()
    }

    /// Cursor start; `None` for an empty list.
    #[inline]
    pub fn first_item(&self) -> Option<ItemRecord<'_>> {
        layout::record_at(self.as_bytes(), 0)
    }

    /// Advance the cursor by the current record's size; `None` once the
    /// terminator is reached.
    #[inline]
    pub fn next_item(&self, current: &ItemRecord<'_>) -> Option<ItemRecord<'_>> {
        layout::record_at(self.as_bytes(), current.offset() + current.size())
    }

    pub fn last_item(&self) -> Option<ItemRecord<'_>> {
        self.items().last()
    }
}

impl PartialEq<IdList<'_>> for IdList<'_> {
    fn eq(&self, other: &IdList<'_>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for IdList<'_> {}

impl fmt::Debug for IdList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.storage {
            Storage::Null => "Null",
            Storage::Owned(_) => "Owned",
            Storage::Borrowed(_) => "Borrowed",
        };
        write!(f, "IdList::{kind}")?;
        f.debug_list().entries(self.items()).finish()
    }
}

impl Serialize for IdList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}

impl<'de> Deserialize<'de> for IdList<'static> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        IdList::copy_of(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::alloc::SystemAllocator;
    use crate::config::AllocatorConfig;
    use crate::error::IdListError;
    use crate::layout::push_record;

    fn encode(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in payloads {
            push_record(&mut out, p).unwrap();
        }
        out.extend_from_slice(&TERMINATOR);
        out
    }

    fn fresh() -> AllocatorRef {
        SystemAllocator::default().into_ref()
    }

    #[test]
    fn default_is_null_and_logically_empty() {
        let list = IdList::new();
        assert!(list.is_null());
        assert!(list.is_empty());
        assert!(!list.is_owned());
        assert_eq!(list.size(), TERMINATOR_SIZE);
        assert_eq!(list.as_bytes(), &TERMINATOR);
        assert_eq!(list.item_count(), 0);
    }

    #[test]
    fn borrowed_list_never_releases() {
        let alloc = fresh();
        let owned = IdList::copy_of_in(&alloc, &encode(&[b"a", b"bc"])).unwrap();
        {
            let mut alias = IdList::borrowed(owned.as_bytes()).unwrap();
            assert!(alias.is_borrowed());
            assert!(alias.allocator().is_none());
            assert_eq!(alias.item_count(), 2);
            alias.free();
            assert!(alias.is_null());
        }
        let stats = alloc.stats();
        assert_eq!(stats.live_blocks, 1);
        assert_eq!(stats.total_released, 0);
        // the aliased buffer is untouched
        assert_eq!(owned.item_count(), 2);

        drop(owned);
        assert_eq!(alloc.stats().total_released, 1);
    }

    #[test]
    fn into_owned_copies_borrowed_lists_into_the_given_allocator() {
        let alloc = fresh();
        let bytes = encode(&[b"x"]);
        let owned = IdList::borrowed(&bytes).unwrap().into_owned_in(&alloc).unwrap();
        assert!(owned.is_owned());
        assert_eq!(owned.as_bytes(), bytes.as_slice());
        assert_eq!(alloc.stats().live_blocks, 1);

        // already owned: the block moves, nothing is copied
        let moved = owned.into_owned_in(&fresh()).unwrap();
        assert_eq!(alloc.stats().total_acquired, 1);
        assert!(Arc::ptr_eq(moved.allocator().unwrap(), &alloc));

        let budget = SystemAllocator::new(AllocatorConfig::with_limit(2)).into_ref();
        let err = IdList::borrowed(&bytes).unwrap().into_owned_in(&budget).unwrap_err();
        assert_eq!(err, IdListError::OutOfMemory { requested: 5 });
        assert_eq!(budget.stats().live_blocks, 0);
    }

    #[test]
    fn borrowed_rejects_malformed_bytes() {
        let err = IdList::borrowed(&[5, 0, 1]).unwrap_err();
        assert!(matches!(err, IdListError::Malformed { .. }));
    }

    #[test]
    fn copy_is_isolated_from_original() {
        let alloc = fresh();
        let mut original = IdList::copy_of_in(&alloc, &encode(&[b"one", b"two"])).unwrap();
        let copy = original.try_clone_in(&alloc).unwrap();
        assert_eq!(copy, original);

        original
            .make_copy_of_in(&alloc, &encode(&[b"other"]))
            .unwrap();
        assert_eq!(copy.item_count(), 2);
        assert_eq!(copy.first_item().unwrap().payload(), b"one");
        assert_ne!(copy, original);

        original.free();
        assert_eq!(copy.item_count(), 2);
    }

    #[test]
    fn every_owned_buffer_is_released_once() {
        let alloc = fresh();
        {
            let mut a = IdList::copy_of_in(&alloc, &encode(&[b"x"])).unwrap();
            let b = a.try_clone_in(&alloc).unwrap();
            a.set_in(&alloc, &b).unwrap();
            a.free();
            a.free();
            let _c = b.try_clone_in(&alloc).unwrap();
        }
        let stats = alloc.stats();
        assert_eq!(stats.live_blocks, 0);
        assert_eq!(stats.total_acquired, stats.total_released);
        assert_eq!(stats.total_acquired, 4);
    }

    #[test]
    fn failed_assignment_leaves_list_null() {
        let alloc = SystemAllocator::new(AllocatorConfig::with_limit(8)).into_ref();
        let mut list = IdList::copy_of_in(&alloc, &encode(&[b"abcd"])).unwrap();
        let big = encode(&[b"0123456789"]);
        let source = IdList::borrowed(&big).unwrap();

        let err = list.set_in(&alloc, &source).unwrap_err();
        assert!(matches!(err, IdListError::OutOfMemory { .. }));
        assert!(list.is_null());
        assert_eq!(alloc.stats().live_blocks, 0);
    }

    #[test]
    fn cursor_walks_records_and_stops_at_terminator() {
        let bytes = encode(&[b"a", b"bb", b"ccc"]);
        let list = IdList::borrowed(&bytes).unwrap();

        let mut seen = Vec::new();
        let mut cursor = list.first_item();
        while let Some(record) = cursor {
            seen.push(record.payload().to_vec());
            cursor = list.next_item(&record);
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]);
        assert_eq!(list.last_item().unwrap().payload(), b"ccc");
        assert_eq!(list.size(), bytes.len());
    }

    #[test]
    fn slot_releases_before_refill() {
        let alloc = fresh();
        let mut list = IdList::copy_of_in(&alloc, &encode(&[b"old"])).unwrap();
        let slot = list.as_mut_slot();
        assert!(slot.is_null());
        assert_eq!(alloc.stats().live_blocks, 0);
        *slot = IdList::copy_of_in(&alloc, &encode(&[b"new"])).unwrap();
        assert_eq!(list.first_item().unwrap().payload(), b"new");
    }

    #[test]
    fn trailing_bytes_are_trimmed_from_aliases() {
        let mut bytes = encode(&[b"k"]);
        bytes.extend_from_slice(b"junk");
        let list = IdList::borrowed(&bytes).unwrap();
        assert_eq!(list.as_bytes().len(), 5);
        assert!(list.is_single_level());
    }

    #[test]
    fn null_equals_terminator_only() {
        let terminator_only = IdList::borrowed(&TERMINATOR).unwrap();
        assert_eq!(IdList::new(), terminator_only);
        assert!(!terminator_only.is_null());
        assert!(terminator_only.is_empty());
    }

    #[test]
    fn serde_uses_the_wire_bytes() {
        let bytes = encode(&[b"ab"]);
        let list = IdList::borrowed(&bytes).unwrap();
        let json = serde_json::to_string(&list).unwrap();
        let back: IdList<'static> = serde_json::from_str(&json).unwrap();
        assert!(back.is_owned());
        assert_eq!(back, list);

        let bad: Result<IdList<'static>, _> = serde_json::from_str("[9,0,1]");
        assert!(bad.is_err());
    }

    #[test]
    fn lists_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IdList<'static>>();
    }
}
