//! List algebra — concatenation and split over already-validated lists.
//!
//! Nothing here touches a namespace provider, so the only possible failure
//! is [`IdListError::OutOfMemory`](crate::IdListError::OutOfMemory). Inputs
//! are never modified.

use std::ops::Add;

use crate::alloc::{self, AllocatorRef};
use crate::error::Result;
use crate::list::IdList;

impl IdList<'_> {
    /// `self`'s records followed by `other`'s records and one terminator.
    ///
    /// Allocates exactly once, from the shared allocator.
    pub fn concat(&self, other: &IdList<'_>) -> Result<IdList<'static>> {
        self.concat_in(&alloc::shared(), other)
    }

    pub fn concat_in(&self, allocator: &AllocatorRef, other: &IdList<'_>) -> Result<IdList<'static>> {
        IdList::from_parts_in(allocator, &[self.records(), other.records()])
    }

    /// `result = a + b`. The previous contents of `result` are released
    /// first; on failure `result` is null.
    pub fn concat_into(a: &IdList<'_>, b: &IdList<'_>, result: &mut IdList<'_>) -> Result<()> {
        Self::concat_into_in(&alloc::shared(), a, b, result)
    }

    pub fn concat_into_in(
        allocator: &AllocatorRef,
        a: &IdList<'_>,
        b: &IdList<'_>,
        result: &mut IdList<'_>,
    ) -> Result<()> {
        result.free();
        *result = a.concat_in(allocator, b)?;
        Ok(())
    }

    /// Split a path into the parent chain and its final record.
    ///
    /// For `a\b\c` the root is `a\b` and the object is `c`, each with its own
    /// terminator. A single-record list yields a null root and a copy of the
    /// record; an empty list yields two null lists.
    pub fn split(&self) -> Result<(IdList<'static>, IdList<'static>)> {
        self.split_in(&alloc::shared())
    }

    pub fn split_in(&self, allocator: &AllocatorRef) -> Result<(IdList<'static>, IdList<'static>)> {
        let Some(last) = self.last_item() else {
            return Ok((IdList::new(), IdList::new()));
        };

        let parent = &self.as_bytes()[..last.offset()];
        let root = if parent.is_empty() {
            IdList::new()
        } else {
            IdList::from_parts_in(allocator, &[parent])?
        };
        let obj = IdList::from_parts_in(allocator, &[last.as_bytes()])?;
        Ok((root, obj))
    }

    /// Out-parameter form of [`split`](Self::split). Both targets are
    /// released first and stay null on failure.
    pub fn split_into(&self, root: &mut IdList<'_>, obj: &mut IdList<'_>) -> Result<()> {
        self.split_into_in(&alloc::shared(), root, obj)
    }

    pub fn split_into_in(
        &self,
        allocator: &AllocatorRef,
        root: &mut IdList<'_>,
        obj: &mut IdList<'_>,
    ) -> Result<()> {
        root.free();
        obj.free();
        let (r, o) = self.split_in(allocator)?;
        *root = r;
        *obj = o;
        Ok(())
    }
}

impl<'b> Add<&IdList<'b>> for &IdList<'_> {
    type Output = Result<IdList<'static>>;

    fn add(self, rhs: &IdList<'b>) -> Self::Output {
        self.concat(rhs)
    }
}
