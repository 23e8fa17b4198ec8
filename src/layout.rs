//! Wire layout — the record format shared with every namespace provider.
//!
//! ## Record Layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ size (u16)   │ payload                  │
//! │ native endian│ size - 2 bytes, opaque   │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! A list is a run of records followed by one terminator record whose size
//! is 0 and which carries no payload. There is no overall length field; the
//! only way to find the end is to walk the records.
//!
//! The size field uses the host byte order because it mirrors the provider's
//! in-memory representation. The format is not portable across endianness.

use zerocopy::byteorder::{NativeEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{IdListError, Result};

/// Bytes occupied by a record's size field.
pub const SIZE_FIELD_LEN: usize = 2;

/// Bytes occupied by the terminator record.
pub const TERMINATOR_SIZE: usize = SIZE_FIELD_LEN;

/// Encoded terminator record.
pub const TERMINATOR: [u8; TERMINATOR_SIZE] = [0; TERMINATOR_SIZE];

/// Largest payload a single record can carry.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - SIZE_FIELD_LEN;

/// The size field at the start of every record.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct ItemHeader {
    cb: U16<NativeEndian>,
}

const _: () = assert!(
    core::mem::size_of::<ItemHeader>() == SIZE_FIELD_LEN,
    "ItemHeader must be exactly the size field"
);

impl ItemHeader {
    #[inline]
    pub const fn new(size: u16) -> Self {
        Self { cb: U16::new(size) }
    }

    /// Total record length including the size field; 0 for the terminator.
    #[inline]
    pub fn size(&self) -> usize {
        self.cb.get() as usize
    }

    /// Read the header at the start of `bytes`, if there is room for one.
    #[inline]
    pub fn read(bytes: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(bytes).ok().map(|(header, _)| header)
    }
}

/// A borrowed view of one non-terminator record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ItemRecord<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> ItemRecord<'a> {
    /// Byte offset of this record within its list.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared record size (size field included).
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The full encoded record, size field included.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The provider-defined token.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[SIZE_FIELD_LEN..]
    }
}

impl std::fmt::Debug for ItemRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}[", self.offset)?;
        for (i, b) in self.payload().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        f.write_str("]")
    }
}

/// Read the record starting at `offset`.
///
/// Returns `None` at the terminator and for anything that does not fit the
/// buffer, so a cursor can never step past the end of a list.
pub fn record_at(bytes: &[u8], offset: usize) -> Option<ItemRecord<'_>> {
    let rest = bytes.get(offset..)?;
    let size = ItemHeader::read(rest)?.size();
    if size < SIZE_FIELD_LEN || size > rest.len() {
        return None;
    }
    Some(ItemRecord {
        offset,
        bytes: &rest[..size],
    })
}

/// Check that `bytes` starts with a well-formed list and return its size
/// (terminator included). Bytes after the terminator are ignored.
pub fn validate(bytes: &[u8]) -> Result<usize> {
    let mut offset = 0;
    loop {
        let rest = &bytes[offset..];
        let header = ItemHeader::read(rest).ok_or(IdListError::Malformed {
            offset,
            reason: "missing terminator",
        })?;
        let size = header.size();
        if size == 0 {
            return Ok(offset + TERMINATOR_SIZE);
        }
        if size < SIZE_FIELD_LEN {
            return Err(IdListError::Malformed {
                offset,
                reason: "record shorter than its size field",
            });
        }
        if size > rest.len() {
            return Err(IdListError::Malformed {
                offset,
                reason: "record overruns the buffer",
            });
        }
        offset += size;
    }
}

/// Encoded length of a record carrying `payload`.
#[inline]
pub fn record_len(payload: &[u8]) -> Result<usize> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(IdListError::ItemTooLarge { len: payload.len() });
    }
    Ok(SIZE_FIELD_LEN + payload.len())
}

/// Append one record carrying `payload` to `out`.
pub fn push_record(out: &mut Vec<u8>, payload: &[u8]) -> Result<()> {
    let len = record_len(payload)?;
    // `record_len` bounds `len` to u16.
    out.extend_from_slice(ItemHeader::new(len as u16).as_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Lazy iterator over the records of a validated list.
#[derive(Clone, Debug)]
pub struct Items<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Items<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

impl<'a> Iterator for Items<'a> {
    type Item = ItemRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = record_at(self.bytes, self.offset)?;
        self.offset += record.size();
        Some(record)
    }
}

impl std::iter::FusedIterator for Items<'_> {}
