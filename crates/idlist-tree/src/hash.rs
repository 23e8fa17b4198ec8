//! Item tokens for tree nodes.
//!
//! Uses FNV-1a for fast, const-compatible hashing with good distribution.
//!
//! ## Token Layout
//!
//! ```text
//! ┌────────────────────┬──────────────────┬─────┐
//! │ hash (u64, native) │ name (UTF-8)     │ NUL │
//! │ of the folded name │ as spelled       │     │
//! └────────────────────┴──────────────────┴─────┘
//! ```
//!
//! The name sits at a fixed offset so display names can be returned as an
//! offset into the record.

use idlist::{ItemToken, SIZE_FIELD_LEN};
use zerocopy::byteorder::{NativeEndian, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Fixed prefix of every tree token.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct TokenHeader {
    hash: U64<NativeEndian>,
}

impl TokenHeader {
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash.get()
    }

    /// Read the header at the start of a token payload.
    pub fn read(payload: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(payload).ok().map(|(header, _)| header)
    }
}

/// Offset of the name within an encoded record (size field included).
pub const NAME_OFFSET: usize = SIZE_FIELD_LEN + core::mem::size_of::<TokenHeader>();

/// Token bytes added around a name.
pub const TOKEN_OVERHEAD: usize = core::mem::size_of::<TokenHeader>() + 1;

/// FNV-1a 64-bit hash — simple, fast, const-compatible.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }
    hash
}

/// Lookup key for a name under the tree's case rules.
pub fn fold(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

/// Encode the token for a node called `name`.
pub fn item_token(name: &str, case_sensitive: bool) -> ItemToken {
    let header = TokenHeader {
        hash: U64::new(fnv1a_64(fold(name, case_sensitive).as_bytes())),
    };
    let mut token = Vec::with_capacity(name.len() + TOKEN_OVERHEAD);
    token.extend_from_slice(header.as_bytes());
    token.extend_from_slice(name.as_bytes());
    token.push(0);
    token
}
