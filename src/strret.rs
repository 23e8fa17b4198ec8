//! Tagged string returns from providers and their normalization.

use tracing::warn;
use zerocopy::IntoBytes;

use crate::alloc::{self, AllocatorRef, Block};
use crate::error::Result;
use crate::list::IdList;

/// A UTF-16 string living in an allocator block, handed over by a provider.
///
/// Consuming it through [`IdList::extract_str`] releases the block.
#[derive(Debug)]
pub struct ProviderString {
    block: Block,
}

impl ProviderString {
    pub fn new(text: &str) -> Result<Self> {
        Self::new_in(&alloc::shared(), text)
    }

    pub fn new_in(allocator: &AllocatorRef, text: &str) -> Result<Self> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let bytes = units.as_bytes();
        let mut block = Block::acquire(allocator, bytes.len())?;
        block.as_mut_slice().copy_from_slice(bytes);
        Ok(Self { block })
    }

    fn decode(&self) -> String {
        let units: Vec<u16> = self
            .block
            .as_slice()
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        String::from_utf16_lossy(&units)
    }
}

/// How a provider returned a display string.
#[derive(Debug)]
pub enum StrRet {
    /// Provider-allocated wide string.
    Wide(ProviderString),
    /// NUL-terminated bytes at this offset into the queried list.
    Offset(usize),
    /// NUL-terminated narrow string.
    Ansi(Vec<u8>),
}

fn until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl IdList<'_> {
    /// Normalize a provider string return into a plain string.
    ///
    /// `Offset` returns are resolved against this list, which must be the
    /// list the provider was asked about. Provider-owned memory is released
    /// before this returns.
    pub fn extract_str(&self, ret: StrRet) -> String {
        match ret {
            StrRet::Wide(text) => text.decode(),
            StrRet::Offset(offset) => match self.records().get(offset..) {
                Some(bytes) => until_nul(bytes),
                None => {
                    warn!(offset, size = self.size(), "display name offset outside the list");
                    String::new()
                }
            },
            StrRet::Ansi(bytes) => until_nul(&bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SystemAllocator;
    use crate::layout::{TERMINATOR, push_record};

    #[test]
    fn wide_strings_are_decoded_and_released() {
        let alloc = SystemAllocator::default().into_ref();
        let ret = StrRet::Wide(ProviderString::new_in(&alloc, "Système 32").unwrap());
        assert_eq!(alloc.stats().live_blocks, 1);

        assert_eq!(IdList::new().extract_str(ret), "Système 32");
        assert_eq!(alloc.stats().live_blocks, 0);
    }

    #[test]
    fn offset_reads_from_the_record() {
        let mut bytes = Vec::new();
        push_record(&mut bytes, b"\x01\x02name\0pad").unwrap();
        bytes.extend_from_slice(&TERMINATOR);
        let list = IdList::borrowed(&bytes).unwrap();

        assert_eq!(list.extract_str(StrRet::Offset(4)), "name");
        assert_eq!(list.extract_str(StrRet::Offset(500)), "");
    }

    #[test]
    fn ansi_stops_at_nul() {
        let list = IdList::new();
        assert_eq!(list.extract_str(StrRet::Ansi(b"abc\0def".to_vec())), "abc");
        assert_eq!(list.extract_str(StrRet::Ansi(b"no-nul".to_vec())), "no-nul");
    }
}
