//! Block option codec (BLOCK1 / BLOCK2).
//!
//! A block option value packs three fields into one unsigned integer:
//!
//! ```text
//!   bits 0-2   SZX   block size exponent, size = 1 << (SZX + 4)
//!   bit  3     M     more blocks follow
//!   bits 4-    NUM   block sequence number
//! ```
//!
//! Decoding never fails. SZX 7 is reserved, but peers send it anyway, so it
//! decodes to a 2048-byte block like any other exponent.

use crate::option::{Options, OptionValue};

/// Block size used when a message carries no block option.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

const SZX_MASK: u32 = 0x7;
const MORE_BIT: u32 = 0x8;
const NUM_SHIFT: u32 = 4;

/// Decoded block option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset of this block from the start of the body.
    pub start_offset: u64,
    /// `false` on the final block.
    pub more_blocks: bool,
    /// Block size in bytes (16..=2048).
    pub block_size: usize,
}

impl BlockInfo {
    pub fn new(start_offset: u64, more_blocks: bool, block_size: usize) -> Self {
        Self {
            start_offset,
            more_blocks,
            block_size,
        }
    }

    pub fn decode(raw: u32) -> Self {
        let shift = (raw & SZX_MASK) + 4;
        let index = u64::from(raw >> NUM_SHIFT);
        Self {
            start_offset: index << shift,
            more_blocks: raw & MORE_BIT != 0,
            block_size: 1usize << shift,
        }
    }

    /// Pack into an option value.
    ///
    /// A block size that is not a power of two is rounded down to the
    /// nearest encodable size; the sequence number is derived from that size.
    pub fn encode(&self) -> u32 {
        let szx = size_exponent(self.block_size);
        let index = (self.start_offset >> (szx + 4)) as u32;
        let more = if self.more_blocks { MORE_BIT } else { 0 };
        (index << NUM_SHIFT) | more | szx
    }

    /// Sequence number of this block at its (encodable) block size.
    pub fn block_index(&self) -> u64 {
        self.start_offset >> (size_exponent(self.block_size) + 4)
    }

    pub fn is_first(&self) -> bool {
        self.start_offset == 0
    }

    /// Decode the first option with `number`, if present and an integer.
    pub fn from_options(options: &Options, number: u16) -> Option<Self> {
        options
            .find(number)
            .and_then(OptionValue::as_uint)
            .map(Self::decode)
    }
}

/// SZX for a block size: floor(log2(size)) - 4, clamped to 0..=7.
fn size_exponent(block_size: usize) -> u32 {
    if block_size < 16 {
        return 0;
    }
    (block_size.ilog2() - 4).min(7)
}
