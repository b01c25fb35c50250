//! Message bodies: fixed buffers or streaming block sources.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("offset {offset} is past the end of a {payload_size}-byte payload")]
    OutOfRange { offset: u64, payload_size: u64 },
    #[error("block source failed: {0}")]
    Source(String),
}

/// Clamp a block to the payload.
///
/// Returns the block size to send at `offset` and whether more blocks
/// follow it.
pub fn adjust_chunk_size(
    offset: u64,
    block_size: usize,
    payload_size: u64,
) -> Result<(usize, bool), BlockError> {
    if offset >= payload_size {
        return Err(BlockError::OutOfRange {
            offset,
            payload_size,
        });
    }
    let remaining = payload_size - offset;
    if block_size as u64 >= remaining {
        Ok((remaining as usize, false))
    } else {
        Ok((block_size, true))
    }
}

/// A body that is produced block by block instead of held in memory.
pub trait BlockSource: Send + Sync {
    /// Size of the block at `offset` (at most `block_size`) and whether
    /// more data follows it.
    fn data_size(&self, offset: u64, block_size: usize) -> Result<(usize, bool), BlockError>;

    /// Read `size` bytes starting at `offset`.
    fn read(&self, offset: u64, size: usize) -> Result<Bytes, BlockError>;
}

/// In-memory block source.
#[derive(Debug, Clone)]
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl BlockSource for BytesSource {
    fn data_size(&self, offset: u64, block_size: usize) -> Result<(usize, bool), BlockError> {
        adjust_chunk_size(offset, block_size, self.data.len() as u64)
    }

    fn read(&self, offset: u64, size: usize) -> Result<Bytes, BlockError> {
        let (size, _) = self.data_size(offset, size)?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + size))
    }
}

/// Response or request body.
#[derive(Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Source(Arc<dyn BlockSource>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(b) => b.is_empty(),
            Self::Source(_) => false,
        }
    }

    /// The buffered bytes, if this body is not streamed.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Source(_) => f.write_str("Source(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}
