//! The Chunk type - one numbered block of the input stream.

use bytes::Bytes;
use std::fmt;

/// A fixed-size block of input, numbered in stream order.
///
/// Every block has exactly the configured block size except possibly the
/// last one of a stream.
///
/// # Example
///
/// ```
/// use blocksum::Chunk;
/// use bytes::Bytes;
///
/// let chunk = Chunk::new(3, 12, Bytes::from_static(b"EFGH"));
///
/// assert_eq!(chunk.range(), 12..16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this block in the stream, starting at 0.
    pub sequence: u64,

    /// Byte offset of this block in the stream.
    pub offset: u64,

    /// The block payload.
    pub data: Bytes,
}

impl Chunk {
    /// Creates a new chunk.
    pub fn new(sequence: u64, offset: u64, data: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            offset,
            data: data.into(),
        }
    }

    /// Returns the length of the chunk data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the end offset (exclusive).
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// Returns the chunk as a byte range of the stream.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.offset..self.end()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chunk#{}({} bytes @ {})",
            self.sequence,
            self.len(),
            self.offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let chunk = Chunk::new(0, 0, &b"hello"[..]);
        assert_eq!(chunk.len(), 5);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_range() {
        let chunk = Chunk::new(2, 100, &b"hello"[..]);
        assert_eq!(chunk.end(), 105);
        assert_eq!(chunk.range(), 100..105);
    }

    #[test]
    fn test_display() {
        let chunk = Chunk::new(4, 100, &b"hello"[..]);
        let s = chunk.to_string();
        assert!(s.contains("#4"));
        assert!(s.contains("5 bytes"));
        assert!(s.contains("@ 100"));
    }
}
