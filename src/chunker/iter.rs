//! Fixed-size chunking - Chunker and ChunkIter.
//!
//! - [`Chunker`] - Holds the block size and starts chunking operations
//! - [`ChunkIter`] - Iterator that yields numbered blocks from a [`std::io::Read`] source
//!
//! # Example
//!
//! ```
//! use blocksum::Chunker;
//! use std::io::Cursor;
//!
//! let chunker = Chunker::new(4)?;
//! let chunks: Vec<_> = chunker
//!     .chunk(Cursor::new(&b"ABCDEFG"[..]))
//!     .collect::<Result<_, _>>()?;
//!
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(&chunks[1].data[..], b"EFG");
//! # Ok::<(), blocksum::DigestError>(())
//! ```

use std::io::{self, Read};
use std::iter::FusedIterator;

use bytes::{Bytes, BytesMut};

use crate::chunk::Chunk;
use crate::config::MAX_BLOCK_SIZE;
use crate::error::DigestError;

/// Splits byte sources into numbered blocks of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    block_size: usize,
}

impl Chunker {
    /// Creates a chunker producing blocks of `block_size` bytes.
    ///
    /// Returns an error if `block_size` is zero or above
    /// [`MAX_BLOCK_SIZE`](crate::MAX_BLOCK_SIZE).
    pub fn new(block_size: usize) -> Result<Self, DigestError> {
        if block_size == 0 {
            return Err(DigestError::InvalidConfig {
                message: "block size must be non-zero",
            });
        }
        if block_size > MAX_BLOCK_SIZE {
            return Err(DigestError::InvalidConfig {
                message: "block size exceeds MAX_BLOCK_SIZE",
            });
        }
        Ok(Self { block_size })
    }

    /// Returns the block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Creates a chunking iterator from a reader.
    ///
    /// The iterator reads lazily, one block per call to `next`.
    pub fn chunk<R: Read>(self, reader: R) -> ChunkIter<R> {
        ChunkIter::new(reader, self.block_size)
    }

    /// Chunks an in-memory buffer.
    ///
    /// Blocks share the buffer's storage; nothing is copied.
    ///
    /// ```
    /// use blocksum::Chunker;
    ///
    /// let chunks = Chunker::new(4)?.chunk_bytes(&b"ABCDEFGH"[..]);
    ///
    /// assert_eq!(chunks.len(), 2);
    /// assert_eq!(chunks[1].offset, 4);
    /// # Ok::<(), blocksum::DigestError>(())
    /// ```
    pub fn chunk_bytes(&self, data: impl Into<Bytes>) -> Vec<Chunk> {
        let data = data.into();
        let mut chunks = Vec::with_capacity(data.len().div_ceil(self.block_size));
        let mut start = 0usize;

        while start < data.len() {
            let end = (start + self.block_size).min(data.len());
            chunks.push(Chunk::new(
                chunks.len() as u64,
                start as u64,
                data.slice(start..end),
            ));
            start = end;
        }

        chunks
    }
}

/// An iterator that yields numbered blocks from a reader.
///
/// Each item holds exactly `block_size` bytes except possibly the last.
/// Sequence numbers start at 0 and have no gaps. After the end of the
/// stream or a read error the iterator is fused.
pub struct ChunkIter<R> {
    reader: R,
    block_size: usize,
    sequence: u64,
    offset: u64,
    finished: bool,
}

impl<R: Read> ChunkIter<R> {
    fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size,
            sequence: 0,
            offset: 0,
            finished: false,
        }
    }

    /// Returns the sequence number the next block will carry, which is also
    /// the number of blocks produced so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the number of bytes consumed from the reader so far.
    pub fn bytes_read(&self) -> u64 {
        self.offset
    }

    /// Reads until the block is full or the reader reports end of stream.
    ///
    /// A single `read` may return fewer bytes than asked for, so stopping
    /// at the first short read would make block boundaries depend on the
    /// reader.
    fn fill_block(&mut self) -> io::Result<BytesMut> {
        let mut block = BytesMut::zeroed(self.block_size);
        let mut filled = 0;

        while filled < block.len() {
            match self.reader.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        block.truncate(filled);
        Ok(block)
    }
}

impl<R: Read> Iterator for ChunkIter<R> {
    type Item = Result<Chunk, DigestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let block = match self.fill_block() {
            Ok(block) => block,
            Err(e) => {
                self.finished = true;
                return Some(Err(DigestError::Read(e)));
            }
        };

        if block.is_empty() {
            self.finished = true;
            return None;
        }

        // A short block means the reader hit end of stream.
        if block.len() < self.block_size {
            self.finished = true;
        }

        let chunk = Chunk::new(self.sequence, self.offset, block.freeze());
        self.sequence += 1;
        self.offset += chunk.len() as u64;
        Some(Ok(chunk))
    }
}

impl<R: Read> FusedIterator for ChunkIter<R> {}
