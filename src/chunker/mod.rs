//! Fixed-size chunking of byte streams.
//!
//! - [`Chunker`] - Splits readers and buffers into numbered blocks
//! - [`ChunkIter`] - Lazy, non-restartable iterator over a reader's blocks

mod iter;

pub use iter::{ChunkIter, Chunker};
