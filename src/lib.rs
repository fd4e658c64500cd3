//! blocksum
//!
//! Concurrent fixed-size block checksumming for Rust.
//!
//! `blocksum` splits a byte stream into numbered blocks of a fixed size,
//! digests each block with MD5 on a bounded pool of worker threads and
//! writes the 16-byte digests, concatenated in input order, to an output.
//! The output is bit-identical to a strictly sequential run for every
//! concurrency level.
//!
//! The crate:
//! - does NOT open files or resolve paths (the `blocksum` binary does)
//! - does NOT resume interrupted runs
//! - does NOT support other digests or variable-size blocks
//!
//! Pipeline: **Read bytes → numbered blocks → N workers → reorder → write
//! digests**
//!
//! # Sync
//!
//! ```no_run
//! use std::fs::File;
//! use blocksum::{DigestError, Pipeline, PipelineConfig};
//!
//! fn main() -> Result<(), DigestError> {
//!     let input = File::open("data.bin").map_err(DigestError::Read)?;
//!     let output = File::create("data.md5s").map_err(DigestError::Write)?;
//!
//!     let summary = Pipeline::new(PipelineConfig::default())?.run(input, output)?;
//!     println!("{} blocks", summary.blocks);
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use blocksum::{chunk_async, Chunker};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R) -> Result<(), blocksum::DigestError> {
//!     let mut stream = chunk_async(reader, Chunker::new(1 << 20)?);
//!
//!     while let Some(chunk) = stream.next().await {
//!         let chunk = chunk?;
//!         println!("block {}: {} bytes", chunk.sequence, chunk.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chunk;
mod chunker;
mod config;
mod error;
mod hash;
mod pipeline;
mod reorder;
mod sequential;
mod sink;

#[cfg(feature = "async-io")]
mod async_stream;

//
// Public surface
//

pub use chunk::{BlockDigest, Chunk, Digest};
pub use chunker::{ChunkIter, Chunker};
pub use config::{
    DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MAX_CONCURRENCY, MAX_WINDOW, PipelineConfig,
    default_concurrency,
};
pub use error::DigestError;
pub use hash::{BlockHasher, Md5Hasher};
pub use pipeline::{Pipeline, PipelineState, RunSummary};
pub use reorder::ReorderBuffer;
pub use sequential::digest_sequential;
pub use sink::SinkWriter;

#[cfg(feature = "async-io")]
pub use async_stream::{BlockStream, chunk_async};
