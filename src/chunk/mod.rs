//! Chunk types.
//!
//! - [`Chunk`] - Numbered fixed-size block of input
//! - [`Digest`] - 16-byte MD5 value
//! - [`BlockDigest`] - Digest tagged with its block's sequence number

mod data;
mod digest;

pub use data::Chunk;
pub use digest::{BlockDigest, Digest};
