//! Async streaming support for fixed-size chunking.
//!
//! - [`chunk_async`] - Creates an async stream of blocks from an async reader
//!
//! This module requires the `async-io` feature to be enabled.

mod stream;

pub use stream::{BlockStream, chunk_async};
