//! Async block stream over a tokio file.
//!
//! Run with:
//!     cargo run --example async_blocks --features async-io -- /path/to/file

use futures_util::StreamExt;
use tokio_util::compat::TokioAsyncReadCompatExt;

use blocksum::{Chunker, Md5Hasher, chunk_async};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());

    let file = tokio::fs::File::open(&path).await?;
    let mut stream = chunk_async(file.compat(), Chunker::new(1024)?);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        println!("{}: md5={}", chunk, Md5Hasher::hash(&chunk.data));
    }

    Ok(())
}
