//! Digest a file block by block and print each digest.
//!
//! Run with:
//!     cargo run --example digest_file -- /path/to/file [block-size]

use std::env;
use std::fs::File;

use blocksum::{Digest, Pipeline, PipelineConfig, default_concurrency};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "Cargo.toml".to_string());
    let block_size = match args.next() {
        Some(size) => size.parse()?,
        None => 4096,
    };

    let file = File::open(&path)?;
    println!(
        "Digesting {} ({} bytes) in {}-byte blocks\n",
        path,
        file.metadata()?.len(),
        block_size
    );

    let config = PipelineConfig::new(block_size, default_concurrency())?;
    let mut digests = Vec::new();
    let summary = Pipeline::new(config)?.run(file, &mut digests)?;

    for (index, raw) in digests.chunks_exact(Digest::SIZE).enumerate() {
        let digest = Digest::from_slice(raw).ok_or("truncated digest")?;
        let offset = index as u64 * block_size as u64;
        println!("Block {:>6}: offset={:>10}, md5={}", index, offset, digest);
    }

    println!(
        "\nTotal: {} blocks, {} bytes, at most {} blocks held for reordering",
        summary.blocks, summary.bytes, summary.max_pending
    );
    Ok(())
}
