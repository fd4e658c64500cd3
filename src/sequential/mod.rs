//! Single-threaded reference digester.
//!
//! Produces exactly the output the concurrent pipeline must reproduce. Used
//! as the oracle in tests, fuzzing and benchmarks.

use std::io::{Read, Write};

use crate::chunker::Chunker;
use crate::error::DigestError;
use crate::hash::Md5Hasher;
use crate::pipeline::RunSummary;
use crate::sink::SinkWriter;

/// Digests `reader` block by block on the calling thread.
///
/// ```
/// use blocksum::{digest_sequential, Md5Hasher};
/// use std::io::Cursor;
///
/// let mut out = Vec::new();
/// let summary = digest_sequential(Cursor::new(b"ABCDEFGH"), &mut out, 4)?;
///
/// assert_eq!(summary.blocks, 2);
/// assert_eq!(&out[16..], Md5Hasher::hash(b"EFGH").as_bytes());
/// # Ok::<(), blocksum::DigestError>(())
/// ```
pub fn digest_sequential<R: Read, W: Write>(
    reader: R,
    writer: W,
    block_size: usize,
) -> Result<RunSummary, DigestError> {
    let mut blocks = Chunker::new(block_size)?.chunk(reader);
    let mut sink = SinkWriter::new(writer);

    let written = blocks.by_ref().try_for_each(|chunk| {
        let chunk = chunk?;
        sink.write_digest(&Md5Hasher::hash(&chunk.data))
    });

    // Close on every path; a write or read error takes precedence.
    let closed = sink.close();
    written?;
    closed?;

    Ok(RunSummary {
        blocks: blocks.sequence(),
        bytes: blocks.bytes_read(),
        max_pending: 0,
    })
}
