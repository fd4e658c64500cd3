//! Output side of the pipeline.
//!
//! - [`SinkWriter`] - Appends raw digests to an output and owns its close

use std::io::{BufWriter, Write};

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::chunk::{BlockDigest, Digest};
use crate::error::DigestError;
use crate::pipeline::shutdown::{PanicGuard, Shutdown};

/// Number of digests buffered before they are written to the output.
pub const SINK_BUFFER_DIGESTS: usize = 64;

/// Writes digests to an output as a raw concatenation of 16-byte values.
///
/// The writer takes ownership of the output. [`close`](Self::close) flushes
/// and drops it exactly once; since it consumes the writer it cannot run
/// twice.
///
/// # Example
///
/// ```
/// use blocksum::{Digest, SinkWriter};
///
/// let mut out = Vec::new();
/// let mut sink = SinkWriter::new(&mut out);
/// sink.write_digest(&Digest::new([0xAB; 16]))?;
/// sink.close()?;
///
/// assert_eq!(out, [0xAB; 16]);
/// # Ok::<(), blocksum::DigestError>(())
/// ```
pub struct SinkWriter<W: Write> {
    writer: BufWriter<W>,
    written: u64,
}

impl<W: Write> SinkWriter<W> {
    /// Wraps an output.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(SINK_BUFFER_DIGESTS * Digest::SIZE, writer),
            written: 0,
        }
    }

    /// Appends one digest's raw bytes.
    pub fn write_digest(&mut self, digest: &Digest) -> Result<(), DigestError> {
        self.writer
            .write_all(digest.as_bytes())
            .map_err(DigestError::Write)?;
        self.written += 1;
        Ok(())
    }

    /// Returns the number of digests accepted so far.
    pub fn digests_written(&self) -> u64 {
        self.written
    }

    /// Flushes and closes the output.
    ///
    /// The output is dropped even when the flush fails; bytes that could
    /// not be flushed are discarded rather than retried on drop.
    pub fn close(self) -> Result<(), DigestError> {
        let Self { mut writer, .. } = self;
        let flushed = writer.flush();
        let (output, _unflushed) = writer.into_parts();
        drop(output);
        flushed.map_err(DigestError::Write)
    }
}

/// Runs the sink stage and returns the number of digests written.
///
/// Stops writing at the first write error or on cancellation, then keeps
/// draining `ordered` until the reorder stage hangs up before closing the
/// output.
pub(crate) fn run_sink<W: Write>(
    ordered: Receiver<BlockDigest>,
    mut sink: SinkWriter<W>,
    shutdown: &Shutdown,
) -> u64 {
    let _guard = PanicGuard::new(shutdown, "sink");

    for result in ordered.iter() {
        if shutdown.is_cancelled() {
            break;
        }
        if let Err(e) = sink.write_digest(&result.digest) {
            shutdown.fail(e);
            break;
        }
    }

    let discarded = ordered.iter().count();
    if discarded > 0 {
        debug!(discarded, "sink drained after cancellation");
    }

    let written = sink.digests_written();
    if let Err(e) = sink.close() {
        shutdown.fail(e);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;

    /// Accepts `budget` bytes, then fails every write. Counts flushes and
    /// drops.
    struct Flaky {
        budget: usize,
        accepted: Vec<u8>,
        flushes: Rc<Cell<usize>>,
        drops: Rc<Cell<usize>>,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("disk full"));
            }
            let n = buf.len().min(self.budget);
            self.accepted.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes.set(self.flushes.get() + 1);
            Ok(())
        }
    }

    impl Drop for Flaky {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn flaky(budget: usize) -> (Flaky, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let flushes = Rc::new(Cell::new(0));
        let drops = Rc::new(Cell::new(0));
        let writer = Flaky {
            budget,
            accepted: Vec::new(),
            flushes: flushes.clone(),
            drops: drops.clone(),
        };
        (writer, flushes, drops)
    }

    #[test]
    fn test_writes_raw_bytes_in_order() {
        let mut out = Vec::new();
        let mut sink = SinkWriter::new(&mut out);
        sink.write_digest(&Digest::new([1; 16])).unwrap();
        sink.write_digest(&Digest::new([2; 16])).unwrap();
        assert_eq!(sink.digests_written(), 2);
        sink.close().unwrap();

        assert_eq!(out.len(), 32);
        assert_eq!(&out[..16], &[1; 16]);
        assert_eq!(&out[16..], &[2; 16]);
    }

    #[test]
    fn test_close_flushes_and_drops_once() {
        let (writer, flushes, drops) = flaky(usize::MAX);
        let mut sink = SinkWriter::new(writer);
        sink.write_digest(&Digest::new([9; 16])).unwrap();
        sink.close().unwrap();

        assert_eq!(flushes.get(), 1);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_close_after_failed_flush_still_drops() {
        let (writer, _flushes, drops) = flaky(20);
        let mut sink = SinkWriter::new(writer);
        sink.write_digest(&Digest::new([1; 16])).unwrap();
        sink.write_digest(&Digest::new([2; 16])).unwrap();

        let err = sink.close().unwrap_err();
        assert!(err.is_write());
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_stage_writes_everything_received() {
        let (ordered_tx, ordered_rx) = crossbeam_channel::bounded(4);
        let shutdown = Shutdown::new();
        for sequence in 0..3u8 {
            ordered_tx
                .send(BlockDigest {
                    sequence: sequence as u64,
                    digest: Digest::new([sequence; 16]),
                })
                .unwrap();
        }
        drop(ordered_tx);

        let mut out = Vec::new();
        let written = run_sink(ordered_rx, SinkWriter::new(&mut out), &shutdown);
        assert_eq!(written, 3);
        assert_eq!(out.len(), 48);
        assert!(shutdown.take_error().is_none());
    }

    #[test]
    fn test_stage_write_failure_drains_and_closes_once() {
        let (ordered_tx, ordered_rx) = crossbeam_channel::unbounded();
        let remaining = ordered_rx.clone();
        let shutdown = Shutdown::new();
        for sequence in 0..100u64 {
            ordered_tx
                .send(BlockDigest {
                    sequence,
                    digest: Digest::new([sequence as u8; 16]),
                })
                .unwrap();
        }
        drop(ordered_tx);

        // Fails on the first buffer flush, after 64 digests were accepted.
        let (writer, _flushes, drops) = flaky(100);
        let written = run_sink(ordered_rx, SinkWriter::new(writer), &shutdown);

        assert_eq!(written, SINK_BUFFER_DIGESTS as u64);
        assert_eq!(drops.get(), 1);
        assert!(remaining.is_empty());
        assert!(shutdown.is_cancelled());
        assert!(shutdown.take_error().unwrap().is_write());
    }
}
