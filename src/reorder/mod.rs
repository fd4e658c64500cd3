//! Restores sequence order to results produced out of order.
//!
//! - [`ReorderBuffer`] - Cursor plus pending map, releasing results strictly
//!   by ascending sequence number
//!
//! Workers finish blocks in any order. The buffer holds results that arrive
//! ahead of the cursor and releases them as soon as every lower sequence
//! number has been released, the same way a TCP receiver reassembles
//! segments.

use std::collections::BTreeMap;
use std::iter;

use crossbeam_channel::{Receiver, Sender, select};
use tracing::debug;

use crate::chunk::BlockDigest;
use crate::error::DigestError;
use crate::pipeline::shutdown::{PanicGuard, Shutdown};

/// Reassembles an out-of-order stream of numbered items.
///
/// Every sequence number below [`next_expected`](Self::next_expected) has
/// been released exactly once, in order. Nothing is ever released twice.
///
/// # Example
///
/// ```
/// use blocksum::ReorderBuffer;
///
/// let mut buffer = ReorderBuffer::new();
/// buffer.push(1, "b")?;
/// assert_eq!(buffer.pop_ready(), None);
///
/// buffer.push(0, "a")?;
/// let released: Vec<_> = buffer.drain_ready().collect();
/// assert_eq!(released, ["a", "b"]);
/// assert_eq!(buffer.next_expected(), 2);
/// # Ok::<(), blocksum::DigestError>(())
/// ```
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
    max_pending: usize,
}

impl<T> ReorderBuffer<T> {
    /// Creates an empty buffer expecting sequence number 0.
    pub fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
            max_pending: 0,
        }
    }

    /// Returns the next sequence number to be released.
    pub fn next_expected(&self) -> u64 {
        self.next
    }

    /// Returns the number of items held and not yet released.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the largest number of items ever held ahead of the cursor.
    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Adds an item.
    ///
    /// Fails with [`DigestError::DuplicateBlock`] if `sequence` was already
    /// released or is already held.
    pub fn push(&mut self, sequence: u64, item: T) -> Result<(), DigestError> {
        if sequence < self.next || self.pending.contains_key(&sequence) {
            return Err(DigestError::DuplicateBlock { sequence });
        }

        self.pending.insert(sequence, item);
        if sequence != self.next {
            self.max_pending = self.max_pending.max(self.pending.len());
        }
        Ok(())
    }

    /// Releases the item at the cursor, if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Releases every consecutive item starting at the cursor.
    pub fn drain_ready(&mut self) -> impl Iterator<Item = T> + '_ {
        iter::from_fn(move || self.pop_ready())
    }

    /// Ends the stream.
    ///
    /// Returns the number of items released, or
    /// [`DigestError::MissingBlock`] if an item is still held behind a gap.
    pub fn finish(self) -> Result<u64, DigestError> {
        if self.pending.is_empty() {
            Ok(self.next)
        } else {
            Err(DigestError::MissingBlock {
                sequence: self.next,
            })
        }
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters reported by the reorder stage.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReorderStats {
    pub(crate) released: u64,
    pub(crate) max_pending: usize,
}

/// Runs the reorder stage.
///
/// Every released result returns one credit to the chunker, which caps the
/// number of blocks in flight and therefore the pending map. After
/// cancellation the stage keeps draining `results` without releasing them
/// until every worker has hung up, so the sink is never closed under a live
/// worker.
pub(crate) fn run_reorder(
    results: Receiver<BlockDigest>,
    ordered: Sender<BlockDigest>,
    credits: Sender<()>,
    shutdown: &Shutdown,
) -> ReorderStats {
    let _guard = PanicGuard::new(shutdown, "reorder");
    let mut buffer = ReorderBuffer::new();

    'run: while !shutdown.is_cancelled() {
        let result = select! {
            recv(results) -> msg => match msg {
                Ok(result) => result,
                Err(_) => break,
            },
            recv(shutdown.signal()) -> _ => break,
        };

        if let Err(e) = buffer.push(result.sequence, result) {
            shutdown.fail(e);
            break;
        }

        for released in buffer.drain_ready() {
            select! {
                send(ordered, released) -> sent => if sent.is_err() { break 'run },
                recv(shutdown.signal()) -> _ => break 'run,
            }
            // Credits in circulation never exceed the channel capacity.
            let _ = credits.try_send(());
        }
    }

    let stats = ReorderStats {
        released: buffer.next_expected(),
        max_pending: buffer.max_pending(),
    };

    if shutdown.is_cancelled() {
        let discarded = results.iter().count();
        debug!(discarded, "reorder stage drained after cancellation");
    } else if let Err(e) = buffer.finish() {
        shutdown.fail(e);
    }

    stats
}
