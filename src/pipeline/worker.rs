//! Digest workers.

use crossbeam_channel::{Receiver, Sender, select};
use tracing::trace;

use super::shutdown::{PanicGuard, Shutdown};
use crate::chunk::{BlockDigest, Chunk};
use crate::hash::BlockHasher;

/// Runs one worker until the intake closes or the pipeline is cancelled.
///
/// Returns the number of blocks this worker digested. Returning is the
/// worker's shutdown acknowledgement; the coordinator joins every worker
/// before it considers the pool drained.
pub(crate) fn run_worker<H: BlockHasher + ?Sized>(
    intake: Receiver<Chunk>,
    results: Sender<BlockDigest>,
    hasher: &H,
    shutdown: &Shutdown,
) -> u64 {
    let _guard = PanicGuard::new(shutdown, "digest");
    let mut digested = 0u64;

    while !shutdown.is_cancelled() {
        let chunk = select! {
            recv(intake) -> msg => match msg {
                Ok(chunk) => chunk,
                Err(_) => break,
            },
            recv(shutdown.signal()) -> _ => break,
        };

        let result = BlockDigest {
            sequence: chunk.sequence,
            digest: hasher.digest(&chunk.data),
        };
        trace!(sequence = chunk.sequence, len = chunk.len(), "digested block");

        select! {
            send(results, result) -> sent => if sent.is_err() { break },
            recv(shutdown.signal()) -> _ => break,
        }
        digested += 1;
    }

    digested
}
