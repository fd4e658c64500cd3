//! The concurrent digest pipeline.
//!
//! ```text
//!            credits (window)
//!        ┌───────────────────────────────────────────┐
//!        ▼                                           │
//!  ┌──────────┐  intake  ┌────────────┐ results ┌────┴─────┐ ordered ┌──────┐
//!  │ chunker  ├─────────►│ worker × N ├────────►│ reorder  ├────────►│ sink │
//!  └──────────┘          └────────────┘         └──────────┘         └──────┘
//! ```
//!
//! The chunker runs on the calling thread; every other stage runs on its own
//! scoped thread. All channels are bounded by the reorder window, and the
//! chunker takes a credit before it reads each block, so memory stays
//! bounded for inputs of any length.

pub(crate) mod shutdown;
mod worker;

use std::fmt;
use std::io::{Read, Write};
use std::thread;

use crossbeam_channel::{Receiver, Sender, select};
use tracing::debug;

use self::shutdown::Shutdown;
use crate::chunk::{BlockDigest, Chunk};
use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::error::DigestError;
use crate::hash::{BlockHasher, Md5Hasher};
use crate::reorder::{self, ReorderStats};
use crate::sink::{self, SinkWriter};

/// Lifecycle of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Configured, not running.
    Idle,
    /// Stages started, chunker producing.
    Running,
    /// Input exhausted or a fatal error seen; waiting for stages to finish.
    Draining,
    /// Every stage has exited and the output is closed.
    Terminated,
}

impl PipelineState {
    /// Returns true if `next` may directly follow `self`.
    ///
    /// A terminated pipeline may be started again.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Draining) | (Draining, Terminated) | (Terminated, Running)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of blocks digested and written.
    pub blocks: u64,
    /// Number of input bytes consumed.
    pub bytes: u64,
    /// Most results ever held out of order by the reorder buffer.
    pub max_pending: usize,
}

/// Coordinates chunker, worker pool, reorder buffer and sink.
///
/// The output is bit-identical to
/// [`digest_sequential`](crate::digest_sequential) for every concurrency
/// level.
///
/// # Example
///
/// ```
/// use blocksum::{Pipeline, PipelineConfig, Md5Hasher};
/// use std::io::Cursor;
///
/// let config = PipelineConfig::new(4, 2)?;
/// let mut out = Vec::new();
/// let summary = Pipeline::new(config)?.run(Cursor::new(b"ABCDEFG"), &mut out)?;
///
/// assert_eq!(summary.blocks, 2);
/// assert_eq!(&out[..16], Md5Hasher::hash(b"ABCD").as_bytes());
/// assert_eq!(&out[16..], Md5Hasher::hash(b"EFG").as_bytes());
/// # Ok::<(), blocksum::DigestError>(())
/// ```
#[derive(Debug)]
pub struct Pipeline<H = Md5Hasher> {
    config: PipelineConfig,
    hasher: H,
    state: PipelineState,
}

impl Pipeline<Md5Hasher> {
    /// Creates an MD5 pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self, DigestError> {
        Self::with_hasher(config, Md5Hasher)
    }
}

impl<H: BlockHasher> Pipeline<H> {
    /// Creates a pipeline that digests blocks with `hasher`.
    pub fn with_hasher(config: PipelineConfig, hasher: H) -> Result<Self, DigestError> {
        config.validate()?;
        Ok(Self {
            config,
            hasher,
            state: PipelineState::Idle,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Digests every block of `reader` and writes the digests to `writer`.
    ///
    /// `reader` is consumed on the calling thread; `writer` moves to the
    /// sink thread and is flushed and dropped before this returns, on every
    /// path. On error, digests already written stay in the output, which
    /// must then be treated as incomplete.
    pub fn run<R, W>(&mut self, reader: R, writer: W) -> Result<RunSummary, DigestError>
    where
        R: Read,
        W: Write + Send,
    {
        let chunker = Chunker::new(self.config.block_size())?;
        let workers = self.config.concurrency();
        let window = self.config.window();
        let hasher = &self.hasher;
        let state = &mut self.state;
        let shutdown = Shutdown::new();

        debug!(
            block_size = chunker.block_size(),
            workers, window, "starting digest pipeline"
        );

        let (intake_tx, intake_rx) = crossbeam_channel::bounded::<Chunk>(window);
        let (results_tx, results_rx) = crossbeam_channel::bounded::<BlockDigest>(window);
        let (ordered_tx, ordered_rx) = crossbeam_channel::bounded::<BlockDigest>(window);
        let (credit_tx, credit_rx) = crossbeam_channel::bounded::<()>(window);
        for _ in 0..window {
            // Cannot fail: the channel holds exactly `window` credits.
            let _ = credit_tx.try_send(());
        }

        advance(state, PipelineState::Running);

        let (bytes, stats, written) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for index in 0..workers {
                let intake = intake_rx.clone();
                let results = results_tx.clone();
                let shutdown = &shutdown;
                let spawned = thread::Builder::new()
                    .name(format!("blocksum-digest-{index}"))
                    .spawn_scoped(scope, move || {
                        worker::run_worker(intake, results, hasher, shutdown)
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        shutdown.fail(DigestError::Spawn {
                            stage: "digest",
                            source,
                        });
                        break;
                    }
                }
            }
            drop(intake_rx);
            drop(results_tx);

            let reorder_handle = thread::Builder::new()
                .name("blocksum-reorder".to_string())
                .spawn_scoped(scope, {
                    let shutdown = &shutdown;
                    move || reorder::run_reorder(results_rx, ordered_tx, credit_tx, shutdown)
                })
                .map_err(|source| {
                    shutdown.fail(DigestError::Spawn {
                        stage: "reorder",
                        source,
                    })
                })
                .ok();

            let sink_handle = thread::Builder::new()
                .name("blocksum-sink".to_string())
                .spawn_scoped(scope, {
                    let shutdown = &shutdown;
                    let sink = SinkWriter::new(writer);
                    move || sink::run_sink(ordered_rx, sink, shutdown)
                })
                .map_err(|source| {
                    shutdown.fail(DigestError::Spawn {
                        stage: "sink",
                        source,
                    })
                })
                .ok();

            let bytes = produce(chunker, reader, intake_tx, credit_rx, &shutdown);
            advance(state, PipelineState::Draining);

            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(digested) => debug!(worker = index, digested, "digest worker exited"),
                    Err(_) => shutdown.fail(DigestError::WorkerPanicked { stage: "digest" }),
                }
            }
            debug!("worker pool drained");

            let stats = match reorder_handle.map(|h| h.join()) {
                Some(Ok(stats)) => stats,
                Some(Err(_)) => {
                    shutdown.fail(DigestError::WorkerPanicked { stage: "reorder" });
                    ReorderStats::default()
                }
                None => ReorderStats::default(),
            };

            let written = match sink_handle.map(|h| h.join()) {
                Some(Ok(written)) => written,
                Some(Err(_)) => {
                    shutdown.fail(DigestError::WorkerPanicked { stage: "sink" });
                    0
                }
                None => 0,
            };

            (bytes, stats, written)
        });

        advance(state, PipelineState::Terminated);

        if let Some(err) = shutdown.take_error() {
            return Err(err);
        }

        debug_assert_eq!(stats.released, written);
        let summary = RunSummary {
            blocks: written,
            bytes,
            max_pending: stats.max_pending,
        };
        debug!(
            blocks = summary.blocks,
            bytes = summary.bytes,
            max_pending = summary.max_pending,
            "digest pipeline finished"
        );
        Ok(summary)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid pipeline transition {state} -> {next}"
    );
    debug!(from = %state, to = %next, "pipeline state");
    *state = next;
}

/// Feeds blocks into the intake until the input ends or the pipeline is
/// cancelled. Returns the number of bytes read.
///
/// Dropping `intake` on return closes it, which lets idle workers exit once
/// the queue is empty.
fn produce<R: Read>(
    chunker: Chunker,
    reader: R,
    intake: Sender<Chunk>,
    credits: Receiver<()>,
    shutdown: &Shutdown,
) -> u64 {
    let mut blocks = chunker.chunk(reader);

    loop {
        // Taken before reading so at most `window` blocks are alive.
        select! {
            recv(credits) -> credit => if credit.is_err() { break },
            recv(shutdown.signal()) -> _ => break,
        }
        if shutdown.is_cancelled() {
            break;
        }

        let chunk = match blocks.next() {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                shutdown.fail(e);
                break;
            }
            None => break,
        };

        select! {
            send(intake, chunk) -> sent => if sent.is_err() { break },
            recv(shutdown.signal()) -> _ => break,
        }
    }

    debug!(
        blocks = blocks.sequence(),
        bytes = blocks.bytes_read(),
        cancelled = shutdown.is_cancelled(),
        "chunker finished"
    );
    blocks.bytes_read()
}
