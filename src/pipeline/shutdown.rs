//! Broadcast cancellation shared by every pipeline stage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::error::DigestError;

/// Cancellation handle cloned into every stage.
///
/// Blocking stages select on [`Shutdown::signal`] next to their data
/// channel. Nothing is ever sent on it; cancelling drops the only sender,
/// which disconnects every receiver at once and wakes all waiters together.
/// Between blocking calls stages poll [`Shutdown::is_cancelled`].
///
/// The first error reported through [`Shutdown::fail`] is kept for the
/// coordinator; later ones are logged and dropped.
#[derive(Clone)]
pub(crate) struct Shutdown {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    signal: Receiver<()>,
    trip: Mutex<Trip>,
}

struct Trip {
    trigger: Option<Sender<()>>,
    error: Option<DigestError>,
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                signal,
                trip: Mutex::new(Trip {
                    trigger: Some(trigger),
                    error: None,
                }),
            }),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Becomes ready (disconnected) once the pipeline is cancelled.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Records a fatal error and cancels the pipeline.
    pub(crate) fn fail(&self, error: DigestError) {
        let mut trip = self.lock();
        if trip.error.is_none() && !self.is_cancelled() {
            warn!(error = %error, "cancelling pipeline");
            trip.error = Some(error);
        } else {
            debug!(error = %error, "suppressing error after cancellation");
        }
        self.trip(&mut trip);
    }

    /// Cancels the pipeline without an error.
    #[cfg(test)]
    pub(crate) fn cancel(&self) {
        let mut trip = self.lock();
        self.trip(&mut trip);
    }

    /// Takes the first recorded error, if any.
    pub(crate) fn take_error(&self) -> Option<DigestError> {
        self.lock().error.take()
    }

    fn trip(&self, trip: &mut Trip) {
        // The flag must be visible before receivers wake up.
        self.inner.cancelled.store(true, Ordering::Release);
        trip.trigger.take();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Trip> {
        self.inner.trip.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reports a panic of the current stage thread as a pipeline failure.
///
/// Without it a panicking worker would lose its block and leave the other
/// stages waiting for a sequence number that never arrives.
pub(crate) struct PanicGuard<'a> {
    shutdown: &'a Shutdown,
    stage: &'static str,
}

impl<'a> PanicGuard<'a> {
    pub(crate) fn new(shutdown: &'a Shutdown, stage: &'static str) -> Self {
        Self { shutdown, stage }
    }
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shutdown
                .fail(DigestError::WorkerPanicked { stage: self.stage });
        }
    }
}
