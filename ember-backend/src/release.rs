use std::marker::PhantomData;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::external_image::ExternalImage;

/// Error returned when a handle is released into a queue whose owning side
/// has shut down.
///
/// The rejected handle is handed back so the caller decides where its
/// callback fires; the queue never drops it on the sending thread.
#[derive(Debug, Error)]
#[error("release queue is closed")]
pub struct QueueClosed(pub ExternalImage);

/// The designated execution context for release callbacks.
///
/// [`ExternalImage`] guarantees its producer that the release callback runs
/// on one specific engine thread. This queue is how the engine upholds that:
/// handles carrying a live obligation are never dropped in place off-thread;
/// they are pushed through a [`ReleaseSender`] and dropped here, on the
/// thread that calls [`drain`](Self::drain).
///
/// The queue is deliberately `!Send`: it stays on the thread that created it.
pub struct ReleaseQueue {
    tx: Sender<ExternalImage>,
    rx: Receiver<ExternalImage>,
    // Pins the queue, and with it the drain side, to its creating thread.
    _not_send: PhantomData<*const ()>,
}

static_assertions::assert_not_impl_any!(ReleaseQueue: Send, Sync);
static_assertions::assert_impl_all!(ReleaseSender: Send, Clone);

impl ReleaseQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            _not_send: PhantomData,
        }
    }

    /// Returns a sender that other threads use to route handles here.
    pub fn sender(&self) -> ReleaseSender {
        ReleaseSender {
            tx: self.tx.clone(),
        }
    }

    /// Drops every pending handle on the calling thread, firing its release
    /// callback. Returns the number of handles released.
    ///
    /// The engine calls this from its main loop on the designated thread.
    pub fn drain(&self) -> usize {
        let mut released = 0;
        while let Ok(handle) = self.rx.try_recv() {
            drop(handle);
            released += 1;
        }
        if released > 0 {
            log::trace!("released {released} external image(s)");
        }
        released
    }
}

impl Default for ReleaseQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReleaseQueue {
    fn drop(&mut self) {
        // Obligations already queued still fire exactly once, on the owning
        // thread. Senders outliving the queue get QueueClosed from then on.
        let released = self.drain();
        if released > 0 {
            log::debug!("release queue shut down, flushed {released} pending image(s)");
        }
    }
}

/// Cloneable, thread-safe handle for routing [`ExternalImage`]s to the
/// [`ReleaseQueue`] that created it.
#[derive(Clone)]
pub struct ReleaseSender {
    tx: Sender<ExternalImage>,
}

impl ReleaseSender {
    /// Enqueues a handle to be dropped on the queue's thread.
    ///
    /// This transfers the handle's obligation to the queue; nothing is
    /// invoked on the calling thread.
    pub fn release(&self, handle: ExternalImage) -> Result<(), QueueClosed> {
        self.tx.send(handle).map_err(|err| QueueClosed(err.0))
    }
}
