use std::sync::mpsc;
use std::thread;

use opencl3::event::Event as ClEvent;

use crate::{OclError, Result};

/// Completion token for an enqueued operation.
///
/// Returned by [`Dispatch::enqueue`] so later dispatches can wait on it
/// through an event wait-list. Waiting to completion and then releasing
/// is the normal life cycle; the token is freed on release (or drop).
///
/// [`Dispatch::enqueue`]: crate::Dispatch::enqueue
#[derive(Debug)]
pub struct Event {
    inner: ClEvent,
}

// SAFETY: OpenCL event handles may be waited on and released from any
// thread; the driver synchronizes access to the event object.
unsafe impl Send for Event {}

impl Event {
    pub(crate) fn new(inner: ClEvent) -> Self {
        Self { inner }
    }

    pub(crate) fn cl(&self) -> &ClEvent {
        &self.inner
    }

    /// Blocks the calling thread until the operation finishes.
    pub fn wait(&self) -> Result<()> {
        self.inner
            .wait()
            .map_err(|e| OclError::status(e, "waiting on event"))
    }

    /// Releases the completion token.
    ///
    /// Must not race a concurrent `wait` on the same token; coordinate
    /// externally before releasing a shared event.
    pub fn release(self) {}
}

/// Single-resolution completion handle for a non-blocking operation.
///
/// A background waiter blocks on the device event and forwards the
/// terminal status exactly once; `wait` consumes the handle, so a
/// completed handle cannot be reused. Operations that fail validation
/// before reaching the device return an already-resolved handle.
///
/// There is no cancellation: once enqueued, an operation runs to
/// completion or failure. Callers needing bounded latency must layer
/// their own timeout around `wait`.
pub struct Pending {
    rx: mpsc::Receiver<Result<()>>,
}

impl Pending {
    /// A handle that is already resolved; no device call was issued.
    pub(crate) fn ready(result: Result<()>) -> Self {
        let (tx, rx) = mpsc::channel();
        // The receiver is live, so this send cannot fail.
        let _ = tx.send(result);
        Self { rx }
    }

    /// Resolves the handle from a background waiter on `event`.
    ///
    /// `keep_alive` is dropped only after the device signals completion;
    /// transfers pass the host payload here so the memory the device
    /// reads from stays valid for the whole operation.
    pub(crate) fn watch<T: Send + 'static>(event: Event, keep_alive: T) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = event.wait();
            drop(keep_alive);
            let _ = tx.send(result);
        });
        Self { rx }
    }

    /// Blocks until the operation finishes and returns its terminal
    /// status.
    pub fn wait(self) -> Result<()> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(OclError::CompletionLost),
        }
    }
}
