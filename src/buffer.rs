//! Payload double buffering.
//!
//! [`PayloadBuffer`] owns the `active`/`pending` payload pair. Producers call
//! [`PayloadBuffer::submit`] after every formatter run; rendering contexts
//! read [`PayloadBuffer::active`] freely and call
//! [`PayloadBuffer::complete_cycle`] exactly when a full animation cycle of
//! the current text has finished. The active payload only ever changes inside
//! `complete_cycle` (or on the very first submission), so content can never
//! change mid-cycle and a reader can never observe a torn payload.
//!
//! The pair sits behind one mutex and every operation is a single short
//! critical section, safe for one producer and any number of concurrent
//! viewers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, trace};

use crate::types::RenderPayload;

#[derive(Debug, Default)]
struct BufferPair {
    active: Option<Arc<RenderPayload>>,
    pending: Option<Arc<RenderPayload>>,
}

/// Result of a cycle-boundary handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Whether a pending payload was promoted to active by this call.
    pub swapped: bool,
    /// Version of the active payload after the call. `None` only before any
    /// payload has arrived (version 0 is a real version).
    pub version: Option<u64>,
}

/// Cloneable handle to the shared double buffer.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuffer {
    inner: Arc<Mutex<BufferPair>>,
}

impl PayloadBuffer {
    /// An empty buffer: no active payload, no pending payload.
    pub fn new() -> Self {
        Self::default()
    }

    // Single-assignment critical sections keep the pair consistent even if a
    // holder panicked, so a poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, BufferPair> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stage a freshly formatted payload.
    ///
    /// While content is already showing the payload waits in `pending` until
    /// the next cycle boundary; repeated submissions within one cycle replace
    /// each other, latest wins. The very first payload is installed straight
    /// into `active` so the display never waits a full cycle for initial
    /// content.
    pub fn submit(&self, payload: RenderPayload) {
        let payload = Arc::new(payload);
        let mut pair = self.lock();
        if pair.active.is_none() {
            debug!(version = payload.version, "first payload installed as active");
            pair.active = Some(payload);
        } else {
            trace!(version = payload.version, "payload staged as pending");
            pair.pending = Some(payload);
        }
    }

    /// Current active payload, or `None` before first data. Never blocks on
    /// anything but the internal mutex and never mutates the pair.
    pub fn active(&self) -> Option<Arc<RenderPayload>> {
        self.lock().active.clone()
    }

    /// Cycle-boundary handshake, called by a renderer when the active text has
    /// fully traversed the display. Promotes `pending` to `active` if one is
    /// staged; otherwise leaves the pair untouched.
    pub fn complete_cycle(&self) -> CycleReport {
        let mut pair = self.lock();
        let swapped = match pair.pending.take() {
            Some(next) => {
                debug!(version = next.version, "pending payload promoted to active");
                pair.active = Some(next);
                true
            }
            None => {
                trace!("cycle complete with no pending payload");
                false
            }
        };
        CycleReport { swapped, version: pair.active.as_ref().map(|p| p.version) }
    }
}
