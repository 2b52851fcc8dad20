//! Source trait for race state producers

use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::types::RaceState;

/// Trait for race state producers
///
/// Sources abstract over where canonical states come from (live CSV ingest,
/// simulation) and handle their own pacing internally. The driver just pulls
/// the next state in a loop; a source returns when it has something new to
/// say or an error to report. States come out shared since the driver fans
/// each one out to the watch channel and the status cell.
#[async_trait::async_trait]
pub trait RaceSource: Send + 'static {
    /// Get the next canonical race state
    ///
    /// Returns:
    /// - `Ok(Some(state))` - New canonical state available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - This cycle failed; any previously returned state stays
    ///   authoritative
    ///
    /// Each source handles timing internally:
    /// - Live: Waits out the poll interval, skips unchanged documents
    /// - Simulated: Advances its runners once per poll interval
    ///
    /// A cycle that fetched successfully but found unchanged content is not
    /// an event; implementations wait for the next cycle instead of returning.
    async fn next_state(&mut self) -> Result<Option<Arc<RaceState>>>;

    /// The interval between production cycles
    fn cadence(&self) -> Duration;
}
