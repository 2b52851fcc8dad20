//! Ingest health tracking and status snapshots.
//!
//! Producers write fetch/parse outcomes into a shared [`StatusCell`]; status
//! consumers pull a consistent [`StatusReport`] snapshot whenever asked. The
//! cell also retains the last-known-good [`RaceState`], which stays
//! authoritative while later fetch or parse attempts fail.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::clock::{ClockMode, RaceClock};
use crate::error::TickerError;
use crate::types::{RaceState, Source};

/// Upper bound on runners included in a status preview.
const PREVIEW_RUNNERS: usize = 5;

fn to_unix(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn now_unix() -> u64 {
    to_unix(SystemTime::now())
}

#[derive(Debug, Default)]
struct IngestStatus {
    last_fetch_unix: Option<u64>,
    last_parse_unix: Option<u64>,
    last_hash: Option<String>,
    hash_changed: bool,
    last_error: Option<String>,
    state: Option<Arc<RaceState>>,
}

/// Cloneable handle to shared ingest status.
#[derive(Debug, Clone, Default)]
pub struct StatusCell {
    inner: Arc<Mutex<IngestStatus>>,
}

/// Point-in-time health snapshot, shaped for a status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Identity of the active race profile.
    pub profile: String,
    /// Configured producer mode.
    pub source: Source,
    /// Unix seconds of the most recent fetch attempt that reached the wire.
    pub last_fetch_unix: Option<u64>,
    /// Unix seconds of the most recent successful parse.
    pub last_parse_unix: Option<u64>,
    /// Content hash recorded by the most recent successful fetch.
    pub last_hash: Option<String>,
    /// Whether that fetch carried different bytes than the one before it.
    pub hash_changed: bool,
    pub last_error: Option<String>,
    /// True when a state is being served although the latest attempt failed.
    pub using_last_known_good: bool,
    pub runner_count: usize,
    /// Unix seconds the served state was constructed at.
    pub state_updated_unix: Option<u64>,
    pub runners_preview: Vec<RunnerPreview>,
    pub clock: ClockReport,
}

/// Bounded per-runner excerpt of the served state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerPreview {
    pub number: u32,
    pub lap: u32,
    pub lap_time: String,
}

/// Clock block embedded in every status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockReport {
    pub mode: ClockMode,
    pub elapsed_seconds: f64,
    pub elapsed_display: String,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write below is a handful of field assignments; recover a poisoned
    // lock instead of propagating the panic into status reporting.
    fn lock(&self) -> MutexGuard<'_, IngestStatus> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a fetch that returned bytes. `changed` is whether the content
    /// hash differs from the previous fetch.
    pub fn record_fetch(&self, hash: &str, changed: bool) {
        let mut status = self.lock();
        status.last_fetch_unix = Some(now_unix());
        status.last_hash = Some(hash.to_string());
        status.hash_changed = changed;
    }

    /// Record a failed fetch attempt. The last hash is left as-is.
    pub fn record_fetch_error(&self, error: &TickerError) {
        let mut status = self.lock();
        status.last_fetch_unix = Some(now_unix());
        status.last_error = Some(error.to_string());
    }

    /// Record a document that fetched fine but failed canonicalization.
    pub fn record_parse_error(&self, error: &TickerError) {
        self.lock().last_error = Some(error.to_string());
    }

    /// Install a freshly canonicalized state and clear the error flag.
    pub fn record_state(&self, state: Arc<RaceState>) {
        let mut status = self.lock();
        status.last_parse_unix = Some(now_unix());
        status.last_error = None;
        status.state = Some(state);
    }

    /// The last-known-good state, if any has ever been produced.
    pub fn state(&self) -> Option<Arc<RaceState>> {
        self.lock().state.clone()
    }

    /// Take a consistent snapshot. `profile` and `source` describe the
    /// configured producer; the clock block is read at snapshot time.
    pub fn report(&self, profile: &str, source: Source, clock: &RaceClock) -> StatusReport {
        let status = self.lock();
        let state = status.state.as_deref();
        let elapsed = clock.elapsed().as_secs_f64();
        StatusReport {
            profile: profile.to_string(),
            source,
            last_fetch_unix: status.last_fetch_unix,
            last_parse_unix: status.last_parse_unix,
            last_hash: status.last_hash.clone(),
            hash_changed: status.hash_changed,
            last_error: status.last_error.clone(),
            using_last_known_good: status.last_error.is_some() && state.is_some(),
            runner_count: state.map_or(0, |s| s.runner_count()),
            state_updated_unix: state.map(|s| to_unix(s.updated_at)),
            runners_preview: state
                .map(|s| {
                    s.runners
                        .iter()
                        .take(PREVIEW_RUNNERS)
                        .map(|r| RunnerPreview {
                            number: r.number,
                            lap: r.lap,
                            lap_time: r.lap_time.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            clock: ClockReport {
                mode: clock.mode(),
                elapsed_seconds: (elapsed * 100.0).round() / 100.0,
                elapsed_display: clock.elapsed_text(),
            },
        }
    }
}
