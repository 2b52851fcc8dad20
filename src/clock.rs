//! Pausable elapsed-time race clock.
//!
//! A small tagged state machine over `{stopped, running, paused}`. Commands
//! applied in a state that does not accept them are silent no-ops, which makes
//! the clock idempotent under repeated operator input. All mutations serialize
//! behind one mutex; `elapsed` is a pure read safe from any state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Externally visible clock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    Stopped,
    Running,
    Paused,
}

impl ClockMode {
    /// Stable lowercase label used in status reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockMode::Stopped => "stopped",
            ClockMode::Running => "running",
            ClockMode::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ClockState {
    Stopped,
    Running { started_at: Instant, accumulated: Duration },
    Paused { accumulated: Duration },
}

/// Cloneable handle to the shared race clock.
///
/// Clones observe and mutate the same underlying state, so the clock can be
/// handed to the driver, the scroll consumer and operator command dispatch at
/// the same time.
#[derive(Debug, Clone)]
pub struct RaceClock {
    inner: Arc<Mutex<ClockState>>,
}

impl Default for RaceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceClock {
    /// A fresh clock in the stopped state with zero elapsed time.
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(ClockState::Stopped)) }
    }

    // A poisoned lock only means another thread panicked mid-read; every
    // mutation here is a single assignment, so the state is still consistent.
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start or resume the clock. From `stopped` the count begins at zero;
    /// from `paused` the accumulated time is preserved. No-op while running.
    pub fn start(&self) {
        let mut state = self.lock();
        match *state {
            ClockState::Stopped => {
                *state = ClockState::Running {
                    started_at: Instant::now(),
                    accumulated: Duration::ZERO,
                };
                debug!(from = "stopped", "race clock started");
            }
            ClockState::Paused { accumulated } => {
                *state = ClockState::Running { started_at: Instant::now(), accumulated };
                debug!(from = "paused", accumulated_s = accumulated.as_secs_f64(), "race clock resumed");
            }
            ClockState::Running { .. } => trace!("start ignored, clock already running"),
        }
    }

    /// Pause a running clock, folding the running span into the accumulated
    /// total. No-op unless running.
    pub fn pause(&self) {
        let mut state = self.lock();
        match *state {
            ClockState::Running { started_at, accumulated } => {
                let total = accumulated + started_at.elapsed();
                *state = ClockState::Paused { accumulated: total };
                debug!(accumulated_s = total.as_secs_f64(), "race clock paused");
            }
            _ => trace!("pause ignored, clock not running"),
        }
    }

    /// Stop the clock and clear the accumulated time. Valid from any state.
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = ClockState::Stopped;
        debug!("race clock reset");
    }

    pub fn mode(&self) -> ClockMode {
        match *self.lock() {
            ClockState::Stopped => ClockMode::Stopped,
            ClockState::Running { .. } => ClockMode::Running,
            ClockState::Paused { .. } => ClockMode::Paused,
        }
    }

    /// Elapsed race time. Pure read; never mutates the state machine.
    pub fn elapsed(&self) -> Duration {
        match *self.lock() {
            ClockState::Stopped => Duration::ZERO,
            ClockState::Running { started_at, accumulated } => accumulated + started_at.elapsed(),
            ClockState::Paused { accumulated } => accumulated,
        }
    }

    /// Elapsed race time rendered for display, `H:MM:SS` or `M:SS`.
    pub fn elapsed_text(&self) -> String {
        format_elapsed(self.elapsed())
    }
}

/// Format a duration as `H:MM:SS` when at least an hour has elapsed, `M:SS`
/// otherwise, rounded to the nearest second.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64().round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
