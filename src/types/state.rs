//! Canonical race state data model.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Origin of a canonical race state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Produced by the CSV ingest loop.
    Live,
    /// Produced by the simulated source.
    Simulated,
}

impl Source {
    /// Stable lowercase label used in status reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Live => "live",
            Source::Simulated => "simulated",
        }
    }
}

/// One validated runner row.
///
/// `lap_time` and `distance` are opaque display strings; they are carried
/// through to the ticker verbatim and never parsed as durations or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerState {
    /// Positive runner number, unique within a [`RaceState`].
    pub number: u32,
    /// Completed lap count.
    pub lap: u32,
    /// Formatted lap time as published by the timing source.
    pub lap_time: String,
    /// Optional formatted distance.
    pub distance: Option<String>,
}

/// Deduplicated, ordered, bounded snapshot of the race.
///
/// A state is recreated wholesale on every accepted ingest cycle; holding the
/// previous `Arc<RaceState>` is all that last-known-good retention requires.
/// The canonicalizer is the only producer and guarantees at most one
/// [`RunnerState`] per runner number and at most the configured runner bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceState {
    /// When this snapshot was constructed.
    pub updated_at: SystemTime,
    pub runners: Vec<RunnerState>,
    pub source: Source,
}

impl RaceState {
    /// Build a snapshot stamped with the current time.
    pub fn new(runners: Vec<RunnerState>, source: Source) -> Self {
        Self { updated_at: SystemTime::now(), runners, source }
    }

    pub fn runner_count(&self) -> usize {
        self.runners.len()
    }
}
