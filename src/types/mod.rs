//! Core types for race ticker data representation.
//!
//! This module provides the foundational data structures flowing through the
//! ticker pipeline:
//! - [`RaceState`] / [`RunnerState`] form the canonical, deduplicated view of
//!   the race produced by ingest or simulation
//! - [`RenderPayload`] is the immutable renderable unit handed to display
//!   contexts, with [`StyleSnapshot`] and [`ScrollSnapshot`] frozen in at
//!   formatting time
//! - [`Source`] tags where a state came from
//!
//! ## Immutability discipline
//!
//! States and payloads are values, never patched in place. Every accepted
//! ingest cycle builds a fresh [`RaceState`]; every formatter invocation
//! builds a fresh [`RenderPayload`]. Consumers that keep a reference to an
//! old value keep a consistent one.
//!
//! ## Usage Example
//!
//! ```rust
//! use paddock::types::{RaceState, RunnerState, Source};
//!
//! let state = RaceState::new(
//!     vec![RunnerState {
//!         number: 7,
//!         lap: 5,
//!         lap_time: "1:12".to_string(),
//!         distance: None,
//!     }],
//!     Source::Live,
//! );
//! assert_eq!(state.runner_count(), 1);
//! ```

mod payload;
mod state;

pub use payload::{RenderPayload, ScrollSnapshot, StyleSnapshot};
pub use state::{RaceState, RunnerState, Source};
