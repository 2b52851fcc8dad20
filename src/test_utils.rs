//! Test utilities shared across unit tests, integration tests and benches
//!
//! This module provides scripted stand-ins for the external collaborators
//! (fetch capability, race source, rendering surface) plus fixture data, so
//! pipeline behavior can be tested deterministically without a network or a
//! display.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::consumer::{FrameDraw, Surface};
use crate::error::{Result, TickerError};
use crate::fetch::Fetcher;
use crate::source::RaceSource;
use crate::types::{RaceState, RunnerState, Source, StyleSnapshot};

/// CSV document matching the default template's end-to-end expectations.
pub const SAMPLE_CSV: &[u8] = b"1,10,2:15\n2,8,2:01\n";

/// CSV document with duplicate, out-of-order and malformed rows.
pub const MESSY_CSV: &[u8] = b"7,3,1:00\n7,5,1:10\n7,5,1:12\nbogus,1,1:00\n2,4,1:20,12.4km\n";

/// Build a race state from `(number, lap, lap_time)` rows, tagged live.
pub fn race_state(rows: &[(u32, u32, &str)]) -> RaceState {
    let runners = rows
        .iter()
        .map(|&(number, lap, lap_time)| RunnerState {
            number,
            lap,
            lap_time: lap_time.to_string(),
            distance: None,
        })
        .collect();
    RaceState::new(runners, Source::Live)
}

/// Scripted fetch capability.
///
/// Pops one scripted outcome per `fetch` call; an exhausted script raises a
/// fetch error so a test that over-runs its script fails loudly instead of
/// hanging.
pub struct StubFetcher {
    script: Mutex<VecDeque<Result<Vec<u8>>>>,
}

impl StubFetcher {
    pub fn new(script: Vec<Result<Vec<u8>>>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()) }
    }

    /// Outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TickerError::fetch_failed("stub", "script exhausted")))
    }
}

/// Scripted race source.
///
/// Yields one scripted outcome per `next_state` call after an optional delay;
/// an exhausted script ends the stream with `Ok(None)`.
pub struct ScriptedSource {
    script: VecDeque<Result<Option<Arc<RaceState>>>>,
    delay: Option<Duration>,
    cadence: Duration,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Option<Arc<RaceState>>>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            delay: None,
            cadence: Duration::from_secs(1),
        }
    }

    /// Script of successful states from `(number, lap, lap_time)` rows.
    pub fn states(states: Vec<Vec<(u32, u32, &str)>>) -> Self {
        Self::new(states.into_iter().map(|rows| Ok(Some(Self::state(rows)))).collect())
    }

    /// Like [`ScriptedSource::states`] but each item waits `delay` first.
    pub fn states_with_delay(states: Vec<Vec<(u32, u32, &str)>>, delay: Duration) -> Self {
        let mut source = Self::states(states);
        source.delay = Some(delay);
        source
    }

    /// One shared state from `(number, lap, lap_time)` rows.
    pub fn state(rows: Vec<(u32, u32, &str)>) -> Arc<RaceState> {
        Arc::new(race_state(&rows))
    }
}

#[async_trait]
impl RaceSource for ScriptedSource {
    async fn next_state(&mut self) -> Result<Option<Arc<RaceState>>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script.pop_front().unwrap_or(Ok(None))
    }

    fn cadence(&self) -> Duration {
        self.cadence
    }
}

/// One recorded `draw` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub text: String,
    pub offset_px: f64,
}

#[derive(Debug)]
struct SurfaceState {
    viewport_width: f64,
    /// Rendered width per character; measurement is `chars * char_width`.
    char_width: f64,
    frames: Vec<RecordedFrame>,
    waiting_frames: usize,
}

/// Recording rendering surface with adjustable geometry.
///
/// Clones share the same log, so a test keeps one handle while the consumer
/// owns another. Text measurement is a fixed width per character, which makes
/// traversal lengths exact under virtual time.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    inner: Arc<Mutex<SurfaceState>>,
}

impl RecordingSurface {
    pub fn new(viewport_width: f64, char_width: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SurfaceState {
                viewport_width,
                char_width,
                frames: Vec::new(),
                waiting_frames: 0,
            })),
        }
    }

    /// Simulate a host resize; the consumer picks it up on its next frame.
    pub fn set_viewport_width(&self, width: f64) {
        self.inner.lock().unwrap().viewport_width = width;
    }

    /// Change glyph width, altering subsequent measurements.
    pub fn set_char_width(&self, width: f64) {
        self.inner.lock().unwrap().char_width = width;
    }

    /// All recorded text frames in draw order.
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.inner.lock().unwrap().frames.clone()
    }

    /// Drawn texts with consecutive repeats collapsed.
    pub fn distinct_texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        for frame in self.inner.lock().unwrap().frames.iter() {
            if texts.last().map(String::as_str) != Some(frame.text.as_str()) {
                texts.push(frame.text.clone());
            }
        }
        texts
    }

    /// Number of waiting-indicator frames drawn.
    pub fn waiting_frames(&self) -> usize {
        self.inner.lock().unwrap().waiting_frames
    }
}

impl Surface for RecordingSurface {
    fn viewport_width(&self) -> f64 {
        self.inner.lock().unwrap().viewport_width
    }

    fn measure(&self, text: &str, _style: &StyleSnapshot) -> f64 {
        let state = self.inner.lock().unwrap();
        text.chars().count() as f64 * state.char_width
    }

    fn draw(&mut self, frame: &FrameDraw<'_>) {
        self.inner.lock().unwrap().frames.push(RecordedFrame {
            text: frame.text.to_string(),
            offset_px: frame.offset_px,
        });
    }

    fn draw_waiting(&mut self) {
        self.inner.lock().unwrap().waiting_frames += 1;
    }
}
