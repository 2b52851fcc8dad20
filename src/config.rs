//! Ticker configuration: ingest, display, style, scroll and simulation settings.
//!
//! The configuration tree deserializes from YAML with `serde_yaml_ng` and every
//! field carries a default, so a partial document (or an empty one) yields a
//! usable config. [`TickerConfig::validate`] enforces the value ranges; loading
//! through [`TickerConfig::from_yaml_str`] validates automatically.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TickerError};

/// Top-level ticker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    pub ingest: IngestConfig,
    pub display: DisplayConfig,
    pub style: StyleConfig,
    pub scroll: ScrollConfig,
    pub race_time: RaceTimeConfig,
    pub simulation: SimulationConfig,
}

/// Polling parameters for the live CSV source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Identity of the active race profile, surfaced in status reports.
    pub profile: String,
    /// URL of the timing CSV document.
    pub url: String,
    /// Seconds between fetch attempts.
    pub poll_interval_s: f64,
    /// Fetch deadline in seconds.
    pub timeout_s: f64,
}

/// How runners are ordered in the canonical state and the ticker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerOrder {
    /// Ascending runner number.
    #[serde(rename = "runner")]
    ByNumber,
    /// Order of first appearance in the source document.
    #[serde(rename = "csv_order")]
    SourceOrder,
}

/// Canonicalization and text formatting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Upper bound on runners kept in the canonical state.
    pub max_runners: usize,
    pub order: RunnerOrder,
    /// Per-runner segment template. Recognized tokens: `{runner}`,
    /// `{runner:02d}`, `{lap}`, `{lap_time}`, `{distance}`.
    pub template: String,
    /// Joins per-runner segments.
    pub separator: String,
}

/// Visual style captured into each payload's style snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub background_color: String,
    pub font_family: String,
    pub font_size_px: u32,
    pub letter_spacing_px: u32,
    pub text_color: String,
    pub y_px: u32,
}

/// Scroll pacing captured into each payload's scroll snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Leftward scroll speed in pixels per second.
    pub speed_px_s: f64,
    /// Target redraw frequency for the consumer loop.
    pub fps: u32,
}

/// Periodic race-time interleaving performed by the scroll consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceTimeConfig {
    pub enabled: bool,
    /// A race-time cycle is shown after this many ordinary cycles.
    pub insert_every_cycles: u32,
}

/// Simulated producer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated runners (stable numbers `1..=runner_count`).
    pub runner_count: usize,
    /// Seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Per-runner probability of completing a lap on each tick.
    pub lap_chance: f64,
    /// Center of the generated lap-time distribution, in seconds.
    pub base_lap_time_s: f64,
    /// Maximum deviation from the base lap time, in seconds.
    pub jitter_s: f64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            display: DisplayConfig::default(),
            style: StyleConfig::default(),
            scroll: ScrollConfig::default(),
            race_time: RaceTimeConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            url: String::new(),
            poll_interval_s: 10.0,
            timeout_s: 5.0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_runners: 10,
            order: RunnerOrder::ByNumber,
            template: "NR.{runner:02d} LAP {lap} TIME {lap_time}".to_string(),
            separator: " // ".to_string(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background_color: "#000000".to_string(),
            font_family: "monospace".to_string(),
            font_size_px: 64,
            letter_spacing_px: 1,
            text_color: "#ff9900".to_string(),
            y_px: 120,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self { speed_px_s: 180.0, fps: 30 }
    }
}

impl Default for RaceTimeConfig {
    fn default() -> Self {
        Self { enabled: true, insert_every_cycles: 3 }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            runner_count: 10,
            seed: None,
            lap_chance: 0.2,
            base_lap_time_s: 95.0,
            jitter_s: 12.0,
        }
    }
}

impl TickerConfig {
    /// Parse a YAML document and validate the result.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: TickerConfig = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges. Field paths in error messages follow the YAML
    /// layout.
    pub fn validate(&self) -> Result<()> {
        if !(self.ingest.poll_interval_s > 0.0) {
            return Err(TickerError::config_error("ingest.poll_interval_s must be positive"));
        }
        if !(self.ingest.timeout_s > 0.0) {
            return Err(TickerError::config_error("ingest.timeout_s must be positive"));
        }
        if self.display.max_runners < 1 {
            return Err(TickerError::config_error("display.max_runners must be at least 1"));
        }
        if self.style.font_size_px < 1 {
            return Err(TickerError::config_error("style.font_size_px must be at least 1"));
        }
        if !(self.scroll.speed_px_s > 0.0) {
            return Err(TickerError::config_error("scroll.speed_px_s must be positive"));
        }
        if self.scroll.fps < 1 {
            return Err(TickerError::config_error("scroll.fps must be at least 1"));
        }
        if self.race_time.insert_every_cycles < 1 {
            return Err(TickerError::config_error("race_time.insert_every_cycles must be at least 1"));
        }
        if self.simulation.runner_count < 1 {
            return Err(TickerError::config_error("simulation.runner_count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.simulation.lap_chance) {
            return Err(TickerError::config_error("simulation.lap_chance must be within 0..=1"));
        }
        Ok(())
    }
}

impl IngestConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_s)
    }

    /// Fetch deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_s)
    }
}
