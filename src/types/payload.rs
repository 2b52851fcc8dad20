//! Render payload wire contract.

use serde::{Deserialize, Serialize};

use crate::config::{ScrollConfig, StyleConfig};

/// Style values captured at formatting time.
///
/// Snapshotted into every payload so style edits never mutate content already
/// on screen; the change rides the next payload through the swap protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSnapshot {
    pub background_color: String,
    pub font_family: String,
    pub font_size_px: u32,
    pub letter_spacing_px: u32,
    pub text_color: String,
    pub y_px: u32,
}

impl From<&StyleConfig> for StyleSnapshot {
    fn from(config: &StyleConfig) -> Self {
        Self {
            background_color: config.background_color.clone(),
            font_family: config.font_family.clone(),
            font_size_px: config.font_size_px,
            letter_spacing_px: config.letter_spacing_px,
            text_color: config.text_color.clone(),
            y_px: config.y_px,
        }
    }
}

/// Scroll pacing captured at formatting time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollSnapshot {
    pub speed_px_s: f64,
    pub fps: u32,
}

impl From<ScrollConfig> for ScrollSnapshot {
    fn from(config: ScrollConfig) -> Self {
        Self { speed_px_s: config.speed_px_s, fps: config.fps }
    }
}

/// The immutable renderable unit handed to rendering contexts.
///
/// This is a wire contract: renderers poll the active payload and diff on
/// `version`, so the field set must stay stable. A payload is always a fresh
/// value; nothing in the pipeline patches one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    /// Strictly increasing, assigned by the formatter. The first payload is
    /// version 0.
    pub version: u64,
    /// The full scrolling line.
    pub ticker_text: String,
    pub style: StyleSnapshot,
    pub scroll: ScrollSnapshot,
}
