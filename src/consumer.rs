//! Frame-driven scroll rendering loop.
//!
//! [`ScrollConsumer`] drives one rendering surface: every frame it advances a
//! horizontal offset at the active payload's scroll speed, redraws, and when
//! the text has fully exited the visible region it performs the cycle-boundary
//! handshake with the payload controller. Payload content therefore only ever
//! changes between traversals, never mid-scroll.
//!
//! The loop is paced by an external frame-pulse stream (the host's redraw
//! callback) gated down to the configured target frequency, so offsets advance
//! by wall-clock time rather than by frame count.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::Result;
use crate::buffer::{CycleReport, PayloadBuffer};
use crate::clock::RaceClock;
use crate::config::{RaceTimeConfig, TickerConfig};
use crate::format::race_time_line;
use crate::stream::{GateExt, fps_interval};
use crate::types::{RenderPayload, StyleSnapshot};

/// Rate of the built-in frame-pulse source used by [`ScrollConsumer::run`].
const DEFAULT_PULSE_HZ: u32 = 60;

/// Delay before retrying after a failed payload fetch.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Rendering-side view of the payload controller.
///
/// [`PayloadBuffer`] implements this directly for in-process rendering; remote
/// viewers implement it over their transport, which is where the fallible
/// signatures come from.
#[async_trait]
pub trait PayloadPort: Send + Sync + 'static {
    /// Current active payload, or `None` before first data.
    async fn fetch_active(&self) -> Result<Option<Arc<RenderPayload>>>;

    /// Cycle-boundary handshake; may promote a pending payload.
    async fn complete_cycle(&self) -> Result<CycleReport>;
}

#[async_trait]
impl PayloadPort for PayloadBuffer {
    async fn fetch_active(&self) -> Result<Option<Arc<RenderPayload>>> {
        Ok(self.active())
    }

    async fn complete_cycle(&self) -> Result<CycleReport> {
        Ok(PayloadBuffer::complete_cycle(self))
    }
}

/// One frame of scrolled text.
pub struct FrameDraw<'a> {
    pub text: &'a str,
    /// X position of the text's left edge, in pixels from the left edge of
    /// the visible region.
    pub offset_px: f64,
    pub style: &'a StyleSnapshot,
}

/// Rendering surface driven by the consumer.
///
/// `viewport_width` and `measure` may change between frames (host resize);
/// the consumer re-reads them every frame and applies the resize rules.
pub trait Surface: Send + 'static {
    /// Current width of the visible region in pixels.
    fn viewport_width(&self) -> f64;

    /// Rendered width of `text` in pixels under `style`.
    fn measure(&self, text: &str, style: &StyleSnapshot) -> f64;

    /// Draw one frame of scrolled text.
    fn draw(&mut self, frame: &FrameDraw<'_>);

    /// Draw the neutral indicator shown before data arrives or while payload
    /// retrieval is failing.
    fn draw_waiting(&mut self);
}

/// Scrolling animation loop over one surface.
pub struct ScrollConsumer<P, S> {
    port: P,
    surface: S,
    clock: RaceClock,
    race_time: RaceTimeConfig,
    fps: u32,

    payload: Option<Arc<RenderPayload>>,
    /// Text currently traversing the display. Tracks the active payload
    /// except during a race-time substitution cycle.
    text: String,
    text_width: f64,
    offset: f64,
    viewport: f64,
    last_pulse: Option<Instant>,

    /// Completed cycles without a swap since the last overlay or swap.
    plain_cycles: u32,
    /// Current traversal is a race-time substitution.
    overlay: bool,
    needs_fetch: bool,
    retry_at: Option<Instant>,
}

impl<P: PayloadPort, S: Surface> ScrollConsumer<P, S> {
    pub fn new(config: &TickerConfig, port: P, surface: S, clock: RaceClock) -> Self {
        Self {
            port,
            surface,
            clock,
            race_time: config.race_time,
            fps: config.scroll.fps,
            payload: None,
            text: String::new(),
            text_width: 0.0,
            offset: 0.0,
            viewport: 0.0,
            last_pulse: None,
            plain_cycles: 0,
            overlay: false,
            needs_fetch: true,
            retry_at: None,
        }
    }

    /// Run the loop on the built-in frame-pulse source until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        let pulses = IntervalStream::new(tokio::time::interval(fps_interval(DEFAULT_PULSE_HZ)));
        self.run_with(pulses, cancel).await;
    }

    /// Run the loop on an external frame-pulse source until cancelled or the
    /// source ends.
    ///
    /// Pulses are gated down to the target redraw frequency; the underlying
    /// pulse rate never changes the scroll speed because offsets advance by
    /// the time between drawn frames.
    pub async fn run_with<F>(mut self, frames: F, cancel: CancellationToken)
    where
        F: Stream<Item = Instant>,
    {
        debug!(fps = self.fps, "scroll consumer started");
        let mut frames = pin!(frames.gate(fps_interval(self.fps)));

        loop {
            let pulse = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("scroll consumer cancelled");
                    break;
                }
                pulse = frames.next() => match pulse {
                    Some(pulse) => pulse,
                    None => {
                        debug!("frame source ended");
                        break;
                    }
                },
            };

            if let Some(fps) = self.frame(pulse).await {
                debug!(fps, "redraw rate retargeted");
                frames.as_mut().set_interval(fps_interval(fps));
            }
        }

        debug!("scroll consumer stopped");
    }

    /// Process one drawn frame. Returns a new target frequency when the
    /// installed payload asks for one.
    async fn frame(&mut self, now: Instant) -> Option<u32> {
        let dt = match self.last_pulse.replace(now) {
            Some(prev) => (now - prev).as_secs_f64(),
            None => 0.0,
        };

        let mut retune = None;
        let had_payload = self.payload.is_some();
        if self.needs_fetch && self.retry_at.is_none_or(|at| now >= at) {
            self.retry_at = None;
            retune = self.try_fetch(now).await;
        }

        let Some(payload) = self.payload.clone() else {
            self.surface.draw_waiting();
            return retune;
        };

        // A payload installed this frame starts exactly at the right edge;
        // motion begins on the next frame.
        if had_payload {
            self.offset -= payload.scroll.speed_px_s * dt;
            self.apply_resize();

            if self.offset + self.text_width < 0.0 {
                retune = self.cycle_boundary(now).await.or(retune);
            }
        }

        if let Some(payload) = self.payload.clone() {
            self.surface.draw(&FrameDraw {
                text: &self.text,
                offset_px: self.offset,
                style: &payload.style,
            });
        }
        retune
    }

    /// Fetch and install the active payload. On failure the waiting backoff
    /// is armed and `needs_fetch` stays set.
    async fn try_fetch(&mut self, now: Instant) -> Option<u32> {
        match self.port.fetch_active().await {
            Ok(Some(payload)) => {
                self.needs_fetch = false;
                let retune =
                    (payload.scroll.fps != self.fps).then_some(payload.scroll.fps);
                if let Some(fps) = retune {
                    self.fps = fps;
                }
                self.install(payload);
                retune
            }
            Ok(None) => {
                trace!("no payload available yet");
                None
            }
            Err(e) => {
                warn!(error = %e, "payload fetch failed");
                self.retry_at = Some(now + RETRY_BACKOFF);
                None
            }
        }
    }

    /// Start showing `payload` from the right edge of the visible region.
    fn install(&mut self, payload: Arc<RenderPayload>) {
        trace!(version = payload.version, "payload installed");
        self.viewport = self.surface.viewport_width();
        self.text = payload.ticker_text.clone();
        self.text_width = self.surface.measure(&self.text, &payload.style);
        self.offset = self.viewport;
        self.overlay = false;
        self.payload = Some(payload);
    }

    /// Re-read the viewport and re-measure on change.
    ///
    /// Position is kept across a resize unless the new measurement leaves the
    /// text fully off screen, which would blank the display until the next
    /// boundary; in that case the text restarts from the right edge without a
    /// cycle handshake.
    fn apply_resize(&mut self) {
        let width = self.surface.viewport_width();
        if width == self.viewport {
            return;
        }
        debug!(from = self.viewport, to = width, "viewport resized");
        self.viewport = width;
        if let Some(payload) = &self.payload {
            self.text_width = self.surface.measure(&self.text, &payload.style);
        }
        if self.offset + self.text_width < 0.0 {
            self.offset = self.viewport;
        }
    }

    /// Handle the end of one full traversal.
    async fn cycle_boundary(&mut self, now: Instant) -> Option<u32> {
        let was_overlay = self.overlay;
        self.overlay = false;

        let report = match self.port.complete_cycle().await {
            Ok(report) => report,
            Err(e) => {
                // Content keeps looping; the handshake is retried at the next
                // boundary.
                warn!(error = %e, "cycle handshake failed");
                self.offset = self.viewport;
                return None;
            }
        };
        trace!(
            swapped = report.swapped,
            version = ?report.version,
            overlay = was_overlay,
            "animation cycle complete"
        );

        if report.swapped {
            self.plain_cycles = 0;
            self.needs_fetch = true;
            let retune = self.try_fetch(now).await;
            if self.needs_fetch {
                // Fetch failed right after a swap; loop the previous content
                // while the backoff runs.
                self.resume_payload_text();
            }
            return retune;
        }

        if was_overlay {
            self.plain_cycles = 0;
            self.resume_payload_text();
            return None;
        }

        self.plain_cycles = self.plain_cycles.saturating_add(1);
        if self.race_time.enabled && self.plain_cycles >= self.race_time.insert_every_cycles {
            debug!(cycles = self.plain_cycles, "substituting race-time cycle");
            self.begin_overlay();
        } else {
            self.offset = self.viewport;
        }
        None
    }

    /// Show the race-time line for exactly one traversal. The buffer pair is
    /// untouched: no submit, no version change.
    fn begin_overlay(&mut self) {
        self.overlay = true;
        self.text = race_time_line(&self.clock.elapsed_text());
        if let Some(payload) = &self.payload {
            self.text_width = self.surface.measure(&self.text, &payload.style);
        }
        self.offset = self.viewport;
    }

    /// Put the active payload's text back on the display from the right edge.
    fn resume_payload_text(&mut self) {
        if let Some(payload) = &self.payload {
            self.text = payload.ticker_text.clone();
            self.text_width = self.surface.measure(&self.text, &payload.style);
        }
        self.offset = self.viewport;
    }
}
