//! Scrolling race-ticker pipeline with tear-free display updates.
//!
//! We Race Paddock turns a polled CSV timing feed (or a built-in simulation)
//! into versioned, immutable render payloads that a scrolling display consumes
//! without ever changing content mid-scroll.
//!
//! # Features
//!
//! - **Live ingest**: polled CSV fetching with content-hash change detection
//!   and last-known-good retention
//! - **Simulation**: a drop-in producer for operation without a timing feed
//! - **Tear-free display**: double-buffered payloads that swap only at
//!   animation-cycle boundaries
//! - **Race clock**: pausable elapsed time, interleaved into the ticker
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use paddock::{Paddock, TickerConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> paddock::Result<()> {
//!     let mut config = TickerConfig::default();
//!     config.ingest.url = "https://timing.example/live.csv".to_string();
//!
//!     let board = Paddock::live(config).await?;
//!     board.clock().start();
//!
//!     let mut states = Box::pin(board.state_updates());
//!     while let Some(state) = states.next().await {
//!         println!("{} runners at {:?}", state.runner_count(), state.updated_at);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod canon;
mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Pipeline architecture
pub mod board;
pub mod buffer;
pub mod clock;
pub mod consumer;
pub mod driver;
pub mod format;
pub mod source;
pub mod status;
pub mod stream;

// Data source modules
pub mod fetch;
pub mod sources;

// Core exports
pub use canon::{Canonicalized, canonicalize};
pub use config::*;
pub use error::*;
pub use types::*;

// Pipeline exports
pub use board::Board;
pub use buffer::{CycleReport, PayloadBuffer};
pub use clock::{ClockMode, RaceClock, format_elapsed};
pub use consumer::{FrameDraw, PayloadPort, ScrollConsumer, Surface};
pub use format::MessageFormatter;
pub use source::RaceSource;
pub use status::{StatusCell, StatusReport};

// Data source exports
pub use fetch::{Fetcher, HttpFetcher};
pub use sources::{CsvIngestor, SimulatedSource};

/// Unified entry point for Paddock ticker pipelines.
///
/// This factory provides a consistent API for starting a pipeline over the
/// live CSV source or the built-in simulation; both return the same [`Board`]
/// handle.
///
/// # Examples
///
/// ## Live timing feed
/// ```rust,no_run
/// use paddock::{Paddock, TickerConfig};
///
/// #[tokio::main]
/// async fn main() -> paddock::Result<()> {
///     let mut config = TickerConfig::default();
///     config.ingest.url = "https://timing.example/live.csv".to_string();
///     let board = Paddock::live(config).await?;
///     // Use board...
///     Ok(())
/// }
/// ```
///
/// ## Simulation (no network)
/// ```rust,no_run
/// use paddock::{Paddock, TickerConfig};
///
/// #[tokio::main]
/// async fn main() -> paddock::Result<()> {
///     let board = Paddock::simulate(TickerConfig::default()).await?;
///     // Use board...
///     Ok(())
/// }
/// ```
pub struct Paddock;

impl Paddock {
    /// Start a pipeline polling the configured CSV timing feed.
    ///
    /// Validates the configuration, builds the HTTP fetch capability and
    /// waits briefly for first content before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the ingest URL is
    /// empty, or the HTTP client cannot be built. Fetch failures after
    /// startup never surface here; they are reported through
    /// [`Board::status_report`].
    pub async fn live(config: TickerConfig) -> Result<Board> {
        let fetcher = fetch::HttpFetcher::new()?;
        Self::live_with(config, fetcher).await
    }

    /// Start a live pipeline with a custom fetch capability.
    ///
    /// The capability owns transport concerns; everything downstream of the
    /// fetched bytes behaves exactly as in [`Paddock::live`].
    pub async fn live_with<F>(config: TickerConfig, fetcher: F) -> Result<Board>
    where
        F: Fetcher,
    {
        config.validate()?;
        if config.ingest.url.is_empty() {
            return Err(TickerError::config_error("ingest.url must be set for live mode"));
        }
        let status = StatusCell::new();
        let source = CsvIngestor::new(&config, fetcher, status.clone());
        Ok(Board::start(config, source, Source::Live, status).await)
    }

    /// Start a pipeline over the built-in simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub async fn simulate(config: TickerConfig) -> Result<Board> {
        config.validate()?;
        let source = SimulatedSource::new(&config);
        Ok(Board::start(config, source, Source::Simulated, StatusCell::new()).await)
    }
}
