//! Live ingestor polling a CSV timing source.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, trace, warn};

use crate::Result;
use crate::canon;
use crate::config::{DisplayConfig, TickerConfig};
use crate::fetch::Fetcher;
use crate::source::RaceSource;
use crate::status::StatusCell;
use crate::types::{RaceState, Source};

/// Polls the configured URL on a fixed interval and turns changed documents
/// into canonical states.
///
/// Fetch cycle: fetch bytes, hash with blake3, skip the parse when the hash
/// matches the last successfully parsed document, otherwise canonicalize and
/// publish. The dedup hash is stored only after a successful parse, so a
/// document that failed validation is retried on the next cycle even when its
/// bytes did not change. Failures never end the polling loop; they surface as
/// `Err` for the driver to log while the last good state stays authoritative.
pub struct CsvIngestor<F> {
    fetcher: F,

    url: String,

    /// Per-fetch deadline
    timeout: Duration,

    display: DisplayConfig,

    /// Poll pacing interval
    interval: Interval,

    cadence: Duration,

    /// Hash of the last successfully parsed document
    parsed_hash: Option<String>,

    /// Hash of the last fetched document, parsed or not
    fetched_hash: Option<String>,

    status: StatusCell,
}

impl<F: Fetcher> CsvIngestor<F> {
    pub fn new(config: &TickerConfig, fetcher: F, status: StatusCell) -> Self {
        let cadence = config.ingest.poll_interval();
        let mut interval = interval(cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            url = %config.ingest.url,
            poll_interval_s = config.ingest.poll_interval_s,
            timeout_s = config.ingest.timeout_s,
            "live CSV ingestor ready"
        );

        Self {
            fetcher,
            url: config.ingest.url.clone(),
            timeout: config.ingest.timeout(),
            display: config.display.clone(),
            interval,
            cadence,
            parsed_hash: None,
            fetched_hash: None,
            status,
        }
    }
}

#[async_trait::async_trait]
impl<F: Fetcher> RaceSource for CsvIngestor<F> {
    async fn next_state(&mut self) -> Result<Option<Arc<RaceState>>> {
        loop {
            self.interval.tick().await;

            let bytes = match self.fetcher.fetch(&self.url, self.timeout).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.status.record_fetch_error(&e);
                    return Err(e);
                }
            };

            let hash = blake3::hash(&bytes).to_hex().to_string();
            let changed = self.fetched_hash.as_deref().is_some_and(|prev| prev != hash);
            self.fetched_hash = Some(hash.clone());
            self.status.record_fetch(&hash, changed);

            if self.parsed_hash.as_deref() == Some(hash.as_str()) {
                trace!(hash = %hash, "content unchanged, skipping parse");
                continue;
            }

            let outcome = match canon::canonicalize(&bytes, &self.display, Source::Live) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.status.record_parse_error(&e);
                    return Err(e);
                }
            };
            for dropped in &outcome.dropped {
                warn!(error = %dropped, "timing row dropped");
            }

            self.parsed_hash = Some(hash);
            let state = Arc::new(outcome.state);
            debug!(
                runners = state.runner_count(),
                dropped = outcome.dropped.len(),
                "canonical state accepted"
            );
            return Ok(Some(state));
        }
    }

    fn cadence(&self) -> Duration {
        self.cadence
    }
}
