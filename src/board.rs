//! Board handle over a running ticker pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::PayloadBuffer;
use crate::clock::RaceClock;
use crate::config::TickerConfig;
use crate::consumer::{ScrollConsumer, Surface};
use crate::driver::Driver;
use crate::format::MessageFormatter;
use crate::source::RaceSource;
use crate::status::{StatusCell, StatusReport};
use crate::types::{RaceState, Source};

/// Handle to a running pipeline: background producer task, payload double
/// buffer, race clock and status cell.
///
/// One `Board` exists per race; everything an operator layer or a rendering
/// layer needs is reached through it. Dropping the board cancels the pipeline
/// task and every consumer attached through [`Board::attach`].
pub struct Board {
    states: watch::Receiver<Option<Arc<RaceState>>>,

    buffer: PayloadBuffer,

    clock: RaceClock,

    formatter: Arc<MessageFormatter>,

    status: StatusCell,

    config: TickerConfig,

    /// Producer mode the pipeline was started in
    source: Source,

    frozen: Arc<AtomicBool>,

    /// Cancellation token for stopping tasks
    cancel: CancellationToken,
}

impl Board {
    /// Spawn the pipeline for `source` and wait briefly for first content.
    ///
    /// `status` is shared with the source when the source records its own
    /// fetch health (the live ingestor does). The wait is best-effort: a
    /// source that cannot produce within the timeout logs a warning and the
    /// board starts empty, serving the waiting indicator until data arrives.
    pub(crate) async fn start<S>(
        config: TickerConfig,
        source: S,
        mode: Source,
        status: StatusCell,
    ) -> Self
    where
        S: RaceSource,
    {
        let formatter = Arc::new(MessageFormatter::new(&config));
        let buffer = PayloadBuffer::new();
        let frozen = Arc::new(AtomicBool::new(false));

        let channels = Driver::spawn(
            source,
            Arc::clone(&formatter),
            buffer.clone(),
            status.clone(),
            Arc::clone(&frozen),
        );

        // Wait for the first state so callers usually see content immediately
        let mut state_rx = channels.states.clone();
        let wait_result = tokio::time::timeout(Duration::from_secs(5), async {
            // A dropped sender means the pipeline already ended; stop waiting.
            while state_rx.borrow().is_none() {
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;

        if wait_result.is_err() {
            warn!(source = mode.as_str(), "timeout waiting for first state");
        }

        info!(source = mode.as_str(), profile = %config.ingest.profile, "board started");

        Self {
            states: channels.states,
            buffer,
            clock: RaceClock::new(),
            formatter,
            status,
            config,
            source: mode,
            frozen,
            cancel: channels.cancel,
        }
    }

    /// Payload controller handle for a serving layer: `active`, `submit`,
    /// `complete_cycle`.
    pub fn controller(&self) -> PayloadBuffer {
        self.buffer.clone()
    }

    /// Race clock handle for operator command dispatch.
    pub fn clock(&self) -> RaceClock {
        self.clock.clone()
    }

    /// Point-in-time health snapshot.
    pub fn status_report(&self) -> StatusReport {
        self.status.report(&self.config.ingest.profile, self.source, &self.clock)
    }

    /// Get canonical state updates as a stream
    pub fn state_updates(&self) -> impl Stream<Item = Arc<RaceState>> + 'static {
        WatchStream::new(self.states.clone()).filter_map(|opt| async move { opt })
    }

    /// Get the current canonical state (if available)
    pub fn current_state(&self) -> Option<Arc<RaceState>> {
        self.states.borrow().clone()
    }

    /// Producer mode this board was started in.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Submit a payload carrying the race-time line as its entire ticker
    /// text. Returns `false` when there is no state yet or updates are
    /// frozen.
    pub fn submit_race_time(&self) -> bool {
        if self.frozen.load(Ordering::Relaxed) {
            debug!("updates frozen, race-time payload not submitted");
            return false;
        }
        let Some(state) = self.current_state() else {
            debug!("no state yet, race-time payload not submitted");
            return false;
        };
        let elapsed = self.clock.elapsed_text();
        self.buffer.submit(self.formatter.payload(&state, Some(&elapsed)));
        true
    }

    /// Freeze or resume payload submission. While frozen the producer keeps
    /// fetching and status keeps updating; the display simply stops changing.
    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::Relaxed);
        info!(frozen, "display updates freeze toggled");
    }

    pub fn frozen(&self) -> bool {
        self.frozen.load(Ordering::Relaxed)
    }

    /// Attach a rendering surface, spawning a scroll consumer that runs until
    /// the board is dropped.
    pub fn attach<D>(&self, surface: D) -> tokio::task::JoinHandle<()>
    where
        D: Surface,
    {
        let consumer =
            ScrollConsumer::new(&self.config, self.buffer.clone(), surface, self.clock.clone());
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            consumer.run(cancel).await;
        })
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        debug!("dropping board");
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
