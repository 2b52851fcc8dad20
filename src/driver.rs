//! Driver spawns and manages the state-to-payload pipeline task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::PayloadBuffer;
use crate::format::MessageFormatter;
use crate::source::RaceSource;
use crate::status::StatusCell;
use crate::types::RaceState;

/// Result of spawning the driver task.
pub struct DriverChannels {
    /// Receiver for canonical race states.
    pub states: watch::Receiver<Option<Arc<RaceState>>>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the pipeline task.
///
/// The spawned task owns the source and runs the full accept path for every
/// state: record it for status reporting, format it into the next payload,
/// submit the payload to the double buffer, and publish the state on the watch
/// channel. Source errors are logged with backoff and never end the task; the
/// last published state stays authoritative throughout.
pub struct Driver;

impl Driver {
    /// Spawn the pipeline task for the given source.
    ///
    /// Returns a watch receiver for canonical states plus a cancellation token
    /// for graceful shutdown. While `frozen` is set, states still flow to the
    /// watch channel and status cell but no payloads are submitted.
    pub fn spawn<S>(
        source: S,
        formatter: Arc<MessageFormatter>,
        buffer: PayloadBuffer,
        status: StatusCell,
        frozen: Arc<AtomicBool>,
    ) -> DriverChannels
    where
        S: RaceSource,
    {
        let (state_tx, state_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            Self::pipeline_task(source, formatter, buffer, status, frozen, state_tx, cancel_task)
                .await;
        });

        DriverChannels { states: state_rx, cancel }
    }

    async fn pipeline_task<S>(
        mut source: S,
        formatter: Arc<MessageFormatter>,
        buffer: PayloadBuffer,
        status: StatusCell,
        frozen: Arc<AtomicBool>,
        state_tx: watch::Sender<Option<Arc<RaceState>>>,
        cancel: CancellationToken,
    ) where
        S: RaceSource,
    {
        info!("pipeline task started");
        let mut state_count = 0u64;
        let mut error_count = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!("pipeline cancelled");
                break;
            }

            // Use select to allow cancellation while waiting on the source
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("pipeline cancelled during read");
                    break;
                }
                result = source.next_state() => result,
            };

            match result {
                Ok(Some(state)) => {
                    state_count += 1;
                    error_count = 0;
                    trace!(
                        state = state_count,
                        runners = state.runner_count(),
                        source = state.source.as_str(),
                        "state accepted"
                    );

                    status.record_state(Arc::clone(&state));

                    if frozen.load(Ordering::Relaxed) {
                        debug!("updates frozen, payload not submitted");
                    } else {
                        buffer.submit(formatter.payload(&state, None));
                    }

                    if state_tx.send(Some(state)).is_err() {
                        debug!("state receiver dropped, shutting down");
                        break;
                    }
                }
                Ok(None) => {
                    // End of stream; the last state and payload stay in place.
                    info!("source ended after {} states", state_count);
                    break;
                }
                Err(e) => {
                    error_count = error_count.saturating_add(1);
                    warn!(
                        error = %e,
                        consecutive = error_count,
                        retryable = e.is_retryable(),
                        "source error, serving last known good"
                    );

                    // Exponential backoff: 100ms, 200ms, 400ms, ... capped.
                    let backoff =
                        std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!("pipeline task ended (processed {} states)", state_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TickerConfig;
    use crate::test_utils::ScriptedSource;
    use crate::types::Source;
    use std::time::Duration;

    fn pipeline() -> (Arc<MessageFormatter>, PayloadBuffer, StatusCell, Arc<AtomicBool>) {
        (
            Arc::new(MessageFormatter::new(&TickerConfig::default())),
            PayloadBuffer::new(),
            StatusCell::new(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    async fn next_state(rx: &mut watch::Receiver<Option<Arc<RaceState>>>) -> Arc<RaceState> {
        rx.changed().await.unwrap();
        rx.borrow_and_update().clone().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn states_flow_to_watch_buffer_and_status() {
        let (formatter, buffer, status, frozen) = pipeline();
        let source = ScriptedSource::states(vec![
            vec![(1, 10, "2:15")],
            vec![(1, 11, "2:09"), (2, 8, "2:01")],
        ]);
        let mut channels =
            Driver::spawn(source, formatter, buffer.clone(), status.clone(), frozen);

        let first = next_state(&mut channels.states).await;
        assert_eq!(first.runner_count(), 1);
        let second = next_state(&mut channels.states).await;
        assert_eq!(second.runner_count(), 2);

        // First payload took the fast path into active; the second is pending.
        let active = buffer.active().unwrap();
        assert_eq!(active.version, 0);
        assert!(buffer.complete_cycle().swapped);
        assert_eq!(buffer.active().unwrap().version, 1);

        let report = status.report("default", Source::Live, &crate::clock::RaceClock::new());
        assert_eq!(report.runner_count, 2);
        assert!(report.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn errors_back_off_and_recovery_resumes_the_flow() {
        let (formatter, buffer, status, frozen) = pipeline();
        let source = ScriptedSource::new(vec![
            Err(crate::error::TickerError::fetch_failed("x", "down")),
            Err(crate::error::TickerError::fetch_failed("x", "still down")),
            Ok(Some(ScriptedSource::state(vec![(5, 2, "1:30")]))),
        ]);
        let mut channels = Driver::spawn(source, formatter, buffer.clone(), status, frozen);

        let state = next_state(&mut channels.states).await;
        assert_eq!(state.runners[0].number, 5);
        assert_eq!(buffer.active().unwrap().version, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn frozen_flag_withholds_payloads_but_not_states() {
        let (formatter, buffer, status, frozen) = pipeline();
        frozen.store(true, Ordering::Relaxed);
        let source = ScriptedSource::states(vec![vec![(1, 1, "1:00")]]);
        let mut channels =
            Driver::spawn(source, formatter, buffer.clone(), status.clone(), frozen);

        let state = next_state(&mut channels.states).await;
        assert_eq!(state.runner_count(), 1);
        assert!(buffer.active().is_none());
        assert!(status.state().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_end_leaves_the_last_state_in_place() {
        let (formatter, buffer, status, frozen) = pipeline();
        let source = ScriptedSource::states(vec![vec![(3, 4, "1:11")]]);
        let mut channels = Driver::spawn(source, formatter, buffer, status, frozen);

        next_state(&mut channels.states).await;
        // Script exhausted: the task ends without clearing the channel.
        tokio::task::yield_now().await;
        assert!(channels.states.borrow().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_pipeline() {
        let (formatter, buffer, status, frozen) = pipeline();
        let source = ScriptedSource::states_with_delay(
            vec![vec![(1, 1, "1:00")]],
            Duration::from_secs(60),
        );
        let channels = Driver::spawn(source, formatter, buffer, status, frozen);

        channels.cancel.cancel();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_secs(120)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(channels.states.borrow().is_none());
    }
}
