//! Frame-rate gating utilities

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Redraw interval for a target frequency.
pub fn fps_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

/// Extension trait to add rate gating to any Stream
pub trait GateExt: Stream {
    /// Gate the stream to emit at most once per interval
    ///
    /// Uses "latest-wins" semantics - if multiple items arrive
    /// during an interval, only the latest is emitted.
    fn gate(self, duration: Duration) -> Gate<Self>
    where
        Self: Sized,
    {
        Gate::new(self, duration)
    }
}

impl<T: Stream> GateExt for T {}

pin_project! {
    /// A stream combinator that caps emission rate
    pub struct Gate<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
    }
}

impl<S: Stream> Gate<S> {
    /// Create a new gated stream
    pub fn new(stream: S, duration: Duration) -> Self {
        Self { stream, interval: new_interval(duration), pending: None }
    }

    /// Replace the emission interval.
    ///
    /// The next emission waits for a tick of the new interval; the buffered
    /// item, if any, is kept.
    pub fn set_interval(self: Pin<&mut Self>, duration: Duration) {
        let this = self.project();
        *this.interval = new_interval(duration);
    }
}

fn new_interval(duration: Duration) -> Interval {
    let mut interval = interval(duration);
    // Delay after a stall instead of bursting
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl<S: Stream> Stream for Gate<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain the source so the freshest item is buffered
        loop {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    *this.pending = Some(item);
                }
                Poll::Ready(None) => {
                    // Source ended: flush the buffered item, then end
                    return Poll::Ready(this.pending.take());
                }
                Poll::Pending => break,
            }
        }

        // An empty buffer waits on the source, not the timer, so a sparse
        // source never ends the gated stream early.
        if this.pending.is_none() {
            return Poll::Pending;
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(this.pending.take())
    }
}
