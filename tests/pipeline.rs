//! End-to-end pipeline tests.
//!
//! These drive the crate the way an embedder would: through [`Paddock`] and
//! the [`Board`] handle only, with a scripted transport standing in for the
//! timing endpoint and a recording surface standing in for a real display.
//! Time is paused throughout, so poll cadences and scroll cycles advance
//! deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use paddock::{
    Fetcher, FrameDraw, Paddock, Result, Source, StyleSnapshot, Surface, TickerConfig, TickerError,
};

/// Transport stub: plays back a script of fetch outcomes, then parks forever
/// so the ingest loop sits idle once the script runs out.
#[derive(Clone)]
struct ScriptedFetcher {
    script: Arc<Mutex<VecDeque<Result<Vec<u8>>>>>,
}

impl ScriptedFetcher {
    fn new(script: Vec<Result<Vec<u8>>>) -> Self {
        Self { script: Arc::new(Mutex::new(script.into_iter().collect())) }
    }

    fn documents(docs: &[&[u8]]) -> Self {
        Self::new(docs.iter().map(|d| Ok(d.to_vec())).collect())
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

/// Display stub with a fixed viewport and 10px-per-character metrics.
#[derive(Clone, Default)]
struct LedgerSurface {
    inner: Arc<Mutex<Ledger>>,
}

#[derive(Default)]
struct Ledger {
    frames: Vec<(String, f64)>,
    waiting: usize,
}

impl LedgerSurface {
    /// Drawn texts with consecutive repeats collapsed.
    fn distinct_texts(&self) -> Vec<String> {
        let ledger = self.inner.lock().unwrap();
        let mut out: Vec<String> = Vec::new();
        for (text, _) in &ledger.frames {
            if out.last().map(String::as_str) != Some(text.as_str()) {
                out.push(text.clone());
            }
        }
        out
    }

    fn waiting_frames(&self) -> usize {
        self.inner.lock().unwrap().waiting
    }

    fn first_frame(&self) -> Option<(String, f64)> {
        self.inner.lock().unwrap().frames.first().cloned()
    }
}

impl Surface for LedgerSurface {
    fn viewport_width(&self) -> f64 {
        50.0
    }

    fn measure(&self, text: &str, _style: &StyleSnapshot) -> f64 {
        text.chars().count() as f64 * 10.0
    }

    fn draw(&mut self, frame: &FrameDraw<'_>) {
        self.inner.lock().unwrap().frames.push((frame.text.to_string(), frame.offset_px));
    }

    fn draw_waiting(&mut self) {
        self.inner.lock().unwrap().waiting += 1;
    }
}

fn live_config() -> TickerConfig {
    let mut config = TickerConfig::default();
    config.ingest.url = "http://timing.example/live.csv".to_string();
    config.ingest.poll_interval_s = 1.0;
    config
}

#[tokio::test(start_paused = true)]
async fn live_board_serves_the_first_document_formatted() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::documents(&[b"1,10,2:15\n2,8,2:01\n"]);
    let board = Paddock::live_with(live_config(), fetcher).await?;

    let payload = board.controller().active().unwrap();
    assert_eq!(payload.version, 0);
    assert_eq!(payload.ticker_text, "NR.01 LAP 10 TIME 2:15 // NR.02 LAP 8 TIME 2:01");

    let report = board.status_report();
    assert_eq!(report.source, Source::Live);
    assert_eq!(report.runner_count, 2);
    assert!(report.last_hash.is_some());
    assert!(report.last_error.is_none());
    assert!(!report.using_last_known_good);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unchanged_documents_do_not_raise_a_new_version() -> anyhow::Result<()> {
    let doc: &[u8] = b"1,10,2:15\n2,8,2:01\n";
    let fetcher = ScriptedFetcher::documents(&[doc, doc]);
    let board = Paddock::live_with(live_config(), fetcher).await?;

    // Past the second poll: same bytes, so no new payload may appear.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let report = board.controller().complete_cycle();
    assert!(!report.swapped);
    assert_eq!(report.version, Some(0));
    assert_eq!(board.controller().active().unwrap().version, 0);

    let status = board.status_report();
    assert!(!status.hash_changed);
    assert!(status.last_fetch_unix.is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicate_and_malformed_rows_resolve_during_ingest() -> anyhow::Result<()> {
    let doc: &[u8] = b"7,3,1:59\nbogus-row\n7,4,2:02\n3,1,1:44\n0,9,9:99\n";
    let fetcher = ScriptedFetcher::documents(&[doc]);
    let board = Paddock::live_with(live_config(), fetcher).await?;

    // Runner 7 keeps its higher-lap row, the unparseable rows drop out, and
    // by-number ordering puts runner 3 first.
    let payload = board.controller().active().unwrap();
    assert_eq!(payload.ticker_text, "NR.03 LAP 1 TIME 1:44 // NR.07 LAP 4 TIME 2:02");
    assert_eq!(board.current_state().unwrap().runner_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn ingest_failure_keeps_the_last_known_good_state() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let fetcher = ScriptedFetcher::new(vec![
        Ok(b"1,10,2:15\n".to_vec()),
        Err(TickerError::fetch_failed("http://timing.example/live.csv", "connection refused")),
    ]);
    let board = Paddock::live_with(live_config(), fetcher).await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let report = board.status_report();
    assert!(report.last_error.is_some());
    assert!(report.using_last_known_good);
    assert_eq!(report.runner_count, 1);

    // The served payload is untouched by the failed cycle.
    let payload = board.controller().active().unwrap();
    assert_eq!(payload.version, 0);
    assert_eq!(payload.ticker_text, "NR.01 LAP 10 TIME 2:15");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn attached_surface_sees_a_swap_only_at_the_cycle_boundary() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let mut config = live_config();
    config.scroll.speed_px_s = 100.0;
    config.scroll.fps = 10;
    config.race_time.enabled = false;

    // Both lines measure 210px against the 50px viewport, so a full traversal
    // takes 27 frames at 10px per frame: boundary lands at t=2.7s.
    let fetcher = ScriptedFetcher::documents(&[b"1,1,1:00\n", b"1,2,1:07\n"]);
    let board = Paddock::live_with(config, fetcher).await?;

    let surface = LedgerSurface::default();
    let consumer = board.attach(surface.clone());

    tokio::time::sleep(Duration::from_secs(3)).await;
    drop(board);
    consumer.await?;

    assert_eq!(surface.waiting_frames(), 0);
    assert_eq!(
        surface.first_frame(),
        Some(("NR.01 LAP 1 TIME 1:00".to_string(), 50.0)),
        "content enters from the right edge"
    );
    assert_eq!(
        surface.distinct_texts(),
        vec!["NR.01 LAP 1 TIME 1:00".to_string(), "NR.01 LAP 2 TIME 1:07".to_string()],
        "the second document appears exactly once, at the boundary"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn simulated_board_needs_no_network() -> anyhow::Result<()> {
    let mut config = TickerConfig::default();
    config.simulation.runner_count = 4;
    config.simulation.seed = Some(7);

    let board = Paddock::simulate(config).await?;

    assert_eq!(board.source(), Source::Simulated);
    assert_eq!(board.current_state().unwrap().runner_count(), 4);
    let payload = board.controller().active().unwrap();
    assert!(payload.ticker_text.starts_with("NR.01 LAP "));
    assert!(payload.ticker_text.contains(" // NR.04 LAP "));

    let report = board.status_report();
    assert_eq!(report.source, Source::Simulated);
    // The simulator records no fetch traffic.
    assert!(report.last_fetch_unix.is_none());
    assert!(report.last_hash.is_none());
    Ok(())
}
