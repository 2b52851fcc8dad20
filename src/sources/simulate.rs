//! Simulated producer for operation without a timing feed.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::debug;

use crate::Result;
use crate::config::TickerConfig;
use crate::source::RaceSource;
use crate::types::{RaceState, RunnerState, Source};

struct SimRunner {
    number: u32,
    lap: u32,
    lap_time: String,
}

/// Generates plausible race states on the ingest cadence.
///
/// Runner numbers are stable across the run and lap numbers never decrease;
/// each tick advances each runner's lap with the configured probability and
/// regenerates its lap-time text with bounded variance around the base lap
/// time. States flow through the same formatting and buffering path as live
/// data. The stream never ends.
pub struct SimulatedSource {
    runners: Vec<SimRunner>,
    rng: StdRng,
    lap_chance: f64,
    base_lap_time_s: f64,
    jitter_s: f64,
    interval: Interval,
    cadence: Duration,
}

impl SimulatedSource {
    pub fn new(config: &TickerConfig) -> Self {
        let sim = &config.simulation;
        let mut rng = match sim.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let runners = (1..=sim.runner_count as u32)
            .map(|number| SimRunner {
                number,
                lap: 1,
                lap_time: lap_time_text(&mut rng, sim.base_lap_time_s, sim.jitter_s),
            })
            .collect();

        let cadence = config.ingest.poll_interval();
        let mut interval = interval(cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            runners = sim.runner_count,
            seed = ?sim.seed,
            lap_chance = sim.lap_chance,
            "simulated source ready"
        );

        Self {
            runners,
            rng,
            lap_chance: sim.lap_chance,
            base_lap_time_s: sim.base_lap_time_s,
            jitter_s: sim.jitter_s,
            interval,
            cadence,
        }
    }

    fn advance(&mut self) {
        for runner in &mut self.runners {
            if self.rng.gen_bool(self.lap_chance) {
                runner.lap += 1;
                runner.lap_time =
                    lap_time_text(&mut self.rng, self.base_lap_time_s, self.jitter_s);
            }
        }
    }

    fn snapshot(&self) -> RaceState {
        let runners = self
            .runners
            .iter()
            .map(|runner| RunnerState {
                number: runner.number,
                lap: runner.lap,
                lap_time: runner.lap_time.clone(),
                distance: None,
            })
            .collect();
        RaceState::new(runners, Source::Simulated)
    }
}

/// Renders `base ± jitter` seconds as `M:SS.s` text.
fn lap_time_text(rng: &mut StdRng, base_s: f64, jitter_s: f64) -> String {
    let seconds = if jitter_s > 0.0 {
        base_s + rng.gen_range(-jitter_s..=jitter_s)
    } else {
        base_s
    };
    // A jitter wider than the base never produces a negative time.
    let seconds = seconds.max(1.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let rem = seconds - (minutes as f64) * 60.0;
    format!("{minutes}:{rem:04.1}")
}

#[async_trait::async_trait]
impl RaceSource for SimulatedSource {
    async fn next_state(&mut self) -> Result<Option<Arc<RaceState>>> {
        self.interval.tick().await;
        self.advance();
        Ok(Some(Arc::new(self.snapshot())))
    }

    fn cadence(&self) -> Duration {
        self.cadence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_config(seed: u64) -> TickerConfig {
        let mut config = TickerConfig::default();
        config.simulation.seed = Some(seed);
        config
    }

    #[tokio::test(start_paused = true)]
    async fn produces_the_configured_grid() {
        let mut config = seeded_config(7);
        config.simulation.runner_count = 4;
        let mut source = SimulatedSource::new(&config);

        let state = source.next_state().await.unwrap().unwrap();
        assert_eq!(state.source, Source::Simulated);
        let numbers: Vec<u32> = state.runners.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        for runner in &state.runners {
            assert!(runner.lap >= 1);
            assert!(runner.lap_time.contains(':'), "lap time {:?}", runner.lap_time);
            assert!(runner.distance.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn laps_never_decrease_and_numbers_stay_stable() {
        let mut source = SimulatedSource::new(&seeded_config(42));
        let mut previous: Option<Vec<u32>> = None;

        for _ in 0..25 {
            let state = source.next_state().await.unwrap().unwrap();
            let numbers: Vec<u32> = state.runners.iter().map(|r| r.number).collect();
            assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
            let laps: Vec<u32> = state.runners.iter().map(|r| r.lap).collect();
            if let Some(prev) = &previous {
                for (before, after) in prev.iter().zip(&laps) {
                    assert!(after >= before, "lap regressed from {before} to {after}");
                }
            }
            previous = Some(laps);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn identical_seeds_replay_identically() {
        let config = seeded_config(99);
        let mut a = SimulatedSource::new(&config);
        let mut b = SimulatedSource::new(&config);

        for _ in 0..10 {
            let sa = a.next_state().await.unwrap().unwrap();
            let sb = b.next_state().await.unwrap().unwrap();
            assert_eq!(sa.runners, sb.runners);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn laps_advance_over_time() {
        let mut config = seeded_config(3);
        config.simulation.lap_chance = 1.0;
        let mut source = SimulatedSource::new(&config);

        let first = source.next_state().await.unwrap().unwrap();
        let later = source.next_state().await.unwrap().unwrap();
        for (a, b) in first.runners.iter().zip(&later.runners) {
            assert_eq!(b.lap, a.lap + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_the_ingest_cadence() {
        let mut config = seeded_config(1);
        config.ingest.poll_interval_s = 5.0;
        let mut source = SimulatedSource::new(&config);
        assert_eq!(source.cadence(), Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        source.next_state().await.unwrap();
        source.next_state().await.unwrap();
        source.next_state().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[test]
    fn lap_time_text_is_minutes_and_padded_seconds() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(lap_time_text(&mut rng, 95.0, 0.0), "1:35.0");
        assert_eq!(lap_time_text(&mut rng, 65.3, 0.0), "1:05.3");
        assert_eq!(lap_time_text(&mut rng, 59.9, 0.0), "0:59.9");
        // Bounded variance stays within base ± jitter.
        for _ in 0..100 {
            let text = lap_time_text(&mut rng, 95.0, 12.0);
            let (m, s) = text.split_once(':').unwrap();
            let total = m.parse::<f64>().unwrap() * 60.0 + s.parse::<f64>().unwrap();
            assert!((83.0 - 0.1..=107.0 + 0.1).contains(&total), "{text}");
        }
    }
}
