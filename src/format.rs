//! Message formatting: canonical race state to render payloads.
//!
//! [`MessageFormatter`] is the only producer of [`RenderPayload`] values and
//! the owner of the payload version counter. Every invocation builds a fresh
//! payload with the next strictly-increasing version, starting at 0, and the
//! style/scroll configuration frozen in as snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{DisplayConfig, RunnerOrder, ScrollConfig, StyleConfig, TickerConfig};
use crate::types::{RaceState, RenderPayload, RunnerState, ScrollSnapshot, StyleSnapshot};

/// Build the race-time line shown in place of runner content.
pub fn race_time_line(elapsed_text: &str) -> String {
    format!("RACE TIME: {elapsed_text}")
}

/// Turns race states into render payloads.
///
/// Shared via `Arc` between the driver and operator-facing handles; all
/// methods take `&self` and the version counter is atomic, so no external
/// locking is needed.
#[derive(Debug)]
pub struct MessageFormatter {
    display: DisplayConfig,
    style: StyleConfig,
    scroll: ScrollConfig,
    next_version: AtomicU64,
}

impl MessageFormatter {
    pub fn new(config: &TickerConfig) -> Self {
        Self {
            display: config.display.clone(),
            style: config.style.clone(),
            scroll: config.scroll,
            next_version: AtomicU64::new(0),
        }
    }

    /// Build the next payload.
    ///
    /// With `race_time` supplied the race-time line replaces the entire ticker
    /// text for this payload; it is never appended to runner content. Either
    /// way the payload consumes the next version number.
    pub fn payload(&self, state: &RaceState, race_time: Option<&str>) -> RenderPayload {
        let ticker_text = match race_time {
            Some(elapsed_text) => race_time_line(elapsed_text),
            None => self.ticker_text(state),
        };
        RenderPayload {
            version: self.next_version.fetch_add(1, Ordering::Relaxed),
            ticker_text,
            style: StyleSnapshot::from(&self.style),
            scroll: ScrollSnapshot::from(self.scroll),
        }
    }

    /// Render the ticker line: one templated segment per runner, joined by the
    /// configured separator.
    ///
    /// Runners are ordered per configuration and clamped to the configured
    /// bound. States from the canonicalizer already satisfy both; reapplying
    /// them here keeps the line well-formed for hand-built states too.
    pub fn ticker_text(&self, state: &RaceState) -> String {
        let mut runners: Vec<&RunnerState> = state.runners.iter().collect();
        if self.display.order == RunnerOrder::ByNumber {
            runners.sort_by_key(|r| r.number);
        }
        runners.truncate(self.display.max_runners);
        runners
            .iter()
            .map(|runner| render_segment(&self.display.template, runner))
            .collect::<Vec<_>>()
            .join(&self.display.separator)
    }
}

/// Substitute template tokens for one runner.
///
/// Recognized tokens: `{runner}`, `{lap}` (numeric, zero-padding via
/// `{runner:02}` or the `{runner:02d}` spelling), `{lap_time}` and
/// `{distance}` (verbatim strings). Unknown tokens and unbalanced braces pass
/// through untouched. An absent distance renders as nothing and the segment
/// is right-trimmed so a trailing distance token leaves no dangling space.
fn render_segment(template: &str, runner: &RunnerState) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // Unbalanced brace: keep the tail verbatim.
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let token = &after[..close];
        match render_token(token, runner) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(token);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out.truncate(out.trim_end().len());
    out
}

fn render_token(token: &str, runner: &RunnerState) -> Option<String> {
    let (name, spec) = match token.split_once(':') {
        Some((name, spec)) => (name, Some(spec)),
        None => (token, None),
    };
    match name {
        "runner" => Some(render_number(u64::from(runner.number), spec)),
        "lap" => Some(render_number(u64::from(runner.lap), spec)),
        "lap_time" => Some(runner.lap_time.clone()),
        "distance" => Some(runner.distance.clone().unwrap_or_default()),
        _ => None,
    }
}

fn render_number(value: u64, spec: Option<&str>) -> String {
    let Some(spec) = spec else {
        return value.to_string();
    };
    let spec = spec.strip_suffix('d').unwrap_or(spec);
    match spec.strip_prefix('0').and_then(|width| width.parse::<usize>().ok()) {
        Some(width) => format!("{value:0width$}"),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn runner(number: u32, lap: u32, lap_time: &str) -> RunnerState {
        RunnerState { number, lap, lap_time: lap_time.to_string(), distance: None }
    }

    fn formatter() -> MessageFormatter {
        MessageFormatter::new(&TickerConfig::default())
    }

    #[test]
    fn default_template_matches_expected_line() {
        let state = RaceState::new(vec![runner(1, 10, "2:15"), runner(2, 8, "2:01")], Source::Live);
        let text = formatter().ticker_text(&state);
        assert_eq!(text, "NR.01 LAP 10 TIME 2:15 // NR.02 LAP 8 TIME 2:01");
    }

    #[test]
    fn versions_start_at_zero_and_increase_monotonically() {
        let formatter = formatter();
        let state = RaceState::new(vec![runner(1, 1, "1:00")], Source::Live);
        assert_eq!(formatter.payload(&state, None).version, 0);
        assert_eq!(formatter.payload(&state, None).version, 1);
        assert_eq!(formatter.payload(&state, Some("0:05")).version, 2);
        assert_eq!(formatter.payload(&state, None).version, 3);
    }

    #[test]
    fn race_time_replaces_entire_ticker_text() {
        let formatter = formatter();
        let state = RaceState::new(vec![runner(1, 10, "2:15"), runner(2, 8, "2:01")], Source::Live);
        let payload = formatter.payload(&state, Some("1:02:05"));
        assert_eq!(payload.ticker_text, "RACE TIME: 1:02:05");
        assert!(!payload.ticker_text.contains("NR.01"));
    }

    #[test]
    fn runner_token_zero_pads_to_two_digits_without_truncating() {
        let state = RaceState::new(vec![runner(7, 1, "1:00"), runner(123, 2, "1:01")], Source::Live);
        let text = formatter().ticker_text(&state);
        assert!(text.starts_with("NR.07 "));
        assert!(text.contains("NR.123 "));
    }

    #[test]
    fn orders_by_number_by_default() {
        let state = RaceState::new(vec![runner(9, 1, "1:00"), runner(2, 1, "1:01")], Source::Live);
        let text = formatter().ticker_text(&state);
        let first = text.find("NR.02").unwrap();
        let second = text.find("NR.09").unwrap();
        assert!(first < second);
    }

    #[test]
    fn source_order_preserves_state_order() {
        let mut config = TickerConfig::default();
        config.display.order = RunnerOrder::SourceOrder;
        let formatter = MessageFormatter::new(&config);
        let state = RaceState::new(vec![runner(9, 1, "1:00"), runner(2, 1, "1:01")], Source::Live);
        let text = formatter.ticker_text(&state);
        assert!(text.find("NR.09").unwrap() < text.find("NR.02").unwrap());
    }

    #[test]
    fn clamps_to_configured_runner_bound() {
        let mut config = TickerConfig::default();
        config.display.max_runners = 2;
        let formatter = MessageFormatter::new(&config);
        let state = RaceState::new(
            vec![runner(1, 1, "1:00"), runner(2, 1, "1:01"), runner(3, 1, "1:02")],
            Source::Live,
        );
        let text = formatter.ticker_text(&state);
        assert!(text.contains("NR.01") && text.contains("NR.02"));
        assert!(!text.contains("NR.03"));
    }

    #[test]
    fn distance_token_renders_value_or_nothing() {
        let mut config = TickerConfig::default();
        config.display.template = "{runner} {lap_time} {distance}".to_string();
        let formatter = MessageFormatter::new(&config);

        let mut with_distance = runner(1, 1, "1:00");
        with_distance.distance = Some("12.4km".to_string());
        let state = RaceState::new(vec![with_distance, runner(2, 1, "1:05")], Source::Live);

        let text = formatter.ticker_text(&state);
        let segments: Vec<&str> = text.split(" // ").collect();
        assert_eq!(segments[0], "1 1:00 12.4km");
        // Absent distance leaves no trailing space.
        assert_eq!(segments[1], "2 1:05");
    }

    #[test]
    fn unknown_tokens_and_unbalanced_braces_pass_through() {
        let mut config = TickerConfig::default();
        config.display.template = "{runner} {pace} {lap".to_string();
        let formatter = MessageFormatter::new(&config);
        let state = RaceState::new(vec![runner(4, 2, "1:00")], Source::Live);
        assert_eq!(formatter.ticker_text(&state), "4 {pace} {lap");
    }

    #[test]
    fn custom_separator_and_template_apply() {
        let mut config = TickerConfig::default();
        config.display.template = "#{runner:03} L{lap}".to_string();
        config.display.separator = " | ".to_string();
        let formatter = MessageFormatter::new(&config);
        let state = RaceState::new(vec![runner(1, 10, "2:15"), runner(2, 8, "2:01")], Source::Live);
        assert_eq!(formatter.ticker_text(&state), "#001 L10 | #002 L8");
    }

    #[test]
    fn payload_freezes_style_and_scroll_snapshots() {
        let mut config = TickerConfig::default();
        config.style.text_color = "#123456".to_string();
        config.scroll.speed_px_s = 99.0;
        let formatter = MessageFormatter::new(&config);
        let state = RaceState::new(vec![runner(1, 1, "1:00")], Source::Live);
        let payload = formatter.payload(&state, None);
        assert_eq!(payload.style.text_color, "#123456");
        assert_eq!(payload.scroll.speed_px_s, 99.0);
        assert_eq!(payload.scroll.fps, 30);
    }

    #[test]
    fn race_time_line_joins_prefix_and_elapsed() {
        assert_eq!(race_time_line("0:00"), "RACE TIME: 0:00");
        assert_eq!(race_time_line("1:02:05"), "RACE TIME: 1:02:05");
    }
}
