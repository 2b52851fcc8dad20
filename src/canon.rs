//! Race state canonicalization: raw CSV bytes to validated, deduplicated,
//! bounded [`RaceState`].
//!
//! This is a pure transform with no side effects. Malformed rows are dropped
//! individually and reported back as [`TickerError::Validation`] values in
//! document order; callers decide whether to log them. The whole document
//! fails only when it cannot be decoded or yields no well-formed row at all.
//!
//! Expected document shape: no header row, columns in fixed order
//! `runner number, lap number, lap time, optional distance`.

use std::collections::HashMap;

use crate::config::{DisplayConfig, RunnerOrder};
use crate::error::{Result, TickerError};
use crate::types::{RaceState, RunnerState, Source};

/// Outcome of a successful canonicalization pass.
#[derive(Debug)]
pub struct Canonicalized {
    pub state: RaceState,
    /// Rows rejected during validation, in document order. Never escalated by
    /// this module; surfaced so the ingest loop can log them.
    pub dropped: Vec<TickerError>,
}

/// Parse raw CSV bytes into a canonical race state.
///
/// Dedup rule: when several rows share a runner number, the row with the
/// greatest lap number wins; on a tie the later row in the document wins.
/// Runner order follows `display.order`, applied before truncating to
/// `display.max_runners` so the bound always keeps the leading runners of the
/// configured order. Runner positions under
/// [`RunnerOrder::SourceOrder`] are those of each runner's first appearance,
/// regardless of which duplicate row supplied the winning values.
pub fn canonicalize(bytes: &[u8], display: &DisplayConfig, source: Source) -> Result<Canonicalized> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        TickerError::parse_error("timing document", format!("not valid UTF-8: {e}"))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut runners: Vec<RunnerState> = Vec::new();
    let mut index_by_number: HashMap<u32, usize> = HashMap::new();
    let mut dropped = Vec::new();
    let mut rows_seen = 0usize;

    for (index, outcome) in reader.records().enumerate() {
        rows_seen += 1;
        let fallback_line = index + 1;
        let record = match outcome {
            Ok(record) => record,
            Err(e) => {
                dropped.push(TickerError::row_invalid(fallback_line, format!("unreadable row: {e}")));
                continue;
            }
        };
        let row = record.position().map_or(fallback_line, |p| p.line() as usize);

        if record.len() < 3 {
            dropped.push(TickerError::row_invalid(
                row,
                "need at least 3 columns (runner, lap, lap_time)",
            ));
            continue;
        }
        let number = match record[0].parse::<u32>() {
            Ok(n) if n >= 1 => n,
            Ok(_) => {
                dropped.push(TickerError::row_invalid(row, "runner number must be positive"));
                continue;
            }
            Err(e) => {
                dropped.push(TickerError::row_invalid(row, format!("runner number: {e}")));
                continue;
            }
        };
        let lap = match record[1].parse::<u32>() {
            Ok(l) => l,
            Err(e) => {
                dropped.push(TickerError::row_invalid(row, format!("lap number: {e}")));
                continue;
            }
        };
        let lap_time = record[2].to_string();
        if lap_time.is_empty() {
            dropped.push(TickerError::row_invalid(row, "lap_time is empty"));
            continue;
        }
        let distance = record.get(3).filter(|d| !d.is_empty()).map(str::to_string);

        let candidate = RunnerState { number, lap, lap_time, distance };
        match index_by_number.get(&number) {
            // Greatest lap wins; >= lets the later row take a tie.
            Some(&at) if candidate.lap >= runners[at].lap => runners[at] = candidate,
            Some(_) => {}
            None => {
                index_by_number.insert(number, runners.len());
                runners.push(candidate);
            }
        }
    }

    if rows_seen == 0 {
        return Err(TickerError::parse_error("timing document", "document contains no rows"));
    }
    if runners.is_empty() {
        return Err(TickerError::parse_error(
            "timing document",
            format!("no well-formed rows ({} rejected)", dropped.len()),
        ));
    }

    match display.order {
        RunnerOrder::ByNumber => runners.sort_by_key(|r| r.number),
        RunnerOrder::SourceOrder => {}
    }
    runners.truncate(display.max_runners);

    Ok(Canonicalized { state: RaceState::new(runners, source), dropped })
}
