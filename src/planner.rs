//! Request window planning for paginated kline downloads
//!
//! The kline endpoint returns at most `max_rows` candles per call, so a long
//! date range is split into consecutive windows. Each window is closed on both
//! ends and spans `max_rows - 1` intervals; the next window starts exactly one
//! interval after the previous one ends, so boundary candles are never fetched
//! twice and no candle falls between two windows.

use std::fmt;

use chrono::DateTime;
use serde::Serialize;

use crate::error::{Error, Result};

/// Closed time window `[start, end]` in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// Start in epoch milliseconds, as the exchange expects
    pub fn start_millis(&self) -> i64 {
        self.start * 1000
    }

    /// End in epoch milliseconds, as the exchange expects
    pub fn end_millis(&self) -> i64 {
        self.end * 1000
    }

    /// Number of candle open times this window can contain
    pub fn rows(&self, interval_seconds: i64) -> i64 {
        (self.end - self.start) / interval_seconds + 1
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            DateTime::from_timestamp(self.start, 0),
            DateTime::from_timestamp(self.end, 0),
        ) {
            (Some(s), Some(e)) => write!(
                f,
                "[{} .. {}]",
                s.format("%Y-%m-%d %H:%M:%S"),
                e.format("%Y-%m-%d %H:%M:%S")
            ),
            _ => write!(f, "[{} .. {}]", self.start, self.end),
        }
    }
}

/// Split `[start_ts, end_ts]` into request windows of at most `max_rows` candles
///
/// # Arguments
/// * `start_ts` - Range start (epoch seconds), should sit on the candle grid
/// * `end_ts` - Range end (epoch seconds), inclusive
/// * `interval_seconds` - Candle length
/// * `max_rows` - Per-request row cap of the exchange
pub fn plan_windows(
    start_ts: i64,
    end_ts: i64,
    interval_seconds: i64,
    max_rows: u32,
) -> Result<Vec<TimeWindow>> {
    if start_ts >= end_ts {
        return Err(Error::InvalidRange(format!(
            "start ({}) must be before end ({})",
            start_ts, end_ts
        )));
    }
    if interval_seconds <= 0 {
        return Err(Error::InvalidParameter(format!(
            "interval must be positive, got {}s",
            interval_seconds
        )));
    }
    if max_rows == 0 {
        return Err(Error::InvalidParameter(
            "max rows per request must be positive".to_string(),
        ));
    }

    if end_ts - start_ts <= interval_seconds {
        return Ok(vec![TimeWindow {
            start: start_ts,
            end: end_ts,
        }]);
    }

    let span = (max_rows as i64 - 1) * interval_seconds;
    let mut windows = Vec::new();
    let mut cur_start = start_ts;

    loop {
        let cur_end = end_ts.min(cur_start + span);
        windows.push(TimeWindow {
            start: cur_start,
            end: cur_end,
        });

        if cur_end >= end_ts {
            break;
        }

        cur_start = cur_end + interval_seconds;
        // Unaligned end: the last grid point is already covered
        if cur_start > end_ts {
            break;
        }
    }

    Ok(windows)
}
