//! Kline interval tokens ("15m", "1h", "1d", ...) and their lengths

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Interval tokens accepted by the Binance kline endpoint that map to a fixed
/// number of seconds. Monthly candles ("1M") have no fixed length and are not
/// supported.
pub const SUPPORTED_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
];

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Weekly candles open on Monday; the Unix epoch was a Thursday.
const WEEK_GRID_OFFSET: i64 = 4 * DAY;

/// A validated kline interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    token: &'static str,
    seconds: i64,
}

impl Interval {
    /// Interval token as sent to the exchange
    pub fn as_str(&self) -> &'static str {
        self.token
    }

    /// Length of one candle in seconds
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Length of one candle in milliseconds
    pub fn millis(&self) -> i64 {
        self.seconds * 1000
    }

    /// Floor an epoch-second timestamp onto the candle grid of this interval
    pub fn align_down(&self, ts: i64) -> i64 {
        let offset = if self.seconds == WEEK { WEEK_GRID_OFFSET } else { 0 };
        (ts - offset).div_euclid(self.seconds) * self.seconds + offset
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = SUPPORTED_INTERVALS
            .iter()
            .copied()
            .find(|t| *t == s.trim())
            .ok_or_else(|| Error::UnsupportedInterval(s.to_string()))?;

        let (count, unit) = token.split_at(token.len() - 1);
        let count: i64 = count
            .parse()
            .map_err(|_| Error::UnsupportedInterval(s.to_string()))?;
        let unit_seconds = match unit {
            "m" => MINUTE,
            "h" => HOUR,
            "d" => DAY,
            "w" => WEEK,
            _ => return Err(Error::UnsupportedInterval(s.to_string())),
        };

        Ok(Interval {
            token,
            seconds: count * unit_seconds,
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token)
    }
}
