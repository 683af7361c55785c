//! CSV persistence for candle series
//!
//! File layout: header `open_time,open,high,low,close,volume` optionally
//! followed by `value,trade_cnt,active_buy_volume,active_buy_value`;
//! `open_time` is written as `YYYY-MM-DD HH:MM:SS` (UTC).

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::types::{Candle, KlineExtras, TradingPair};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const OHLCV_HEADER: [&str; 6] = ["open_time", "open", "high", "low", "close", "volume"];
const EXTRA_HEADER: [&str; 4] = ["value", "trade_cnt", "active_buy_volume", "active_buy_value"];

/// Columns the analyzer cannot work without
pub const REQUIRED_COLUMNS: [&str; 4] = ["open_time", "high", "low", "close"];

/// Which columns to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Columns {
    /// open_time, open, high, low, close, volume
    #[default]
    Ohlcv,
    /// OHLCV plus quote volume, trade count and taker-buy volumes
    Full,
}

/// Default file name: `ETH_USDT_15m_2024-01-01_2024-02-01.csv`
pub fn default_file_name(
    pair: &TradingPair,
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> PathBuf {
    PathBuf::from(format!(
        "{}_{}_{}_{}.csv",
        pair.file_stem(),
        interval,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    ))
}

/// Write candles to `path`, replacing any existing file
pub fn save_csv(path: impl AsRef<Path>, candles: &[Candle], columns: Columns) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = OHLCV_HEADER.to_vec();
    if columns == Columns::Full {
        header.extend(EXTRA_HEADER);
    }
    writer.write_record(&header)?;

    for candle in candles {
        let mut record = vec![
            candle.open_time.format(DATETIME_FORMAT).to_string(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
        ];
        if columns == Columns::Full {
            match candle.extras {
                Some(x) => record.extend([
                    x.value.to_string(),
                    x.trade_cnt.to_string(),
                    x.active_buy_volume.to_string(),
                    x.active_buy_value.to_string(),
                ]),
                None => record.extend(std::iter::repeat(String::new()).take(EXTRA_HEADER.len())),
            }
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!("Saved {} rows to {}", candles.len(), path.display());
    Ok(())
}

/// Parse a CSV timestamp: `YYYY-MM-DD HH:MM:SS`, RFC 3339, or epoch milliseconds
fn parse_open_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Some(ndt.and_utc());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc());
    }
    s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

/// Column positions resolved from the header row
struct Layout {
    open_time: usize,
    high: usize,
    low: usize,
    close: usize,
    open: Option<usize>,
    volume: Option<usize>,
    extras: Option<[usize; 4]>,
}

impl Layout {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        // Files written by older tooling name the timestamp column "datetime"
        let open_time = find("open_time").or_else(|| find("datetime"));

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| match **name {
                "open_time" => open_time.is_none(),
                other => find(other).is_none(),
            })
            .map(|name| name.to_string())
            .collect();

        match (open_time, find("high"), find("low"), find("close")) {
            (Some(open_time), Some(high), Some(low), Some(close)) => {
                let extras = match EXTRA_HEADER.map(find) {
                    [Some(a), Some(b), Some(c), Some(d)] => Some([a, b, c, d]),
                    _ => None,
                };
                Ok(Layout {
                    open_time,
                    high,
                    low,
                    close,
                    open: find("open"),
                    volume: find("volume"),
                    extras,
                })
            }
            _ => Err(Error::MissingColumns(missing)),
        }
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str, row: usize) -> Result<&'a str> {
    record.get(idx).ok_or_else(|| Error::InvalidRecord {
        row,
        reason: format!("missing {} field", name),
    })
}

fn number(record: &csv::StringRecord, idx: usize, name: &str, row: usize) -> Result<f64> {
    let raw = field(record, idx, name, row)?;
    raw.trim().parse().map_err(|_| Error::InvalidRecord {
        row,
        reason: format!("cannot parse {} '{}'", name, raw),
    })
}

/// Check that a CSV file has the columns analysis needs, without reading rows
pub fn check_columns(path: impl AsRef<Path>) -> Result<()> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    Layout::from_header(reader.headers()?).map(|_| ())
}

/// Load candles from a CSV file with validation
///
/// Rows failing candle validation are skipped with a warning. Missing `open`
/// or `volume` columns are tolerated (filled with `close` and `0.0`).
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let layout = Layout::from_header(reader.headers()?)?;

    let mut candles = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        // 1-indexed, plus the header row
        let row = row_idx + 2;

        let raw_time = field(&record, layout.open_time, "open_time", row)?;
        let open_time = parse_open_time(raw_time).ok_or_else(|| Error::InvalidRecord {
            row,
            reason: format!("cannot parse open_time '{}'", raw_time),
        })?;

        let high = number(&record, layout.high, "high", row)?;
        let low = number(&record, layout.low, "low", row)?;
        let close = number(&record, layout.close, "close", row)?;
        let open = match layout.open {
            Some(idx) => number(&record, idx, "open", row)?,
            None => close,
        };
        let volume = match layout.volume {
            Some(idx) => number(&record, idx, "volume", row)?,
            None => 0.0,
        };

        let extras = layout.extras.and_then(|[v, t, bv, bq]| {
            Some(KlineExtras {
                value: record.get(v)?.trim().parse().ok()?,
                trade_cnt: record.get(t)?.trim().parse::<f64>().ok()? as u64,
                active_buy_volume: record.get(bv)?.trim().parse().ok()?,
                active_buy_value: record.get(bq)?.trim().parse().ok()?,
            })
        });

        match Candle::new(open_time, open, high, low, close, volume) {
            Ok(candle) => candles.push(Candle { extras, ..candle }),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid candle at row {} in {:?}: {}",
                    row,
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid candles out of {} in {:?}",
            invalid_count,
            invalid_count + candles.len(),
            path.file_name().unwrap_or_default()
        );
    }

    info!("Loaded {} candles from {}", candles.len(), path.display());
    Ok(candles)
}
