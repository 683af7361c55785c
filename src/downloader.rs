//! Download orchestration: date range resolution, window planning and
//! sequential fetching into one contiguous series

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::binance::MAX_KLINES_PER_REQUEST;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::planner::plan_windows;
use crate::source::KlineSource;
use crate::storage::{self, Columns};
use crate::types::{Candle, TradingPair};

/// Where the downloaded series should end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Return the candles to the caller
    Memory,
    /// Write a CSV file; `None` picks the default file name
    Csv {
        path: Option<PathBuf>,
        columns: Columns,
    },
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub symbol: String,
    pub interval: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub days: Option<u32>,
    pub target: Target,
}

impl DownloadRequest {
    /// In-memory request for the last `days` days
    pub fn last_days(symbol: impl Into<String>, interval: impl Into<String>, days: u32) -> Self {
        DownloadRequest {
            symbol: symbol.into(),
            interval: interval.into(),
            start: None,
            end: None,
            days: Some(days),
            target: Target::Memory,
        }
    }

    /// In-memory request for an explicit `[start, end]` range
    pub fn between(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        DownloadRequest {
            symbol: symbol.into(),
            interval: interval.into(),
            start: Some(start.into()),
            end: Some(end.into()),
            days: None,
            target: Target::Memory,
        }
    }

    pub fn save_to(mut self, path: Option<PathBuf>, columns: Columns) -> Self {
        self.target = Target::Csv { path, columns };
        self
    }
}

/// Outcome of a download
#[derive(Debug, Clone, PartialEq)]
pub enum Downloaded {
    Series(Vec<Candle>),
    Saved { path: PathBuf, rows: usize },
    /// The target file existed already; nothing was fetched
    AlreadyPresent(PathBuf),
}

/// Resolved `[start, end]` range of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Exactly one of `days` or both `start` and `end` must be given
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let range = match (days, start, end) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(Error::InvalidRange(
                    "use either days or start/end, not both".to_string(),
                ))
            }
            (Some(0), None, None) => {
                return Err(Error::InvalidRange("days must be at least 1".to_string()))
            }
            (Some(days), None, None) => DateRange {
                start: now
                    .checked_sub_signed(ChronoDuration::days(days as i64))
                    .ok_or_else(|| {
                        Error::InvalidRange(format!(
                            "{} days reaches before the earliest date",
                            days
                        ))
                    })?,
                end: now,
            },
            (None, Some(start), Some(end)) => DateRange {
                start: parse_date(start)?,
                end: parse_date(end)?,
            },
            (None, _, _) => {
                return Err(Error::InvalidRange(
                    "start and end are required when days is not given".to_string(),
                ))
            }
        };

        if range.start >= range.end {
            return Err(Error::InvalidRange(format!(
                "start ({}) must be before end ({})",
                range.start.format("%Y-%m-%d %H:%M:%S"),
                range.end.format("%Y-%m-%d %H:%M:%S")
            )));
        }

        Ok(range)
    }
}

/// Parse a date string (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339) as UTC
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let s = date_str.trim();

    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|nd| nd.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| {
            Error::InvalidRange(format!(
                "failed to parse date '{}', use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                date_str
            ))
        })
}

/// Knobs for [`Downloader`]
#[derive(Debug, Clone)]
pub struct DownloaderOptions {
    /// Per-request row cap of the exchange
    pub max_rows_per_request: u32,
    /// Pause between consecutive requests
    pub request_delay: Option<Duration>,
    /// Quote asset appended to bare symbols ("ETH" -> "ETH/USDT")
    pub default_quote: String,
    /// Draw a progress bar over the request windows
    pub show_progress: bool,
}

impl Default for DownloaderOptions {
    fn default() -> Self {
        DownloaderOptions {
            max_rows_per_request: MAX_KLINES_PER_REQUEST,
            request_delay: None,
            default_quote: "USDT".to_string(),
            show_progress: false,
        }
    }
}

/// Fetches a full kline history window by window
pub struct Downloader<S, C = SystemClock> {
    source: S,
    clock: C,
    options: DownloaderOptions,
}

impl<S: KlineSource> Downloader<S, SystemClock> {
    pub fn new(source: S, options: DownloaderOptions) -> Self {
        Downloader {
            source,
            clock: SystemClock,
            options,
        }
    }
}

impl<S: KlineSource, C: Clock> Downloader<S, C> {
    pub fn with_clock(source: S, clock: C, options: DownloaderOptions) -> Self {
        Downloader {
            source,
            clock,
            options,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn check_options(&self) -> Result<()> {
        let rows = self.options.max_rows_per_request;
        if rows == 0 || rows > MAX_KLINES_PER_REQUEST {
            return Err(Error::InvalidParameter(format!(
                "max_rows_per_request must be between 1 and {}, got {}",
                MAX_KLINES_PER_REQUEST, rows
            )));
        }
        Ok(())
    }

    /// Normalise, validate and run a download request
    pub async fn download(&self, request: &DownloadRequest) -> Result<Downloaded> {
        self.check_options()?;
        let pair = TradingPair::parse(&request.symbol, &self.options.default_quote);
        let interval: Interval = request.interval.parse()?;
        let range = DateRange::resolve(
            request.start.as_deref(),
            request.end.as_deref(),
            request.days,
            self.clock.now(),
        )?;

        match &request.target {
            Target::Memory => {
                let candles = self.fetch_series(&pair, interval, range).await?;
                Ok(Downloaded::Series(candles))
            }
            Target::Csv { path, columns } => {
                let path = path.clone().unwrap_or_else(|| {
                    storage::default_file_name(&pair, interval, range.start, range.end)
                });

                if path.exists() {
                    warn!("File already exists: {}, skipping download", path.display());
                    return Ok(Downloaded::AlreadyPresent(path));
                }

                let candles = self.fetch_series(&pair, interval, range).await?;
                storage::save_csv(&path, &candles, *columns)?;
                Ok(Downloaded::Saved {
                    path,
                    rows: candles.len(),
                })
            }
        }
    }

    /// Fetch every window of `range` in order and concatenate the results
    pub async fn fetch_series(
        &self,
        pair: &TradingPair,
        interval: Interval,
        range: DateRange,
    ) -> Result<Vec<Candle>> {
        self.check_options()?;
        let start_ts = interval.align_down(range.start.timestamp());
        let end_ts = range.end.timestamp();
        let windows = plan_windows(
            start_ts,
            end_ts,
            interval.seconds(),
            self.options.max_rows_per_request,
        )?;

        info!(
            "Fetching {} {} from {} to {} in {} requests",
            pair,
            interval,
            range.start.format("%Y-%m-%d %H:%M"),
            range.end.format("%Y-%m-%d %H:%M"),
            windows.len()
        );

        let progress = if self.options.show_progress {
            let pb = ProgressBar::new(windows.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut candles: Vec<Candle> = Vec::new();

        for (i, window) in windows.iter().enumerate() {
            if i > 0 {
                if let Some(delay) = self.options.request_delay {
                    self.clock.sleep(delay).await;
                }
            }

            let batch = self
                .source
                .fetch_window(pair, interval, *window, self.options.max_rows_per_request)
                .await?;
            debug!("Window {} returned {} candles", window, batch.len());

            // Windows never overlap, so open times must keep rising
            for candle in batch {
                if let Some(last) = candles.last() {
                    if candle.open_time <= last.open_time {
                        return Err(Error::MalformedResponse(format!(
                            "window {} returned {} after {}",
                            window,
                            candle.open_time.format("%Y-%m-%d %H:%M:%S"),
                            last.open_time.format("%Y-%m-%d %H:%M:%S")
                        )));
                    }
                }
                candles.push(candle);
            }

            progress.inc(1);
        }

        progress.finish_and_clear();

        if candles.is_empty() {
            return Err(Error::EmptySeries {
                rows: 0,
                required: 1,
            });
        }

        info!(
            "Fetched {} candles for {} {} ({} to {})",
            candles.len(),
            pair,
            interval,
            candles[0].open_time.format("%Y-%m-%d %H:%M"),
            candles[candles.len() - 1].open_time.format("%Y-%m-%d %H:%M")
        );

        Ok(candles)
    }
}
