//! Binance API client for fetching historical kline (candlestick) data
//!
//! No API key required for public market data endpoints.
//!
//! # Example
//! ```no_run
//! use grid_scout::binance::{BinanceClient, DEFAULT_BASE_URL};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BinanceClient::with_base_url(DEFAULT_BASE_URL);
//!     let klines = client.get_klines("BTCUSDT", "1h", None, None, Some(100)).await?;
//!     println!("Fetched {} klines", klines.len());
//!     Ok(())
//! }
//! ```

use reqwest::Client;
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

use super::types::{BinanceKline, ExchangeInfo};
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::planner::TimeWindow;
use crate::source::KlineSource;
use crate::types::{Candle, TradingPair};

/// Public endpoint reachable from the US
pub const DEFAULT_BASE_URL: &str = "https://api.binance.us";

/// Global endpoint, used when running locally (`RUN_ENV=local`)
pub const GLOBAL_BASE_URL: &str = "https://api.binance.com";

/// Maximum klines per request (Binance limit)
pub const MAX_KLINES_PER_REQUEST: u32 = 1000;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Binance API client
#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a client talking to `base_url` (scheme and host, no path)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        BinanceClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch klines (candlestick) data from Binance
    ///
    /// # Arguments
    /// * `symbol` - Binance trading pair (e.g., "BTCUSDT")
    /// * `interval` - Timeframe (e.g., "1h", "4h", "1d")
    /// * `start_time` - Optional start time in milliseconds
    /// * `end_time` - Optional end time in milliseconds
    /// * `limit` - Optional number of klines to fetch (max 1000)
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time: Option<i64>,
        end_time: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<BinanceKline>> {
        let url = format!("{}/api/v3/klines", self.base_url);

        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
        ];

        if let Some(start) = start_time {
            params.push(("startTime", start.to_string()));
        }

        if let Some(end) = end_time {
            params.push(("endTime", end.to_string()));
        }

        let limit = limit
            .unwrap_or(MAX_KLINES_PER_REQUEST)
            .min(MAX_KLINES_PER_REQUEST);
        params.push(("limit", limit.to_string()));

        debug!(
            "Fetching klines: symbol={}, interval={}, start={:?}, end={:?}, limit={}",
            symbol, interval, start_time, end_time, limit
        );

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::fetch(None, format!("failed to send request to Binance: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::fetch(
                None,
                format!("Binance API error {}: {}", status, body),
            ));
        }

        let raw_data: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("klines: {}", e)))?;

        raw_data
            .iter()
            .enumerate()
            .map(|(i, row)| {
                BinanceKline::from_raw(row).ok_or_else(|| {
                    Error::MalformedResponse(format!("kline row {} has an unexpected shape", i))
                })
            })
            .collect()
    }

    /// Symbols currently open for trading, as `BASE/QUOTE` pairs
    pub async fn trading_symbols(&self) -> Result<Vec<TradingPair>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::fetch(None, format!("failed to fetch exchange info: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::fetch(
                None,
                format!("Binance API error {}: {}", status, body),
            ));
        }

        let info: ExchangeInfo = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("exchange info: {}", e)))?;

        Ok(info
            .symbols
            .iter()
            .filter(|s| s.is_trading())
            .map(|s| s.pair())
            .collect())
    }
}

impl KlineSource for BinanceClient {
    async fn fetch_window(
        &self,
        pair: &TradingPair,
        interval: Interval,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let symbol = pair.api_symbol();
        let klines = self
            .get_klines(
                &symbol,
                interval.as_str(),
                Some(window.start_millis()),
                Some(window.end_millis()),
                Some(limit),
            )
            .await
            .map_err(|e| e.for_window(window))?;

        let mut candles = Vec::with_capacity(klines.len());
        let mut invalid_count = 0;

        for kline in klines {
            match Candle::try_from(kline) {
                Ok(candle) => candles.push(candle),
                Err(e) => {
                    invalid_count += 1;
                    warn!("Skipping invalid candle for {}: {}", pair, e);
                }
            }
        }

        if invalid_count > 0 {
            warn!(
                "Skipped {} invalid candles out of {} for {} in window {}",
                invalid_count,
                invalid_count + candles.len(),
                pair,
                window
            );
        }

        Ok(candles)
    }
}
