//! Binance API types for klines (candlestick) data and exchange info

use chrono::DateTime;
use serde::Deserialize;

use crate::types::{Candle, CandleValidationError, KlineExtras, TradingPair};

/// Binance kline/candlestick data
/// API returns an array: [open_time, open, high, low, close, volume, close_time,
///                        quote_volume, trades, taker_buy_base, taker_buy_quote, ignore]
#[derive(Debug, Clone, PartialEq)]
pub struct BinanceKline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    pub trades: u64,
    pub taker_buy_base: f64,
    pub taker_buy_quote: f64,
}

/// Binance sends decimals as strings; accept plain numbers as well
fn as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

fn as_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.as_i64(),
    }
}

impl BinanceKline {
    /// Parse from raw JSON array returned by Binance API
    pub fn from_raw(raw: &[serde_json::Value]) -> Option<Self> {
        if raw.len() < 11 {
            return None;
        }

        Some(BinanceKline {
            open_time: as_i64(&raw[0])?,
            open: as_f64(&raw[1])?,
            high: as_f64(&raw[2])?,
            low: as_f64(&raw[3])?,
            close: as_f64(&raw[4])?,
            volume: as_f64(&raw[5])?,
            close_time: as_i64(&raw[6])?,
            quote_volume: as_f64(&raw[7])?,
            trades: u64::try_from(as_i64(&raw[8])?).ok()?,
            taker_buy_base: as_f64(&raw[9])?,
            taker_buy_quote: as_f64(&raw[10])?,
        })
    }
}

/// Convert from Binance kline to internal Candle type with validation
impl TryFrom<BinanceKline> for Candle {
    type Error = CandleValidationError;

    fn try_from(k: BinanceKline) -> Result<Self, Self::Error> {
        let open_time = DateTime::from_timestamp_millis(k.open_time)
            .ok_or(CandleValidationError::InvalidTimestamp(k.open_time))?;

        let candle = Candle::new(open_time, k.open, k.high, k.low, k.close, k.volume)?;
        Ok(candle.with_extras(KlineExtras {
            value: k.quote_volume,
            trade_cnt: k.trades,
            active_buy_volume: k.taker_buy_base,
            active_buy_value: k.taker_buy_quote,
        }))
    }
}

/// `GET /api/v3/exchangeInfo` response (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

impl SymbolInfo {
    pub fn is_trading(&self) -> bool {
        self.status == "TRADING"
    }

    pub fn pair(&self) -> TradingPair {
        TradingPair {
            base: self.base_asset.to_uppercase(),
            quote: self.quote_asset.to_uppercase(),
        }
    }
}
