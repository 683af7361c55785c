//! Core data types: candles and trading pairs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("open time ({0} ms) is out of range")]
    InvalidTimestamp(i64),
}

/// Trade statistics Binance reports alongside each kline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KlineExtras {
    /// Quote asset volume
    pub value: f64,
    pub trade_cnt: u64,
    /// Taker buy base asset volume
    pub active_buy_volume: f64,
    /// Taker buy quote asset volume
    pub active_buy_value: f64,
}

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<KlineExtras>,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self::new_unchecked(open_time, open, high, low, close, volume);
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted sources or when validation is done separately)
    pub fn new_unchecked(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            extras: None,
        }
    }

    pub fn with_extras(mut self, extras: KlineExtras) -> Self {
        self.extras = Some(extras);
        self
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// High-low range of the candle
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Trading pair such as `ETH/USDT`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    /// Normalise user input: upper-case, and append `default_quote` when no
    /// `/` separator is present ("eth" -> "ETH/USDT").
    pub fn parse(symbol: &str, default_quote: &str) -> Self {
        let symbol = symbol.trim().to_uppercase();
        match symbol.split_once('/') {
            Some((base, quote)) => TradingPair {
                base: base.trim().to_string(),
                quote: quote.trim().to_string(),
            },
            None => TradingPair {
                base: symbol,
                quote: default_quote.trim().to_uppercase(),
            },
        }
    }

    /// Symbol as the exchange expects it ("ETHUSDT")
    pub fn api_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// File-name friendly form ("ETH_USDT")
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.base, self.quote)
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
