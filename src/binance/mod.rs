//! Binance API client for downloading historical OHLCV data
//! No API key needed for public market data endpoints.

mod client;
mod types;

pub use client::{BinanceClient, DEFAULT_BASE_URL, GLOBAL_BASE_URL, MAX_KLINES_PER_REQUEST};
pub use types::*;
