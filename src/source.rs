//! Kline source abstraction used by the downloader

use std::future::Future;

use crate::error::Result;
use crate::interval::Interval;
use crate::planner::TimeWindow;
use crate::types::{Candle, TradingPair};

/// Something that can return the candles of one request window.
///
/// Implementations perform exactly one request per call and return the
/// candles whose open time lies inside `window`, oldest first. An empty
/// vector is a valid answer (no trading in that window).
pub trait KlineSource {
    fn fetch_window(
        &self,
        pair: &TradingPair,
        interval: Interval,
        window: TimeWindow,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Candle>>> + Send;
}
