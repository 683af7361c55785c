//! Grid-trading range and level recommendation
//!
//! Turns a close-price series into a price range split into evenly spaced
//! grid levels. Without a trend bias the range is the observed close range;
//! with one it is an asymmetric band around the latest close.

use serde::Serialize;

/// Direction suggested by MACD: line above signal is bullish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendBias {
    Bullish,
    Bearish,
}

impl TrendBias {
    pub fn from_macd(macd: f64, signal: f64) -> Self {
        if macd > signal {
            TrendBias::Bullish
        } else {
            TrendBias::Bearish
        }
    }

    /// Multipliers applied to the latest close for the (lower, upper) bound
    pub fn range_multipliers(&self) -> (f64, f64) {
        match self {
            TrendBias::Bullish => (0.85, 1.30),
            TrendBias::Bearish => (0.70, 1.15),
        }
    }
}

impl std::fmt::Display for TrendBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendBias::Bullish => write!(f, "bullish"),
            TrendBias::Bearish => write!(f, "bearish"),
        }
    }
}

/// Recommended grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPlan {
    pub min_price: f64,
    pub max_price: f64,
    pub grid_count: u32,
    pub grid_interval: f64,
    /// `grid_count + 1` prices from `min_price` to `max_price`
    pub levels: Vec<f64>,
}

/// Recommend a grid for `closes`
///
/// Returns `None` when the series was judged unsuitable or the input
/// cannot produce a positive price range.
pub fn recommend(
    closes: &[f64],
    suitable: bool,
    grid_step_percentage: f64,
    max_grids: u32,
    bias: Option<TrendBias>,
) -> Option<GridPlan> {
    if !suitable || closes.is_empty() {
        return None;
    }

    let (min_price, max_price, reference) = match bias {
        Some(bias) => {
            let latest = *closes.last()?;
            let (lo, hi) = bias.range_multipliers();
            (latest * lo, latest * hi, latest)
        }
        None => {
            let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
            let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (min, max, min)
        }
    };

    let range = max_price - min_price;
    if !range.is_finite() || range <= 0.0 || reference.is_nan() || reference <= 0.0 {
        return None;
    }

    let step = reference * grid_step_percentage / 100.0;
    if !step.is_finite() || step <= 0.0 {
        return None;
    }

    let grid_count = ((range / step).floor() as u32).clamp(1, max_grids.max(1));
    let grid_interval = range / grid_count as f64;

    let mut levels: Vec<f64> = (0..grid_count)
        .map(|i| min_price + i as f64 * grid_interval)
        .collect();
    levels.push(max_price);

    Some(GridPlan {
        min_price,
        max_price,
        grid_count,
        grid_interval,
        levels,
    })
}
