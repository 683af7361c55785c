//! Technical indicators powered by the `ta` crate
//!
//! Series-in, series-out wrappers: every function returns one value per
//! input row, with `None` during the indicator's warm-up.

use ta::indicators::{MovingAverageConvergenceDivergence, SimpleMovingAverage};
use ta::Next;

/// Type alias for band indicators (macd, signal, histogram)
pub type BandOutput = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>);

// =============================================================================
// Moving Averages
// =============================================================================

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let sma_val = indicator.next(value);
            (i + 1 >= period).then_some(sma_val)
        })
        .collect()
}

// =============================================================================
// Volatility
// =============================================================================

/// Calculate True Range
///
/// The first row has no previous close and falls back to `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let len = high.len().min(low.len()).min(close.len());
    let mut result = Vec::with_capacity(len);

    for i in 0..len {
        let hl = high[i] - low[i];
        if i == 0 {
            result.push(hl);
        } else {
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            result.push(hl.max(hc).max(lc));
        }
    }

    result
}

/// Average True Range as a simple rolling mean of the true range
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    sma(&true_range(high, low, close), period)
}

// =============================================================================
// Momentum
// =============================================================================

/// Calculate MACD (line, signal, histogram)
///
/// Values before `slow_period` rows are `None`.
pub fn macd(
    values: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> BandOutput {
    if values.is_empty() {
        return (vec![], vec![], vec![]);
    }

    let mut indicator =
        match MovingAverageConvergenceDivergence::new(fast_period, slow_period, signal_period) {
            Ok(i) => i,
            Err(_) => {
                return (
                    vec![None; values.len()],
                    vec![None; values.len()],
                    vec![None; values.len()],
                )
            }
        };

    let warmup = slow_period;
    let mut macd_line = Vec::with_capacity(values.len());
    let mut signal_line = Vec::with_capacity(values.len());
    let mut histogram = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let macd_out = indicator.next(value);
        if i + 1 >= warmup {
            macd_line.push(Some(macd_out.macd));
            signal_line.push(Some(macd_out.signal));
            histogram.push(Some(macd_out.histogram));
        } else {
            macd_line.push(None);
            signal_line.push(None);
            histogram.push(None);
        }
    }

    (macd_line, signal_line, histogram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result.len(), 5);
        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_relative_eq!(result[2].unwrap(), 2.0, epsilon = 1e-10);
        assert_relative_eq!(result[3].unwrap(), 3.0, epsilon = 1e-10);
        assert_relative_eq!(result[4].unwrap(), 4.0, epsilon = 1e-10);
    }

    #[test]
    fn test_true_range() {
        let high = vec![105.0, 110.0, 104.0];
        let low = vec![95.0, 104.0, 98.0];
        let close = vec![100.0, 108.0, 100.0];

        let tr = true_range(&high, &low, &close);
        assert_relative_eq!(tr[0], 10.0);
        // gap up: high - prev close
        assert_relative_eq!(tr[1], 10.0);
        // gap down: prev close - low
        assert_relative_eq!(tr[2], 10.0);
    }

    #[test]
    fn test_atr() {
        let high = vec![102.0, 103.0, 104.0, 103.0, 105.0];
        let low = vec![100.0, 101.0, 102.0, 101.0, 103.0];
        let close = vec![101.0, 102.0, 103.0, 102.0, 104.0];

        let result = atr(&high, &low, &close, 3);
        assert_eq!(result.len(), 5);
        assert!(result[1].is_none());
        // every true range is 2.0 except row 4 (|105 - 102| = 3)
        assert_relative_eq!(result[2].unwrap(), 2.0, epsilon = 1e-10);
        assert_relative_eq!(result[4].unwrap(), 7.0 / 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_macd() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let (macd_line, signal, hist) = macd(&values, 12, 26, 9);

        assert_eq!(macd_line.len(), 50);
        assert!(macd_line[24].is_none());
        assert!(macd_line[25].is_some());
        // rising series: fast EMA above slow EMA
        assert!(macd_line[49].unwrap() > 0.0);
        assert_relative_eq!(
            hist[49].unwrap(),
            macd_line[49].unwrap() - signal[49].unwrap(),
            epsilon = 1e-10
        );
    }
}
