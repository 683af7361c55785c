//! Volatility suitability analysis for grid trading
//!
//! A series suits a grid when its per-candle price range is steady
//! (low relative dispersion) and the latest ATR sits inside a band around
//! its own history. Suitable series get a [`GridPlan`], optionally biased
//! by MACD.

use std::path::Path;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::grid::{self, GridPlan, TrendBias};
use crate::indicators;
use crate::report::{PlotSeries, PlotSpec, ReportEntry, TableSpec};
use crate::storage;
use crate::types::Candle;

/// MACD periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        MacdParams {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// Analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Highest acceptable `std / mean` of the candle range
    pub threshold_factor: f64,
    pub atr_period: usize,
    /// Width of the ATR band in standard deviations
    pub atr_std_multiplier: f64,
    /// Grid step as a percentage of the reference price
    pub grid_step_percentage: f64,
    pub max_grids: u32,
    /// Bias the grid range with MACD when set
    pub macd: Option<MacdParams>,
    /// Floor the lower ATR threshold at zero
    pub clamp_min_atr: bool,
    pub include_plots: bool,
    /// Unit used in report messages
    pub price_unit: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            threshold_factor: 1.0,
            atr_period: 14,
            atr_std_multiplier: 1.0,
            grid_step_percentage: 1.0,
            max_grids: 99,
            macd: None,
            clamp_min_atr: false,
            include_plots: false,
            price_unit: "USDT".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// MACD-biased variant with the lower ATR threshold floored at zero
    pub fn with_macd(mut self, params: MacdParams) -> Self {
        self.macd = Some(params);
        self.clamp_min_atr = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold_factor.is_finite() || self.threshold_factor <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "threshold_factor must be positive, got {}",
                self.threshold_factor
            )));
        }
        if self.atr_period == 0 {
            return Err(Error::InvalidParameter(
                "atr_period must be at least 1".to_string(),
            ));
        }
        if !self.atr_std_multiplier.is_finite() || self.atr_std_multiplier < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "atr_std_multiplier must be non-negative, got {}",
                self.atr_std_multiplier
            )));
        }
        if !self.grid_step_percentage.is_finite() || self.grid_step_percentage <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "grid_step_percentage must be positive, got {}",
                self.grid_step_percentage
            )));
        }
        if self.max_grids == 0 {
            return Err(Error::InvalidParameter(
                "max_grids must be at least 1".to_string(),
            ));
        }
        if let Some(m) = &self.macd {
            if m.fast_period == 0 || m.signal_period == 0 || m.fast_period >= m.slow_period {
                return Err(Error::InvalidParameter(format!(
                    "invalid MACD periods {}/{}/{}",
                    m.fast_period, m.slow_period, m.signal_period
                )));
            }
        }
        Ok(())
    }

    /// Rows needed for a defined latest ATR and a sample std-dev of ATR
    pub fn min_rows(&self) -> usize {
        self.atr_period + 1
    }
}

/// Range and ATR statistics behind the verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityReport {
    pub average_range: f64,
    pub std_dev_range: f64,
    pub relative_std: f64,
    pub atr_latest: f64,
    pub atr_mean: f64,
    pub atr_std: f64,
    pub min_atr_threshold: f64,
    pub max_atr_threshold: f64,
    pub suitable: bool,
}

/// Latest MACD values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub bias: TrendBias,
}

/// Result of one analysis run
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub suitable: bool,
    pub report: Option<VolatilityReport>,
    pub macd: Option<MacdSnapshot>,
    pub plan: Option<GridPlan>,
    pub entries: Vec<ReportEntry>,
    #[serde(skip)]
    pub failure: Option<Error>,
}

impl Analysis {
    fn failed(err: Error) -> Self {
        warn!("Analysis failed: {}", err);
        Analysis {
            suitable: false,
            report: None,
            macd: None,
            plan: None,
            entries: vec![ReportEntry::error(err.to_string())],
            failure: Some(err),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Analyze a CSV file written by the downloader (or any file with at least
/// `open_time, high, low, close` columns)
pub fn analyze_csv(path: impl AsRef<Path>, config: &AnalysisConfig) -> Analysis {
    let path = path.as_ref();
    if let Err(e) = storage::check_columns(path) {
        return Analysis::failed(e);
    }

    match storage::load_csv(path) {
        Ok(candles) => analyze(&candles, config),
        Err(e) => Analysis::failed(e),
    }
}

/// Analyze an in-memory series
pub fn analyze(candles: &[Candle], config: &AnalysisConfig) -> Analysis {
    if let Err(e) = config.validate() {
        return Analysis::failed(e);
    }

    let required = config.min_rows();
    if candles.len() < required {
        return Analysis::failed(Error::EmptySeries {
            rows: candles.len(),
            required,
        });
    }

    let unit = config.price_unit.as_str();
    let times: Vec<_> = candles.iter().map(|c| c.open_time).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ranges: Vec<f64> = candles.iter().map(|c| c.range()).collect();

    let mut entries = Vec::new();

    if config.include_plots {
        entries.push(ReportEntry::Plot(PlotSpec {
            title: "Close price".to_string(),
            x_label: "Time".to_string(),
            y_label: format!("Price ({})", unit),
            x: times.clone(),
            series: vec![PlotSeries::dense("close", &closes)],
        }));
    }

    // Candle range dispersion
    let average_range = ranges.iter().mean();
    let std_dev_range = ranges.iter().std_dev();
    entries.push(ReportEntry::info(format!(
        "Average price range: {:.2} {unit}\nPrice range std dev: {:.2} {unit}",
        average_range, std_dev_range
    )));

    // ATR band
    let atr = indicators::atr(&highs, &lows, &closes, config.atr_period);
    let defined_atr: Vec<f64> = atr.iter().flatten().copied().collect();
    let atr_latest = atr.last().copied().flatten().unwrap_or(f64::NAN);
    entries.push(ReportEntry::info(format!(
        "Latest ATR ({}): {:.2} {unit}",
        config.atr_period, atr_latest
    )));

    if config.include_plots {
        entries.push(ReportEntry::Plot(PlotSpec {
            title: format!("Price range and ATR({})", config.atr_period),
            x_label: "Time".to_string(),
            y_label: format!("Value ({})", unit),
            x: times.clone(),
            series: vec![
                PlotSeries::dense("range", &ranges),
                PlotSeries::new(format!("ATR({})", config.atr_period), atr.clone()),
            ],
        }));
    }

    let atr_mean = defined_atr.iter().mean();
    let atr_std = defined_atr.iter().std_dev();
    let mut min_atr = atr_mean - config.atr_std_multiplier * atr_std;
    if config.clamp_min_atr {
        min_atr = min_atr.max(0.0);
    }
    let max_atr = atr_mean + config.atr_std_multiplier * atr_std;
    entries.push(ReportEntry::info(format!(
        "Lower ATR threshold (mean - {m}*std): {:.2} {unit}\nUpper ATR threshold (mean + {m}*std): {:.2} {unit}",
        min_atr,
        max_atr,
        m = config.atr_std_multiplier
    )));

    let relative_std = if average_range != 0.0 {
        std_dev_range / average_range
    } else {
        f64::INFINITY
    };
    entries.push(ReportEntry::info(format!(
        "Relative std dev: {:.2} (threshold factor {})",
        relative_std, config.threshold_factor
    )));

    // NaN anywhere makes every comparison false
    let suitable = relative_std <= config.threshold_factor
        && atr_latest >= min_atr
        && atr_latest <= max_atr;

    debug!(
        "relative_std={:.4} atr_latest={:.4} band=[{:.4}, {:.4}] suitable={}",
        relative_std, atr_latest, min_atr, max_atr, suitable
    );

    let report = VolatilityReport {
        average_range,
        std_dev_range,
        relative_std,
        atr_latest,
        atr_mean,
        atr_std,
        min_atr_threshold: min_atr,
        max_atr_threshold: max_atr,
        suitable,
    };

    let macd = config
        .macd
        .and_then(|params| macd_snapshot(&closes, &times, params, config, &mut entries));

    if !suitable {
        entries.push(ReportEntry::warning(
            "The series is not suitable for a grid strategy.",
        ));
        info!("Series not suitable for grid trading");
        return Analysis {
            suitable,
            report: Some(report),
            macd,
            plan: None,
            entries,
            failure: None,
        };
    }

    entries.push(ReportEntry::success(
        "The series is suitable for a grid strategy.",
    ));

    let plan = grid::recommend(
        &closes,
        suitable,
        config.grid_step_percentage,
        config.max_grids,
        macd.map(|m| m.bias),
    );

    match &plan {
        Some(plan) => {
            push_plan_entries(plan, unit, &mut entries);
            info!(
                "Series suitable: {} grids between {:.2} and {:.2}",
                plan.grid_count, plan.min_price, plan.max_price
            );
        }
        None => {
            entries.push(ReportEntry::warning(
                "Close prices do not span a usable range, no grid recommended.",
            ));
        }
    }

    Analysis {
        suitable,
        report: Some(report),
        macd,
        plan,
        entries,
        failure: None,
    }
}

fn macd_snapshot(
    closes: &[f64],
    times: &[chrono::DateTime<chrono::Utc>],
    params: MacdParams,
    config: &AnalysisConfig,
    entries: &mut Vec<ReportEntry>,
) -> Option<MacdSnapshot> {
    let (line, signal, hist) = indicators::macd(
        closes,
        params.fast_period,
        params.slow_period,
        params.signal_period,
    );

    if config.include_plots {
        entries.push(ReportEntry::Plot(PlotSpec {
            title: format!(
                "MACD({}, {}, {})",
                params.fast_period, params.slow_period, params.signal_period
            ),
            x_label: "Time".to_string(),
            y_label: "Value".to_string(),
            x: times.to_vec(),
            series: vec![
                PlotSeries::new("macd", line.clone()),
                PlotSeries::new("signal", signal.clone()),
                PlotSeries::new("histogram", hist.clone()),
            ],
        }));
    }

    let latest = (
        line.last().copied().flatten(),
        signal.last().copied().flatten(),
        hist.last().copied().flatten(),
    );

    match latest {
        (Some(macd), Some(signal), Some(histogram)) => {
            let bias = TrendBias::from_macd(macd, signal);
            entries.push(ReportEntry::info(format!(
                "MACD: {:.4}, signal: {:.4}, histogram: {:.4} ({} bias)",
                macd, signal, histogram, bias
            )));
            Some(MacdSnapshot {
                macd,
                signal,
                histogram,
                bias,
            })
        }
        _ => {
            entries.push(ReportEntry::warning(format!(
                "Not enough rows for MACD (need {}), using the observed close range.",
                params.slow_period
            )));
            None
        }
    }
}

fn push_plan_entries(plan: &GridPlan, unit: &str, entries: &mut Vec<ReportEntry>) {
    entries.push(ReportEntry::info(format!(
        "Recommended grid range: {:.2} {unit} - {:.2} {unit}",
        plan.min_price, plan.max_price
    )));
    entries.push(ReportEntry::info(format!(
        "Recommended grid count: {}",
        plan.grid_count
    )));
    entries.push(ReportEntry::info(format!(
        "Recommended grid interval: {:.2} {unit}",
        plan.grid_interval
    )));
    entries.push(ReportEntry::Table(TableSpec {
        title: "Grid levels".to_string(),
        columns: vec!["Grid".to_string(), format!("Price ({})", unit)],
        rows: plan
            .levels
            .iter()
            .enumerate()
            .map(|(i, price)| vec![format!("Grid {}", i), format!("{:.2}", price)])
            .collect(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// Closes alternate around 100, every candle spans 10
    fn oscillating_candles(n: usize) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = if i % 2 == 0 { 98.0 } else { 102.0 };
                Candle::new(t0 + Duration::hours(i as i64), 100.0, 105.0, 95.0, close, 10.0)
                    .unwrap()
            })
            .collect()
    }

    /// Ranges grow quadratically, so the latest ATR escapes its band
    fn expanding_candles(n: usize) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let half = 0.5 + 0.05 * (i * i) as f64;
                let mid = 1000.0;
                Candle::new(
                    t0 + Duration::hours(i as i64),
                    mid,
                    mid + half,
                    mid - half,
                    mid,
                    1.0,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = AnalysisConfig::default();
        assert_eq!(config.atr_period, 14);
        assert_eq!(config.max_grids, 99);
        assert!(config.validate().is_ok());

        let bad = AnalysisConfig {
            grid_step_percentage: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidParameter(_))));

        let bad_macd = AnalysisConfig::default().with_macd(MacdParams {
            fast_period: 26,
            slow_period: 12,
            signal_period: 9,
        });
        assert!(bad_macd.validate().is_err());
    }

    #[test]
    fn test_steady_series_is_suitable() {
        let candles = oscillating_candles(100);
        let analysis = analyze(&candles, &AnalysisConfig::default());

        assert!(!analysis.is_failed());
        assert!(analysis.suitable);

        let report = analysis.report.as_ref().unwrap();
        assert_eq!(report.relative_std, 0.0);
        assert!(report.min_atr_threshold <= report.max_atr_threshold);

        let plan = analysis.plan.as_ref().unwrap();
        assert!(plan.grid_count >= 1 && plan.grid_count <= 99);
        assert_eq!(plan.levels.len() as u32, plan.grid_count + 1);
        assert!((plan.min_price - 98.0).abs() < 1e-9);
        assert!((plan.max_price - 102.0).abs() < 1e-9);

        assert!(analysis
            .entries
            .iter()
            .any(|e| matches!(e, ReportEntry::Success(_))));
        assert!(analysis
            .entries
            .iter()
            .any(|e| matches!(e, ReportEntry::Table(t) if t.rows.len() == plan.levels.len())));
    }

    #[test]
    fn test_expanding_volatility_is_not_suitable() {
        let candles = expanding_candles(60);
        let analysis = analyze(&candles, &AnalysisConfig::default());

        assert!(!analysis.is_failed());
        assert!(!analysis.suitable);
        assert!(analysis.plan.is_none());

        let report = analysis.report.unwrap();
        assert!(report.atr_latest > report.max_atr_threshold);
        assert!(analysis
            .entries
            .iter()
            .any(|e| matches!(e, ReportEntry::Warning(_))));
    }

    #[test]
    fn test_zero_range_is_not_suitable() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..30)
            .map(|i| Candle::new(t0 + Duration::hours(i), 100.0, 100.0, 100.0, 100.0, 1.0).unwrap())
            .collect();

        let analysis = analyze(&candles, &AnalysisConfig::default());
        assert!(!analysis.suitable);
        assert!(analysis.report.unwrap().relative_std.is_infinite());
    }

    #[test]
    fn test_short_series_fails() {
        let candles = oscillating_candles(14);
        let analysis = analyze(&candles, &AnalysisConfig::default());

        assert!(analysis.is_failed());
        assert!(!analysis.suitable);
        assert!(matches!(
            analysis.failure,
            Some(Error::EmptySeries {
                rows: 14,
                required: 15
            })
        ));
        assert!(matches!(analysis.entries[0], ReportEntry::Error(_)));
    }

    #[test]
    fn test_clamp_min_atr() {
        let candles = expanding_candles(60);
        let mut config = AnalysisConfig {
            atr_std_multiplier: 1000.0,
            ..AnalysisConfig::default()
        };
        let report = analyze(&candles, &config).report.unwrap();
        assert!(report.min_atr_threshold < 0.0);

        config.clamp_min_atr = true;
        let report = analyze(&candles, &config).report.unwrap();
        assert_eq!(report.min_atr_threshold, 0.0);
    }

    #[test]
    fn test_macd_bias_shapes_grid() {
        let candles = oscillating_candles(100);
        let config = AnalysisConfig::default().with_macd(MacdParams::default());
        let analysis = analyze(&candles, &config);

        assert!(analysis.suitable);
        let snapshot = analysis.macd.unwrap();
        let plan = analysis.plan.unwrap();
        let latest = candles[candles.len() - 1].close;
        let (lo, hi) = snapshot.bias.range_multipliers();
        assert!((plan.min_price - latest * lo).abs() < 1e-9);
        assert!((plan.max_price - latest * hi).abs() < 1e-9);
    }

    #[test]
    fn test_plots_included_on_request() {
        let candles = oscillating_candles(40);
        let config = AnalysisConfig {
            include_plots: true,
            ..AnalysisConfig::default()
        }
        .with_macd(MacdParams::default());

        let analysis = analyze(&candles, &config);
        let plots: Vec<&PlotSpec> = analysis
            .entries
            .iter()
            .filter_map(|e| match e {
                ReportEntry::Plot(p) => Some(p),
                _ => None,
            })
            .collect();

        assert_eq!(plots.len(), 3);
        assert!(plots
            .iter()
            .all(|p| p.series.iter().all(|s| s.values.len() == p.x.len())));
    }
}
