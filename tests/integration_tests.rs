//! Integration tests for grid-scout
//!
//! These tests verify that download, storage and analysis work together.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Mutex;

use grid_scout::analysis::{analyze, analyze_csv, AnalysisConfig, MacdParams};
use grid_scout::clock::ManualClock;
use grid_scout::downloader::{DownloadRequest, Downloaded, Downloader, DownloaderOptions};
use grid_scout::report::ReportEntry;
use grid_scout::source::KlineSource;
use grid_scout::storage::{self, Columns};
use grid_scout::{Candle, Error, Interval, TimeWindow, TradingPair, TrendBias};

// =============================================================================
// Test Utilities
// =============================================================================

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Generate mock candle data with a constant candle range
fn generate_mock_candles(count: usize, base_price: f64, volatility: f64) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(count);
    let mut price = base_price;

    for i in 0..count {
        let change = if i % 3 == 0 {
            volatility
        } else if i % 3 == 1 {
            -volatility * 0.5
        } else {
            volatility * 0.3
        };

        price += change;
        let high = price + volatility * 0.5;
        let low = price - volatility * 0.5;
        let open = price - change * 0.3;
        let close = price;

        candles.push(
            Candle::new(
                start_time() + Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                1000.0 + (i as f64 * 10.0),
            )
            .unwrap(),
        );
    }

    candles
}

/// Generate trending candle data
fn generate_trending_candles(count: usize, base_price: f64, trend_strength: f64) -> Vec<Candle> {
    let volatility = base_price * 0.02;

    (0..count)
        .map(|i| {
            let price = base_price + (i as f64 * trend_strength);
            Candle::new(
                start_time() + Duration::hours(i as i64),
                price - volatility * 0.5,
                price + volatility,
                price - volatility,
                price + volatility * 0.3,
                1000.0 + (i as f64 * 10.0),
            )
            .unwrap()
        })
        .collect()
}

/// Steady uptrend where every fifth candle spans a much wider range
fn generate_trend_with_wide_candles(count: usize, base_price: f64, step: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = base_price + i as f64 * step;
            let half_range = if i % 5 == 0 { 10.0 } else { 0.1 };
            Candle::new(
                start_time() + Duration::hours(i as i64),
                price,
                price + half_range,
                price - half_range,
                price,
                1000.0,
            )
            .unwrap()
        })
        .collect()
}

/// RAII guard to ensure temp directories are cleaned up even on panic
struct TempDirGuard(std::path::PathBuf);

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn temp_dir(name: &str) -> TempDirGuard {
    let dir = std::env::temp_dir().join(format!("grid_scout_it_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    TempDirGuard(dir)
}

/// Switches the working directory and restores it on drop
struct CwdGuard(std::path::PathBuf);

impl CwdGuard {
    fn enter(dir: &std::path::Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        CwdGuard(previous)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.0);
    }
}

/// In-memory kline source replaying a fixed series
struct ReplaySource {
    candles: Vec<Candle>,
    requests: Mutex<Vec<TimeWindow>>,
}

impl ReplaySource {
    fn new(candles: Vec<Candle>) -> Self {
        ReplaySource {
            candles,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl KlineSource for ReplaySource {
    async fn fetch_window(
        &self,
        _pair: &TradingPair,
        _interval: Interval,
        window: TimeWindow,
        limit: u32,
    ) -> grid_scout::Result<Vec<Candle>> {
        self.requests.lock().unwrap().push(window);
        Ok(self
            .candles
            .iter()
            .filter(|c| {
                let ts = c.open_time.timestamp();
                ts >= window.start && ts <= window.end
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Analysis Tests
// =============================================================================

#[test]
fn test_steady_range_series_gets_grid() {
    let candles = generate_mock_candles(100, 100.0, 2.0);
    let analysis = analyze(&candles, &AnalysisConfig::default());

    assert!(!analysis.is_failed());
    let report = analysis.report.as_ref().unwrap();
    assert!(report.relative_std < 1e-9);
    assert!(analysis.suitable, "report: {:?}", report);

    let plan = analysis.plan.as_ref().unwrap();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let min_close = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max_close = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    assert!((plan.min_price - min_close).abs() < 1e-9);
    assert!((plan.max_price - max_close).abs() < 1e-9);
    assert!(plan.grid_count >= 1 && plan.grid_count <= 99);
    assert_eq!(plan.levels.len() as u32, plan.grid_count + 1);
    assert!(plan.levels.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_trend_with_dispersed_ranges_is_not_suitable() {
    let candles = generate_trend_with_wide_candles(100, 100.0, 2.0);
    // wide ATR band so only the range dispersion can fail
    let config = AnalysisConfig {
        atr_std_multiplier: 10.0,
        ..AnalysisConfig::default()
    };

    let analysis = analyze(&candles, &config);
    assert!(!analysis.is_failed());
    assert!(!analysis.suitable);
    assert!(analysis.plan.is_none());

    let report = analysis.report.unwrap();
    assert!(
        report.relative_std > config.threshold_factor,
        "relative_std: {}",
        report.relative_std
    );
    assert!(report.atr_latest >= report.min_atr_threshold);
    assert!(report.atr_latest <= report.max_atr_threshold);
}

#[test]
fn test_max_grids_respected() {
    let candles = generate_mock_candles(100, 100.0, 2.0);
    let config = AnalysisConfig {
        grid_step_percentage: 0.01,
        max_grids: 20,
        ..AnalysisConfig::default()
    };

    let plan = analyze(&candles, &config).plan.unwrap();
    assert_eq!(plan.grid_count, 20);
    assert_eq!(plan.levels.len(), 21);
}

#[test]
fn test_uptrend_macd_is_bullish() {
    let candles = generate_trending_candles(80, 100.0, 1.5);
    let config = AnalysisConfig::default().with_macd(MacdParams::default());

    let analysis = analyze(&candles, &config);
    let snapshot = analysis.macd.expect("MACD snapshot");
    assert_eq!(snapshot.bias, TrendBias::Bullish);
    assert!(snapshot.histogram > 0.0);
}

#[test]
fn test_insufficient_data_fails_cleanly() {
    let candles = generate_mock_candles(5, 100.0, 1.0);
    let analysis = analyze(&candles, &AnalysisConfig::default());

    assert!(!analysis.suitable);
    assert!(matches!(
        analysis.failure,
        Some(Error::EmptySeries { rows: 5, .. })
    ));
    assert!(analysis.plan.is_none());
}

#[test]
fn test_json_report_shape() {
    let candles = generate_mock_candles(60, 100.0, 2.0);
    let analysis = analyze(&candles, &AnalysisConfig::default());

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["suitable"], serde_json::json!(analysis.suitable));
    assert!(json["report"]["relative_std"].is_number());
    assert!(json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["kind"].is_string()));
    assert!(json.get("failure").is_none());
}

// =============================================================================
// CSV Round Trip Tests
// =============================================================================

#[test]
fn test_analyze_saved_csv_matches_memory() {
    let dir = temp_dir("roundtrip");
    let path = dir.0.join("ETH_USDT_1h.csv");
    let candles = generate_mock_candles(100, 100.0, 2.0);

    storage::save_csv(&path, &candles, Columns::Ohlcv).unwrap();

    let config = AnalysisConfig::default();
    let from_csv = analyze_csv(&path, &config);
    let in_memory = analyze(&candles, &config);

    assert_eq!(from_csv.suitable, in_memory.suitable);
    let a = from_csv.plan.unwrap();
    let b = in_memory.plan.unwrap();
    assert_eq!(a.grid_count, b.grid_count);
    assert!((a.min_price - b.min_price).abs() < 1e-9);
}

#[test]
fn test_csv_missing_columns_fails_before_analysis() {
    let dir = temp_dir("missing");
    let path = dir.0.join("broken.csv");
    std::fs::write(
        &path,
        "open_time,open,close,volume\n2024-01-01 00:00:00,1,1,1\n",
    )
    .unwrap();

    let analysis = analyze_csv(&path, &AnalysisConfig::default());
    assert!(!analysis.suitable);
    assert!(analysis.report.is_none());
    match &analysis.failure {
        Some(Error::MissingColumns(cols)) => assert_eq!(cols, &vec!["high", "low"]),
        other => panic!("expected missing columns, got {:?}", other),
    }
    assert!(matches!(analysis.entries.as_slice(), [ReportEntry::Error(_)]));
}

// =============================================================================
// Download Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_download_then_analyze_in_memory() {
    // 2000 hourly candles starting 2024-01-01
    let series = generate_mock_candles(2000, 100.0, 2.0);
    let end = series[series.len() - 1].open_time;
    let source = ReplaySource::new(series.clone());

    let downloader = Downloader::with_clock(
        source,
        ManualClock::new(end),
        DownloaderOptions::default(),
    );

    let request = DownloadRequest::between(
        "eth/usdt",
        "1h",
        "2024-01-01",
        end.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    let candles = match downloader.download(&request).await.unwrap() {
        Downloaded::Series(c) => c,
        other => panic!("unexpected outcome {:?}", other),
    };

    assert_eq!(candles, series);
    assert_eq!(downloader.source().requests.lock().unwrap().len(), 2);
    // no delay configured
    assert!(downloader.clock().sleeps().is_empty());

    let analysis = analyze(&candles, &AnalysisConfig::default());
    assert!(!analysis.is_failed());
}

#[tokio::test]
async fn test_download_to_default_file_name() {
    let dir = temp_dir("default_name");
    let series = generate_mock_candles(48, 100.0, 2.0);
    let source = ReplaySource::new(series);

    let downloader = Downloader::with_clock(
        source,
        ManualClock::new(start_time() + Duration::days(2)),
        DownloaderOptions {
            request_delay: Some(std::time::Duration::from_millis(100)),
            ..DownloaderOptions::default()
        },
    );

    // no path given: the file lands in the working directory
    let _cwd = CwdGuard::enter(&dir.0);
    let path = std::path::PathBuf::from("ETH_USDT_1h_2024-01-01_2024-01-02.csv");
    let request = DownloadRequest::between("ETH", "1h", "2024-01-01", "2024-01-02")
        .save_to(None, Columns::Full);

    match downloader.download(&request).await.unwrap() {
        Downloaded::Saved { path: saved, rows } => {
            assert_eq!(saved, path);
            assert_eq!(rows, 25);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert!(dir.0.join(&path).exists());
    let loaded = storage::load_csv(&path).unwrap();
    assert_eq!(loaded.len(), 25);
    assert_eq!(loaded[0].open_time, start_time());

    // second run finds the file and fetches nothing
    let before = downloader.source().requests.lock().unwrap().len();
    let again = downloader.download(&request).await.unwrap();
    assert_eq!(again, Downloaded::AlreadyPresent(path));
    assert_eq!(downloader.source().requests.lock().unwrap().len(), before);
}

#[tokio::test]
async fn test_empty_range_is_an_error() {
    let source = ReplaySource::new(Vec::new());
    let downloader = Downloader::with_clock(
        source,
        ManualClock::new(start_time()),
        DownloaderOptions::default(),
    );

    let request = DownloadRequest::between("ETH", "1h", "2024-01-01", "2024-01-02");
    assert!(matches!(
        downloader.download(&request).await,
        Err(Error::EmptySeries { rows: 0, .. })
    ));
}
