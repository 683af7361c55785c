//! Grid Scout
//!
//! Downloads historical klines from Binance and judges whether a market's
//! recent volatility suits a grid-trading strategy, recommending a price
//! range and grid levels when it does.
//!
//! # Example
//! ```no_run
//! use grid_scout::binance::{BinanceClient, DEFAULT_BASE_URL};
//! use grid_scout::downloader::{DownloadRequest, Downloaded, Downloader, DownloaderOptions};
//! use grid_scout::analysis::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BinanceClient::with_base_url(DEFAULT_BASE_URL);
//!     let downloader = Downloader::new(client, DownloaderOptions::default());
//!
//!     let request = DownloadRequest::last_days("ETH", "15m", 30);
//!     if let Downloaded::Series(candles) = downloader.download(&request).await? {
//!         let analysis = analyze(&candles, &AnalysisConfig::default());
//!         println!("suitable: {}", analysis.suitable);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod binance;
pub mod clock;
pub mod config;
pub mod downloader;
pub mod error;
pub mod grid;
pub mod indicators;
pub mod interval;
pub mod planner;
pub mod report;
pub mod source;
pub mod storage;
pub mod types;

pub use analysis::{analyze, analyze_csv, Analysis, AnalysisConfig, MacdParams};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use grid::{GridPlan, TrendBias};
pub use interval::Interval;
pub use planner::{plan_windows, TimeWindow};
pub use report::ReportEntry;
pub use types::*;
