pub mod analyze;
pub mod download;
pub mod symbols;

use clap::Args;
use std::path::PathBuf;

use grid_scout::binance::BinanceClient;
use grid_scout::downloader::{DownloadRequest, Downloader};
use grid_scout::storage::Columns;
use grid_scout::AppConfig;

/// Symbol, interval and date range shared by `download` and `analyze`
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Trading pair, e.g. "ETH" or "ETH/USDT"
    #[arg(short, long)]
    pub symbol: String,

    /// Kline interval, e.g. "15m", "1h", "1d"
    #[arg(short, long, default_value = "15m")]
    pub interval: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long, requires = "end", conflicts_with = "days")]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long, requires = "start", conflicts_with = "days")]
    pub end: Option<String>,

    /// Fetch the most recent N days
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Output CSV path (defaults to SYMBOL_QUOTE_INTERVAL_START_END.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RangeArgs {
    pub fn request(&self) -> DownloadRequest {
        DownloadRequest {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            days: self.days,
            target: grid_scout::downloader::Target::Memory,
        }
    }

    pub fn csv_request(&self, columns: Columns) -> DownloadRequest {
        self.request().save_to(self.output.clone(), columns)
    }
}

pub fn build_downloader(config: &AppConfig, base_url: &str) -> Downloader<BinanceClient> {
    let client = BinanceClient::with_base_url(base_url);
    Downloader::new(client, config.exchange.downloader_options(true))
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}
