//! Download command - fetch historical klines from Binance into a CSV file

use anyhow::{Context, Result};
use clap::Args;
use grid_scout::downloader::Downloaded;
use grid_scout::storage::Columns;
use grid_scout::AppConfig;
use tracing::info;

use super::{banner, build_downloader, RangeArgs};

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Also save quote volume, trade count and taker-buy volumes
    #[arg(long)]
    pub full: bool,
}

pub fn run(config: &AppConfig, base_url: &str, args: DownloadArgs) -> Result<()> {
    info!("Starting data download from {}", base_url);

    let rt = tokio::runtime::Runtime::new()?;
    let downloader = build_downloader(config, base_url);

    let columns = if args.full { Columns::Full } else { Columns::Ohlcv };
    let request = args.range.csv_request(columns);

    banner("DOWNLOADING HISTORICAL DATA FROM BINANCE");
    println!("  Symbol:     {}", request.symbol);
    println!("  Interval:   {}", request.interval);
    match (&request.start, &request.end, request.days) {
        (Some(start), Some(end), _) => println!("  Range:      {} to {}", start, end),
        (_, _, Some(days)) => println!("  Days:       {}", days),
        _ => {}
    }
    println!("{}\n", "=".repeat(60));

    let outcome = rt
        .block_on(downloader.download(&request))
        .with_context(|| format!("Failed to download {} {}", request.symbol, request.interval))?;

    match outcome {
        Downloaded::Saved { path, rows } => {
            println!("✓ {} candles saved to {}", rows, path.display());
        }
        Downloaded::AlreadyPresent(path) => {
            println!("✓ {} already exists, nothing downloaded", path.display());
        }
        Downloaded::Series(candles) => {
            println!("✓ {} candles downloaded", candles.len());
        }
    }

    Ok(())
}
