//! Symbols command - list pairs currently trading on the exchange

use anyhow::{Context, Result};
use grid_scout::binance::BinanceClient;
use grid_scout::AppConfig;
use tracing::info;

use super::banner;

pub fn run(config: &AppConfig, base_url: &str, quote: Option<String>) -> Result<()> {
    let quote = quote
        .unwrap_or_else(|| config.exchange.default_quote.clone())
        .to_uppercase();

    let rt = tokio::runtime::Runtime::new()?;
    let client = BinanceClient::with_base_url(base_url);

    let pairs = rt
        .block_on(client.trading_symbols())
        .context("Failed to fetch exchange info")?;
    info!("Exchange lists {} trading pairs", pairs.len());

    let mut matching: Vec<String> = pairs
        .iter()
        .filter(|p| p.quote == quote)
        .map(|p| p.to_string())
        .collect();
    matching.sort();

    banner(&format!("{} PAIRS TRADING ON {}", quote, base_url));
    for pair in &matching {
        println!("  {}", pair);
    }
    println!("{}", "=".repeat(60));
    println!("{} pairs", matching.len());

    Ok(())
}
