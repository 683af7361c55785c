//! Configuration management
//!
//! Optional JSON configuration file; every section and field falls back to
//! its default, and command-line flags override what the file sets.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::AnalysisConfig;
use crate::binance::{DEFAULT_BASE_URL, GLOBAL_BASE_URL, MAX_KLINES_PER_REQUEST};
use crate::downloader::DownloaderOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config
            .analysis
            .validate()
            .context("Invalid analysis section in config")?;

        Ok(config)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Overrides the environment-selected endpoint when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub max_rows_per_request: u32,
    /// Pause between consecutive kline requests
    pub request_delay_ms: u64,
    /// Quote asset appended to bare symbols
    pub default_quote: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            base_url: None,
            max_rows_per_request: MAX_KLINES_PER_REQUEST,
            request_delay_ms: 100,
            default_quote: "USDT".to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Endpoint to use: the configured one, else the global endpoint for
    /// local runs, else the US endpoint
    pub fn resolve_base_url(&self, run_env: Option<&str>) -> String {
        if let Some(url) = &self.base_url {
            return url.clone();
        }
        match run_env {
            Some(env) if env.eq_ignore_ascii_case("local") => GLOBAL_BASE_URL.to_string(),
            _ => DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn downloader_options(&self, show_progress: bool) -> DownloaderOptions {
        DownloaderOptions {
            max_rows_per_request: self.max_rows_per_request.clamp(1, MAX_KLINES_PER_REQUEST),
            request_delay: (self.request_delay_ms > 0)
                .then(|| Duration::from_millis(self.request_delay_ms)),
            default_quote: self.default_quote.clone(),
            show_progress,
        }
    }
}
