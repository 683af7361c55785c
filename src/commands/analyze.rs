//! Analyze command - download (or load) a series and report whether it
//! suits a grid strategy

use anyhow::{anyhow, Context, Result};
use clap::Args;
use grid_scout::analysis::{analyze, analyze_csv, Analysis, AnalysisConfig};
use grid_scout::downloader::Downloaded;
use grid_scout::report::{PlotSpec, ReportEntry, TableSpec};
use grid_scout::storage::Columns;
use grid_scout::AppConfig;
use std::path::PathBuf;
use tracing::info;

use super::{banner, build_downloader, RangeArgs};

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Analyze in memory without saving a CSV file
    #[arg(short = 'm', long)]
    pub in_memory: bool,

    /// Highest acceptable relative std-dev of the candle range
    #[arg(short = 't', long)]
    pub threshold_factor: Option<f64>,

    /// Grid step as a percentage of the reference price
    #[arg(short = 'g', long)]
    pub grid_step_percentage: Option<f64>,

    /// Maximum number of grids
    #[arg(short = 'x', long)]
    pub max_grids: Option<u32>,

    /// Width of the ATR band in standard deviations
    #[arg(short = 'a', long)]
    pub atr_std_multiplier: Option<f64>,

    /// ATR period
    #[arg(long)]
    pub atr_period: Option<usize>,

    /// Bias the grid range with MACD (12/26/9 unless configured)
    #[arg(long)]
    pub macd: bool,

    /// Floor the lower ATR threshold at zero
    #[arg(long)]
    pub clamp_min_atr: bool,

    /// Include chart data in the report
    #[arg(long)]
    pub plots: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Analyze an existing CSV file instead of downloading
    #[arg(long, conflicts_with = "in_memory")]
    pub csv: Option<PathBuf>,
}

impl AnalyzeArgs {
    /// Config-file values overridden by flags
    fn analysis_config(&self, base: &AnalysisConfig) -> Result<AnalysisConfig> {
        let mut cfg = base.clone();
        if let Some(v) = self.threshold_factor {
            cfg.threshold_factor = v;
        }
        if let Some(v) = self.grid_step_percentage {
            cfg.grid_step_percentage = v;
        }
        if let Some(v) = self.max_grids {
            cfg.max_grids = v;
        }
        if let Some(v) = self.atr_std_multiplier {
            cfg.atr_std_multiplier = v;
        }
        if let Some(v) = self.atr_period {
            cfg.atr_period = v;
        }
        if self.macd {
            let params = cfg.macd.unwrap_or_default();
            cfg = cfg.with_macd(params);
        }
        if self.clamp_min_atr {
            cfg.clamp_min_atr = true;
        }
        if self.plots {
            cfg.include_plots = true;
        }
        cfg.validate().context("Invalid analysis parameters")?;
        Ok(cfg)
    }
}

pub fn run(config: &AppConfig, base_url: &str, args: AnalyzeArgs) -> Result<()> {
    let analysis_config = args.analysis_config(&config.analysis)?;

    let analysis = match &args.csv {
        Some(path) => {
            info!("Analyzing {}", path.display());
            analyze_csv(path, &analysis_config)
        }
        None => {
            let rt = tokio::runtime::Runtime::new()?;
            let downloader = build_downloader(config, base_url);

            let request = if args.in_memory {
                args.range.request()
            } else {
                args.range.csv_request(Columns::Ohlcv)
            };

            let outcome = rt
                .block_on(downloader.download(&request))
                .with_context(|| {
                    format!("Failed to download {} {}", request.symbol, request.interval)
                })?;

            match outcome {
                Downloaded::Series(candles) => analyze(&candles, &analysis_config),
                Downloaded::Saved { path, .. } | Downloaded::AlreadyPresent(path) => {
                    info!("Analyzing {}", path.display());
                    analyze_csv(&path, &analysis_config)
                }
            }
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        render(&analysis, &args.range.symbol);
    }

    match analysis.failure {
        Some(e) => Err(anyhow!(e).context("Analysis failed")),
        None => Ok(()),
    }
}

/// Print the report entries for a terminal
fn render(analysis: &Analysis, symbol: &str) {
    banner(&format!("GRID STRATEGY ANALYSIS: {}", symbol.to_uppercase()));

    for entry in &analysis.entries {
        match entry {
            ReportEntry::Info(msg) => println!("{}", msg),
            ReportEntry::Warning(msg) => println!("⚠ {}", msg),
            ReportEntry::Success(msg) => println!("✓ {}", msg),
            ReportEntry::Error(msg) => println!("✗ {}", msg),
            ReportEntry::Plot(plot) => render_plot(plot),
            ReportEntry::Table(table) => render_table(table),
        }
    }

    println!("{}", "=".repeat(60));
    if analysis.is_failed() {
        return;
    }
    if analysis.suitable {
        println!("Grid trading is worth considering for this market.");
    } else {
        println!("Grid trading is not recommended for this market.");
    }
}

fn render_plot(plot: &PlotSpec) {
    let labels: Vec<&str> = plot.series.iter().map(|s| s.label.as_str()).collect();
    println!(
        "[chart] {} ({} points: {})",
        plot.title,
        plot.x.len(),
        labels.join(", ")
    );
}

fn render_table(table: &TableSpec) {
    println!("{}:", table.title);

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:>width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("  {}", format_row(&table.columns));
    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    println!("  {}", "-".repeat(rule_width));
    for row in &table.rows {
        println!("  {}", format_row(row));
    }
}
