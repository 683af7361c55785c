//! Grid Scout - main entry point
//!
//! This binary provides three subcommands:
//! - download: Download historical klines from Binance to CSV
//! - analyze: Judge whether a market suits a grid strategy
//! - symbols: List tradable Binance symbols

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grid_scout::AppConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-scout")]
#[command(about = "Download Binance klines and check whether a market suits grid trading", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to an optional JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Exchange endpoint (overrides config and RUN_ENV)
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download historical klines to a CSV file
    Download(commands::download::DownloadArgs),

    /// Analyze grid-strategy suitability and recommend grid levels
    Analyze(commands::analyze::AnalyzeArgs),

    /// List symbols currently trading on the exchange
    Symbols {
        /// Only show pairs quoted in this asset
        #[arg(short, long)]
        quote: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep stdout clean for machine-readable output
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Download(_) => ("download", false),
        Commands::Analyze(args) => ("analyze", args.json),
        Commands::Symbols { .. } => ("symbols", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config.exchange.base_url = Some(url);
    }

    // Read once; local runs can reach the global endpoint
    let run_env = std::env::var("RUN_ENV").ok();
    let base_url = config.exchange.resolve_base_url(run_env.as_deref());
    info!("Using exchange endpoint {}", base_url);

    match cli.command {
        Commands::Download(args) => commands::download::run(&config, &base_url, args),
        Commands::Analyze(args) => commands::analyze::run(&config, &base_url, args),
        Commands::Symbols { quote } => commands::symbols::run(&config, &base_url, quote),
    }
}
