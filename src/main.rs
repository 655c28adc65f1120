//! CLI entry point for the rating trends tool.
//!
//! Cleans the joined ratings and item metadata, then reports the best and worst
//! rated items of a month and the items that improved most over the month
//! before.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rating_trends::analyzers::analyzer::analyze_files;
use rating_trends::calendar::parse_reference_date;
use rating_trends::config::AnalysisConfig;
use rating_trends::output::{log_report, print_json, write_json};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rating_trends")]
#[command(about = "Monthly rating rankings and improvements for movie reviews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the month containing a reference date
    Analyze {
        /// Reference date in YYYY-MM-DD format
        #[arg(value_name = "DATE")]
        date: String,

        /// Headerless ratings CSV: reviewerID,asin,overall,unixReviewTime
        #[arg(short, long, default_value = "ratings_Movies_and_TV.csv")]
        ratings: PathBuf,

        /// Item metadata as JSON lines, optionally gzip-compressed
        #[arg(short, long, default_value = "meta_Movies_and_TV.json.gz")]
        metadata: PathBuf,

        /// Optional JSON config file (falls back to RATING_TRENDS_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Optional: write the report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/rating_trends.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rating_trends.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            date,
            ratings,
            metadata,
            config,
            output,
        } => {
            // Argument errors abort before any file is read.
            let date = parse_reference_date(&date)?;
            let config = load_config(config)?;

            let report = analyze_files(&config, &ratings, &metadata, date)?;

            log_report(&report);
            print_json(&report)?;
            if let Some(path) = output {
                write_json(&path, &report)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
        }
    }

    Ok(())
}

/// Resolves the config from `--config`, then `RATING_TRENDS_CONFIG`, then defaults.
fn load_config(path: Option<PathBuf>) -> Result<AnalysisConfig> {
    let path = path.or_else(|| std::env::var_os("RATING_TRENDS_CONFIG").map(PathBuf::from));

    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            AnalysisConfig::load(&path)
                .with_context(|| format!("loading config from {}", path.display()))
        }
        None => Ok(AnalysisConfig::default()),
    }
}
