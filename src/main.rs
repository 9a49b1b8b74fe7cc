use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gold_ta::config::{self, AppConfig};
use gold_ta::{Analyzer, data};

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("price data error")]
    Data,
    #[display("analysis error")]
    Analysis,
    #[display("output error")]
    Output,
}

#[derive(Parser)]
#[command(name = "gold-ta", about = "Technical analysis report for an OHLCV series")]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OHLCV CSV file with a `time,open,high,low,close,volume` header
    #[arg(short, long)]
    input: PathBuf,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn main() {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(path).change_context(AppError::Config)?,
        None => AppConfig::default(),
    };

    init_tracing(&config);

    let candles = data::load_candles(&cli.input).change_context(AppError::Data)?;
    info!(
        input = %cli.input.display(),
        candles = candles.len(),
        timeframe = %config.general.timeframe,
        "analysing series"
    );

    let analyzer = Analyzer::new(&config).change_context(AppError::Analysis)?;
    let report = analyzer.analyze(&candles).change_context(AppError::Analysis)?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .change_context(AppError::Output)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").change_context(AppError::Output)?;
    Ok(())
}

/// Logs go to stderr; stdout carries only the report.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
