//! CLI entry point for the EV fleet telemetry ETL.
//!
//! Provides subcommands for generating synthetic telemetry batches and for
//! running the CSV -> SQLite ETL with feature engineering.

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use ev_fleet_etl::generator::TelemetryGenerator;
use ev_fleet_etl::pipeline::Pipeline;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ev_fleet_etl")]
#[command(about = "Batch ETL with feature engineering for EV fleet telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic telemetry CSV
    Generate {
        /// CSV file to write
        #[arg(short, long, default_value = "data/raw.csv")]
        output: String,

        /// Vehicle IDs, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "EV001,EV002")]
        entities: Vec<String>,

        /// Time steps to generate (one row per vehicle per step)
        #[arg(short = 'n', long, default_value_t = 1200)]
        rows: usize,

        /// Sampling rate in Hz
        #[arg(short = 'r', long, default_value_t = 5.0)]
        sample_rate: f64,

        /// RNG seed; the same seed reproduces the same batch
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Optional fixed start instant (e.g. 2024-05-01T00:00:00); defaults to now
        #[arg(long)]
        start: Option<NaiveDateTime>,
    },
    /// Run the ETL over an input CSV batch
    Run {
        /// Input CSV batch
        #[arg(value_name = "CSV")]
        input: String,

        /// SQLite database file to write
        #[arg(short, long, default_value = "data/ev_telemetry.db")]
        db: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ev_fleet_etl.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ev_fleet_etl.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            entities,
            rows,
            sample_rate,
            seed,
            start,
        } => {
            let mut generator = TelemetryGenerator::new(entities, sample_rate, seed);
            let written = generator.to_csv(Path::new(&output), rows, start)?;
            info!(output = %output, rows = written, "Synthetic batch generated");
        }
        Commands::Run { input, db } => {
            let pipeline = Pipeline::new(&db);
            let (raw_rows, feature_rows) = pipeline.run(Path::new(&input))?;
            info!(raw_rows, feature_rows, db = %db, "Pipeline finished");
        }
    }

    Ok(())
}
