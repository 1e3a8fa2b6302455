//! metrics-agent - periodic metrics collector
//!
//! Polls the configured HTTP endpoints and the local target process on a
//! fixed interval and appends the samples, in Prometheus text format, to the
//! configured output file. Ctrl+C or SIGTERM drains and flushes before exit.
//!
//! # Usage
//! ```sh
//! RUST_LOG=debug metrics-agent --config config.toml
//! ```
//!
//! # Environment Variables
//! - `METRICS_AGENT_SAMPLE_FREQUENCY` - Override the sampling interval (seconds)
//! - `METRICS_AGENT_OUTPUT_FILE` - Override the output file
//! - `METRICS_AGENT_PROCESS_NAME` - Override the watched process name

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use metrics_agent::application::AgentBuilder;
use metrics_agent::config::Config;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(version, about = "Collects host and endpoint metrics into a file")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

/// `RUST_LOG` directives, defaulting to `info` when none are given.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .parse_lossy(directives)
}

fn init_logging(format: LogFormat) {
    let filter = log_filter(&std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default());

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    info!(
        "Configuration loaded: {} http sources, system source {}, every {}s into {:?}",
        config.http_sources.len(),
        if config.system.enabled {
            config.system.process_name.as_str()
        } else {
            "disabled"
        },
        config.sample_frequency,
        config.target_output_file
    );

    if cli.check {
        println!("{:?}: ok", cli.config);
        return Ok(());
    }

    let agent = AgentBuilder::from_config(config)
        .build()
        .context("Failed to build agent")?;

    info!("metrics-agent {} starting...", env!("CARGO_PKG_VERSION"));
    agent.start().await.context("Agent failed")?;
    info!("Shutdown complete.");

    Ok(())
}
