use anyhow::{Context, Result};
use clap::Parser;
use hiring_signal::{start_web_server, AppConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "hiring-signal")]
#[command(about = "GitHub activity based hiring recommendations over HTTP")]
struct Cli {
    /// YAML config file with `local` / `production` sections
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides ROCKET_PORT and the config file
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    address: Option<String>,

    /// Write JSON logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hiring_signal=info,rocket=warn"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(file)
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_current_span(true))
                .with(filter)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| std::env::var("LOG_FILE").ok().map(PathBuf::from));
    init_logging(log_file.as_ref())?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(address) = cli.address {
        config.server.address = address;
    }

    info!("Environment: {}", AppConfig::environment());
    info!("Scoring model default: {}", config.openai.default_model);

    start_web_server(config).await
}
