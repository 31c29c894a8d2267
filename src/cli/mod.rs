//! Command-line interface wiring for the `keypunch` binary.
//!
//! Owns the clap definitions, logging setup and config resolution, then
//! hands control to the interactive [`Station`].

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use keypunch::{Console, Station, StationConfig};
use log::LevelFilter;

/// Parsed CLI entrypoint for the `keypunch` binary.
#[derive(Parser, Debug)]
#[command(
    name = "keypunch",
    version,
    about = "IBM 029 card punch station with card reader submit and telnet"
)]
pub struct Cli {
    /// JSON config file.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Card reader address offered at the first `.submit`.
    #[arg(long)]
    pub submit_host: Option<String>,

    /// Card reader port.
    #[arg(long)]
    pub submit_port: Option<u16>,

    /// Seconds to wait for a telnet connection before giving up (default: wait forever).
    #[arg(long = "connect-timeout")]
    pub connect_timeout: Option<u64>,

    /// Log level written to stderr (`RUST_LOG` overrides).
    #[arg(long, default_value = "warn")]
    pub log_level: LevelFilter,
}

/// Send logs to stderr so the operator dialogue on stdout stays clean.
pub fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

/// Merge defaults, the optional config file and command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<StationConfig> {
    let mut config = match &cli.config {
        Some(path) => StationConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StationConfig::default(),
    };
    if let Some(host) = &cli.submit_host {
        config.submit_host = host.clone();
    }
    if let Some(port) = cli.submit_port {
        config.submit_port = port;
    }
    if let Some(secs) = cli.connect_timeout {
        config.telnet_connect_timeout_secs = Some(secs);
    }
    config.validate().context("invalid station settings")?;
    Ok(config)
}

/// Run the interactive station on stdin/stdout.
pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    log::debug!("station config: {:?}", config);
    let console = Console::stdin();
    let mut station = Station::new(config, console, io::stdout())?;
    station.run().await
}
