use anyhow::{Context, Result};
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.log_level);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the I/O runtime")?;
    let outcome = runtime.block_on(cli::run(cli));
    // The stdin reader may still be parked in a blocking read; don't wait for it.
    runtime.shutdown_background();
    outcome
}
