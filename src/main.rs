use anyhow::Context;
use clap::Parser;
use keepsake::observability::{init_logging, log_fatal};
use keepsake::{cli::Cli, run_agent, APP_NAME, VERSION};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists; must happen before clap reads the environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let (config, observability) = Cli::parse().into_config();
    init_logging(&observability).context("failed to initialise logging")?;

    info!(app_name = APP_NAME, version = VERSION, "Starting keepsake");

    if let Err(e) = run_agent(config).await {
        log_fatal(&e);
        std::process::exit(1);
    }

    Ok(())
}
