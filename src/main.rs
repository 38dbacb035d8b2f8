mod auth;
mod cli;
mod config;
mod error;
mod metrics;
mod output;
mod providers;
mod report;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.output.log_level.as_str()),
    )
    .init();

    if !cli.quiet() {
        output::print_banner();
    }

    info!("Starting ado-leadtime");
    cli.execute(&config).await?;

    Ok(())
}
