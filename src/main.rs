mod cli;
mod application;
mod domain;
mod data;
mod features;
mod rsa;
mod ml;
mod infra;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("naturalcogsci=info")),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
