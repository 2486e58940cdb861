//! loadgen - rate- and concurrency-bounded load generator

use anyhow::{Context, Result};
use clap::Parser;
use loadgen_log::{AsyncLogBuilder, EngineRegistry};
use tracing_subscriber::prelude::*;

mod cli;
mod sim;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = EngineRegistry::with_builtin(cli.log_level);

    if let Commands::Engines = cli.command {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let mut log = AsyncLogBuilder::new(registry).call_site(cli.verbose);
    for name in &cli.log_engines {
        log = log.engine(name.as_str());
    }
    let (layer, _guard) = log.build().context("failed to set up logging")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.directive())),
        )
        .with(layer)
        .init();

    tracing::info!("loadgen starting...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    match cli.command {
        Commands::Run(args) => runtime.block_on(cli::run(args)),
        Commands::Engines => Ok(()),
    }
}
