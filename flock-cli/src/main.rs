use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use flock_cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    log::info!("Flock starting...");
    if let Some(seed) = args.seed {
        log::info!("Seed: {}", seed);
    }

    let stdout = io::stdout();
    let summary = flock_cli::run(&args, &mut stdout.lock()).context("Simulation error")?;

    if !summary.stats.all_finite {
        log::warn!("Flock ended in a non-finite state");
    }

    Ok(())
}
