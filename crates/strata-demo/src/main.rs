//! Scenario runner for the Strata movement resolver.
//!
//! Builds a small scripted world and drives entities through it with the
//! movement schedule, logging what happened to each of them.
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-demo -- --ticks 60 --trace-collisions`.

mod scenarios;

use clap::Parser;
use strata_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info};

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        ticks = config.simulation.ticks,
        seed = config.simulation.seed,
        step_height = config.physics.default_step_height,
        ultra_warm = config.simulation.ultra_warm,
        "Starting Strata scenarios"
    );

    let report = match scenarios::run(&config) {
        Ok(report) => report,
        Err(err) => {
            error!(%err, "Scenarios failed");
            std::process::exit(1);
        }
    };

    for line in report.summary() {
        info!("{line}");
    }
    info!(events = report.events_seen, "Scenarios finished");
}
