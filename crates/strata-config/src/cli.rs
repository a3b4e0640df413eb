//! Command-line argument parsing for the Strata simulator.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Entity movement and collision simulator")]
pub struct CliArgs {
    /// Ticks to run each scenario for.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Seed for sound pitch jitter.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Step height of walking entities, in blocks.
    #[arg(long)]
    pub step_height: Option<f32>,

    /// Use ultra-warm lava behaviour.
    #[arg(long)]
    pub ultra_warm: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log every resolved move.
    #[arg(long)]
    pub trace_collisions: bool,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ticks) = args.ticks {
            self.simulation.ticks = ticks;
        }
        if let Some(seed) = args.seed {
            self.simulation.seed = seed;
        }
        if let Some(step) = args.step_height {
            self.physics.default_step_height = step;
        }
        if let Some(ultra_warm) = args.ultra_warm {
            self.simulation.ultra_warm = ultra_warm;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if args.trace_collisions {
            self.debug.trace_collisions = true;
        }
        self.sanitize();
    }
}
