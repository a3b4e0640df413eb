//! Configuration for the Strata movement simulator.
//!
//! Settings persist to disk as a RON file (`config.ron`) and can be
//! overridden from the command line. Missing sections and fields fall back to
//! their defaults so older files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, PhysicsConfig, SimulationConfig, default_config_dir};
pub use error::ConfigError;
