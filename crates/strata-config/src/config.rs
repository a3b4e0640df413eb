//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level simulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Movement and fluid constants.
    pub physics: PhysicsConfig,
    /// Scenario run settings.
    pub simulation: SimulationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Movement and fluid constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Highest ledge a walking entity climbs without jumping, in blocks.
    pub default_step_height: f32,
    /// Strength of water currents.
    pub water_flow_scale: f64,
    /// Strength of lava currents.
    pub lava_flow_scale: f64,
    /// Strength of lava currents in ultra-warm dimensions.
    pub lava_flow_scale_ultra_warm: f64,
    /// Downward acceleration per tick, in blocks.
    pub gravity: f64,
    /// Width of spawned entities, in blocks.
    pub entity_width: f32,
    /// Height of spawned entities, in blocks.
    pub entity_height: f32,
}

/// Scenario run settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks to run each scenario for.
    pub ticks: u32,
    /// Seed for sound pitch jitter.
    pub seed: u64,
    /// Use ultra-warm lava behaviour.
    pub ultra_warm: bool,
    /// Side length of the world border, in blocks.
    pub world_border_size: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log every resolved move at trace level.
    pub trace_collisions: bool,
}

// --- Default implementations ---

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            default_step_height: 0.6,
            water_flow_scale: 0.014,
            lava_flow_scale: 0.002_333_333_333_333_333_5,
            lava_flow_scale_ultra_warm: 0.007,
            gravity: 0.08,
            entity_width: 0.6,
            entity_height: 1.8,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 40,
            seed: 0x5EED,
            ultra_warm: false,
            world_border_size: 59_999_968.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trace_collisions: false,
        }
    }
}

/// Default directory holding `config.ron`: `<config dir>/strata`, or the
/// working directory when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Persistence ---

impl Config {
    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read_from(&path)?;
        log::info!("Using config {}", path.display());
        Ok(config)
    }

    /// Writes the config as pretty RON to `config_dir/config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, text).map_err(write_err)
    }

    /// Re-reads the file. Returns the new config only if it differs from
    /// `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_from(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config changed on disk");
        Ok(Some(fresh))
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.sanitize();
        Ok(config)
    }

    /// Replaces physics values the resolver cannot work with by their
    /// defaults.
    pub fn sanitize(&mut self) {
        let defaults = PhysicsConfig::default();
        let physics = &mut self.physics;
        if !physics.default_step_height.is_finite() || physics.default_step_height < 0.0 {
            log::warn!("Invalid step height {}, using default", physics.default_step_height);
            physics.default_step_height = defaults.default_step_height;
        }
        for (name, value, default) in [
            ("water_flow_scale", &mut physics.water_flow_scale, defaults.water_flow_scale),
            ("lava_flow_scale", &mut physics.lava_flow_scale, defaults.lava_flow_scale),
            (
                "lava_flow_scale_ultra_warm",
                &mut physics.lava_flow_scale_ultra_warm,
                defaults.lava_flow_scale_ultra_warm,
            ),
            ("gravity", &mut physics.gravity, defaults.gravity),
        ] {
            if !value.is_finite() {
                log::warn!("Invalid {name} {value}, using default");
                *value = default;
            }
        }
        if !(physics.entity_width > 0.0 && physics.entity_width.is_finite()) {
            log::warn!("Invalid entity width {}, using default", physics.entity_width);
            physics.entity_width = defaults.entity_width;
        }
        if !(physics.entity_height > 0.0 && physics.entity_height.is_finite()) {
            log::warn!("Invalid entity height {}, using default", physics.entity_height);
            physics.entity_height = defaults.entity_height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("default_step_height: 0.6"));
        assert!(ron_str.contains("ticks: 40"));
        assert!(ron_str.contains("log_level: \"info\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.simulation.seed = 1234;
        config.physics.lava_flow_scale = 0.5;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_lava_scale_survives_serialization_exactly() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(
            deserialized.physics.lava_flow_scale.to_bits(),
            0.002_333_333_333_333_333_5_f64.to_bits()
        );
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(physics: (gravity: 0.1))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.physics.gravity, 0.1);
        assert_eq!(config.physics.default_step_height, 0.6);
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.physics.default_step_height = 1.0;
        config.simulation.ultra_warm = true;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("strata");
        let config = Config::load_or_create(&nested).unwrap();
        assert_eq!(config, Config::default());
        assert!(nested.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.simulation.ticks = 100;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.simulation.ticks), Some(100));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path.ends_with(CONFIG_FILE)));
    }

    #[test]
    fn test_sanitize_replaces_unusable_physics() {
        let mut config = Config::default();
        config.physics.default_step_height = -1.0;
        config.physics.gravity = f64::NAN;
        config.physics.entity_width = 0.0;
        config.sanitize();
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn test_default_config_dir_ends_with_strata() {
        let dir = default_config_dir();
        assert!(dir.ends_with("strata") || dir == PathBuf::from("."));
    }
}
