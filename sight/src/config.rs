use serde::Deserialize;
use sight_core::{ConfigError, TrackingConfig};
use std::{fs, io, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../../package-content/sight_config.json5");

/// Errors while loading the config file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read or written.
    #[error("config io error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid JSON5 or does not match the schema.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json5::Error),

    /// The values are out of range.
    #[error(transparent)]
    Invalid(#[from] ConfigError),

    /// A simulation value is out of range.
    #[error("invalid simulation config: {0}")]
    Simulation(&'static str),
}

/// The whole config file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SightConfig {
    /// Tracking core tunables.
    pub tracking: TrackingConfig,
    /// Synthetic workload.
    pub simulation: SimulationConfig,
}

/// The synthetic workload the binary drives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the walk.
    pub seed: u64,
    /// Number of objects, observers included.
    pub objects: u32,
    /// Number of observers.
    pub observers: u32,
    /// Ticks to run.
    pub ticks: u64,
    /// Half side of the square everything walks in, in world units.
    pub world_radius: f64,
    /// Longest step per tick, in world units.
    pub max_step: f64,
    /// Lower bound of object sight distances.
    pub min_sight_distance: u32,
    /// Upper bound of object sight distances.
    pub max_sight_distance: u32,
    /// Chance per tick and object of despawning or respawning.
    pub churn: f64,
}

impl SightConfig {
    /// Reads the config at `path`, writing the bundled default there first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, LoadError> {
        let config: Self = if path.exists() {
            let config_str = fs::read_to_string(path)?;
            serde_json5::from_str(&config_str)?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            log::info!("Wrote default config to {}", path.display());
            serde_json5::from_str(DEFAULT_CONFIG)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks both sections.
    pub fn validate(&self) -> Result<(), LoadError> {
        self.tracking.validate()?;
        let sim = &self.simulation;
        if sim.observers > sim.objects {
            return Err(LoadError::Simulation(
                "every observer is also an object, observers must not exceed objects",
            ));
        }
        if !(sim.world_radius > 0.0) {
            return Err(LoadError::Simulation("world radius must be positive"));
        }
        if sim.max_step < 0.0 {
            return Err(LoadError::Simulation("max step must not be negative"));
        }
        if sim.min_sight_distance > sim.max_sight_distance {
            return Err(LoadError::Simulation(
                "min sight distance must not exceed max sight distance",
            ));
        }
        if !(0.0..=1.0).contains(&sim.churn) {
            return Err(LoadError::Simulation("churn must be between 0 and 1"));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            objects: 2000,
            observers: 100,
            ticks: 200,
            world_radius: 1024.0,
            max_step: 4.0,
            min_sight_distance: 32,
            max_sight_distance: 128,
            churn: 0.002,
        }
    }
}
