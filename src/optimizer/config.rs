//! Rule search configuration loaded from YAML

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_ACCEPTANCE_PROBABILITY: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("acceptance_probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),
}

/// Knobs for [`crate::optimizer::RuleSearch`]
///
/// ```yaml
/// iterations: 2000
/// seed: 42
/// acceptance_probability: 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Upper bound on mutation attempts
    pub iterations: usize,
    /// Seed for a reproducible search, entropy when absent
    pub seed: Option<u64>,
    /// Chance of keeping a candidate that does not improve on the current one
    pub acceptance_probability: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            acceptance_probability: DEFAULT_ACCEPTANCE_PROBABILITY,
        }
    }
}

impl SearchConfig {
    pub fn with_iterations(iterations: usize) -> Self {
        Self { iterations, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.acceptance_probability) {
            return Err(ConfigError::InvalidProbability(self.acceptance_probability));
        }
        Ok(())
    }
}

/// Load a search configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<SearchConfig> {
    let path = config_path.as_ref();

    if !path.exists() {
        return Err(anyhow!("Config file not found: {}", path.display()));
    }

    let yaml_str = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

    let config: SearchConfig = serde_yaml::from_str(&yaml_str)
        .map_err(|e| anyhow!("Invalid YAML config in {}: {}", path.display(), e))?;
    config.validate()?;

    log::info!(
        "Search config: {} iterations, seed {:?}, acceptance probability {}",
        config.iterations,
        config.seed,
        config.acceptance_probability
    );
    Ok(config)
}
