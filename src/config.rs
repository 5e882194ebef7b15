//! Engine configuration loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for reward resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Streak length a `streak` bonus needs when the quest gives no threshold
    pub default_streak_threshold: u64,
    /// Completion time (ms) a `time` bonus needs when the quest gives no threshold
    pub default_time_threshold_ms: u64,
    /// Fraction of the resolved gold added by a successful loot bonus roll
    pub loot_bonus_gold_ratio: f64,
    /// Seed for loot rolls. Entropy-seeded when absent
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_streak_threshold: 5,
            default_time_threshold_ms: 60_000,
            loot_bonus_gold_ratio: 0.5,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.loot_bonus_gold_ratio.is_finite() || self.loot_bonus_gold_ratio < 0.0 {
            return Err(ConfigError::Invalid {
                field: "loot_bonus_gold_ratio",
                reason: format!("must be a non-negative number, got {}", self.loot_bonus_gold_ratio),
            });
        }
        Ok(())
    }
}
