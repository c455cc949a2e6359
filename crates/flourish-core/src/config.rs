//! FlourishConfig - 実行時の設定値
//!
//! TOML ファイルから読み込みます。全フィールドにデフォルトがあるので、
//! 空ファイルや一部だけ書いたファイルでも動きます。
//!
//! ```toml
//! max_score = 1000
//! tick_interval_ms = 1000
//! level_up_chance = 0.7
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::errors::ConfigError;
use crate::domain::reconciler::GardenRules;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlourishConfig {
    /// Upper bound of the score.
    pub max_score: u32,
    pub tick_interval_ms: u64,
    /// Score points per unit of plant mass.
    pub points_per_unit: u32,
    pub max_plant_count: u32,
    pub max_plant_level: u32,
    /// Probability of leveling up (vs planting) when both are possible.
    pub level_up_chance: f64,
    pub reconnect_delay_ms: u64,
    pub broadcast_capacity: usize,
}

impl Default for FlourishConfig {
    fn default() -> Self {
        let rules = GardenRules::default();
        Self {
            max_score: 1000,
            tick_interval_ms: 1000,
            points_per_unit: rules.points_per_unit,
            max_plant_count: rules.max_plant_count,
            max_plant_level: rules.max_plant_level,
            level_up_chance: rules.level_up_chance,
            reconnect_delay_ms: 1000,
            broadcast_capacity: 64,
        }
    }
}

impl FlourishConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points_per_unit == 0 {
            return Err(ConfigError::Invalid("points_per_unit must be greater than 0".to_string()));
        }
        if self.max_plant_level == 0 {
            return Err(ConfigError::Invalid("max_plant_level must be greater than 0".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be greater than 0".to_string()));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid("broadcast_capacity must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.level_up_chance) {
            return Err(ConfigError::Invalid(format!(
                "level_up_chance must be within [0, 1], got {}",
                self.level_up_chance
            )));
        }
        Ok(())
    }

    pub fn garden_rules(&self) -> GardenRules {
        GardenRules {
            points_per_unit: self.points_per_unit,
            max_plant_count: self.max_plant_count,
            max_plant_level: self.max_plant_level,
            level_up_chance: self.level_up_chance,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
