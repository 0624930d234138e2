//! Run configuration.
//!
//! A single JSON file may carry any of the five sections; whatever it leaves
//! out keeps its defaults. Command-line flags are applied on top.

use anyhow::{Context, Result};
use rl::{EnvConfig, StrategyConfig, TrainerConfig};
use scenario::{CompilerConfig, LookupConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RacelabConfig {
    pub env: EnvConfig,
    pub trainer: TrainerConfig,
    pub compiler: CompilerConfig,
    pub lookup: LookupConfig,
    pub strategy: StrategyConfig,
}

impl RacelabConfig {
    /// Defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not valid configuration JSON.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// # Errors
    ///
    /// Invalid JSON or a field of the wrong type.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The environment the compiler drives, taken from the `env` section.
    #[must_use]
    pub fn compiler(&self) -> CompilerConfig {
        CompilerConfig { env: self.env.clone(), ..self.compiler.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_keep_their_defaults() {
        let config = RacelabConfig::from_json(r#"{ "trainer": { "seed": 9, "workers": 2 }, "lookup": { "max_distance": 1.5 } }"#)
            .unwrap();
        assert_eq!(config.trainer.seed, 9);
        assert_eq!(config.trainer.workers, 2);
        assert_eq!(config.trainer.rollout_steps, TrainerConfig::default().rollout_steps);
        assert_eq!(config.lookup.max_distance, 1.5);
        assert_eq!(config.lookup.latency_budget_ms, 12.0);
        assert_eq!(config.env, EnvConfig::default());
        assert_eq!(config.strategy, StrategyConfig::default());
    }

    #[test]
    fn strategy_settings_override_field_by_field() {
        let config = RacelabConfig::from_json(r#"{ "strategy": { "pit_loss": 21.5, "neutralised_compound": "HARD" } }"#)
            .unwrap();
        assert_eq!(config.strategy.pit_loss, 21.5);
        assert_eq!(config.strategy.neutralised_compound, physics::TireCompound::Hard);
        assert_eq!(config.strategy.max_stint_laps, StrategyConfig::default().max_stint_laps);
    }

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(RacelabConfig::load(None).unwrap(), RacelabConfig::default());
    }

    #[test]
    fn malformed_files_are_reported() {
        assert!(RacelabConfig::from_json(r#"{ "trainer": { "seed": "nine" } }"#).is_err());
    }
}
