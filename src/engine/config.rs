//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fitness::normalization::{Direction, Normalization};

/// Configuration for the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether the objective is maximized or minimized
    pub direction: Direction,
    /// Transform from raw objective values to selection weights
    pub normalization: Normalization,
    /// Carry the previous best individual into slot 0 of each new generation
    pub elitism: bool,
    /// Seed for the operator RNG; drawn from entropy when absent
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Maximize,
            normalization: Normalization::ShiftByMinimum,
            elitism: false,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Check every parameter
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalization.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"direction":"minimize","seed":7}"#).unwrap();
        assert_eq!(config.direction, Direction::Minimize);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.normalization, Normalization::ShiftByMinimum);
        assert!(!config.elitism);
    }

    #[test]
    fn test_config_validation() {
        let config = EngineConfig {
            normalization: Normalization::DynamicLinear { ksi0: 1.0, r: 2.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }
}
