//! Optimization direction and fitness normalization
//!
//! Selection needs non-negative weights that rank individuals the same way
//! as the objective. Raw objective values are first turned into a
//! maximize-oriented score (negated when minimizing), then shifted by the
//! smallest score of the current generation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Whether the objective is maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger objective values are better
    #[default]
    Maximize,
    /// Smaller objective values are better
    Minimize,
}

impl Direction {
    /// Map a raw objective value to a maximize-oriented score
    pub fn score(self, raw: f64) -> f64 {
        match self {
            Direction::Maximize => raw,
            Direction::Minimize => -raw,
        }
    }

    /// Inverse of [`Direction::score`]
    pub fn raw(self, score: f64) -> f64 {
        // Negation is its own inverse.
        self.score(score)
    }
}

/// Order-preserving transform from scores to non-negative selection weights
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Normalization {
    /// `w = s - s_min`
    #[default]
    ShiftByMinimum,
    /// `w = s - s_min + ksi0 * r^g`
    ///
    /// The offset keeps the worst individual selectable early on and
    /// decays with the generation `g`, sharpening selection pressure.
    DynamicLinear {
        /// Initial offset
        ksi0: f64,
        /// Per-generation decay factor
        r: f64,
    },
}

impl Normalization {
    /// Create a dynamic linear normalization
    pub fn dynamic_linear(ksi0: f64, r: f64) -> Result<Self, ConfigError> {
        let normalization = Normalization::DynamicLinear { ksi0, r };
        normalization.validate()?;
        Ok(normalization)
    }

    /// Check the parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Normalization::ShiftByMinimum => Ok(()),
            Normalization::DynamicLinear { ksi0, r } => {
                if !ksi0.is_finite() || ksi0 < 0.0 {
                    return Err(ConfigError::InvalidParameter {
                        name: "ksi0",
                        reason: format!("must be finite and non-negative, got {ksi0}"),
                    });
                }
                if !(r > 0.0 && r <= 1.0) {
                    return Err(ConfigError::InvalidParameter {
                        name: "r",
                        reason: format!("must be in (0, 1], got {r}"),
                    });
                }
                Ok(())
            }
        }
    }

    /// Constant added on top of the shift at a given generation
    pub fn offset(&self, generation: usize) -> f64 {
        match *self {
            Normalization::ShiftByMinimum => 0.0,
            Normalization::DynamicLinear { ksi0, r } => {
                ksi0 * r.powi(generation.min(i32::MAX as usize) as i32)
            }
        }
    }

    /// Weight of `score` given the generation's minimum score
    ///
    /// Scores below `min_score` (from outside the generation) clamp to zero.
    pub fn apply(&self, score: f64, min_score: f64, generation: usize) -> f64 {
        (score - min_score + self.offset(generation)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_direction_score() {
        assert_eq!(Direction::Maximize.score(3.0), 3.0);
        assert_eq!(Direction::Minimize.score(3.0), -3.0);
        assert_eq!(Direction::Minimize.raw(Direction::Minimize.score(-1.5)), -1.5);
    }

    #[test]
    fn test_shift_by_minimum() {
        let n = Normalization::ShiftByMinimum;
        assert_eq!(n.apply(-3.0, -3.0, 0), 0.0);
        assert_eq!(n.apply(2.0, -3.0, 0), 5.0);
        assert_eq!(n.apply(-4.0, -3.0, 0), 0.0);
    }

    #[test]
    fn test_dynamic_linear_decays() {
        let n = Normalization::dynamic_linear(2.0, 0.5).unwrap();
        assert_relative_eq!(n.apply(0.0, 0.0, 0), 2.0);
        assert_relative_eq!(n.apply(0.0, 0.0, 1), 1.0);
        assert_relative_eq!(n.apply(1.0, 0.0, 2), 1.5);
    }

    #[test]
    fn test_dynamic_linear_validation() {
        assert!(Normalization::dynamic_linear(-1.0, 0.5).is_err());
        assert!(Normalization::dynamic_linear(1.0, 0.0).is_err());
        assert!(Normalization::dynamic_linear(1.0, 1.5).is_err());
        assert!(Normalization::dynamic_linear(0.0, 1.0).is_ok());
    }

    #[test]
    fn test_normalization_serde() {
        let n = Normalization::DynamicLinear { ksi0: 1.0, r: 0.9 };
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, r#"{"kind":"dynamic_linear","ksi0":1.0,"r":0.9}"#);
        let back: Normalization = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }
}
