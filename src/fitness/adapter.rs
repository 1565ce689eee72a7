//! Fitness adapter
//!
//! Wraps the user objective and keeps the per-generation bookkeeping that
//! turns raw objective values into selection weights.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{ConfigError, EngineError, EngineResult, ObjectiveError};
use crate::fitness::normalization::{Direction, Normalization};
use crate::population::individual::Individual;
use crate::population::population::{best_of, worst_of};

/// The registered objective: decoded solution in, raw score out
pub type Objective = dyn Fn(&[f64]) -> Result<f64, ObjectiveError> + Send + Sync;

/// Wraps the objective and tracks the raw extrema of the current generation
///
/// `ori_fmax` and `ori_fmin` are raw objective values of the best and worst
/// individual, in the objective's own sign: when minimizing, `ori_fmax` is
/// the smallest raw value observed.
///
/// Non-determinism in the objective propagates directly into run outcomes;
/// keeping it deterministic is the caller's responsibility.
#[derive(Clone)]
pub struct FitnessAdapter {
    objective: Option<Arc<Objective>>,
    direction: Direction,
    normalization: Normalization,
    generation: usize,
    ori_fmax: f64,
    ori_fmin: f64,
    ori_fmean: f64,
}

impl FitnessAdapter {
    /// Create an adapter with no objective registered
    pub fn new(direction: Direction, normalization: Normalization) -> Result<Self, ConfigError> {
        normalization.validate()?;
        Ok(Self {
            objective: None,
            direction,
            normalization,
            generation: 0,
            ori_fmax: f64::NAN,
            ori_fmin: f64::NAN,
            ori_fmean: f64::NAN,
        })
    }

    /// Install an infallible objective
    pub fn register<F>(&mut self, objective: F) -> Result<(), ConfigError>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        let wrapped: Arc<Objective> =
            Arc::new(move |x: &[f64]| -> Result<f64, ObjectiveError> { Ok(objective(x)) });
        self.install(wrapped)
    }

    /// Install a fallible objective; its errors abort the run unchanged
    pub fn try_register<F, E>(&mut self, objective: F) -> Result<(), ConfigError>
    where
        F: Fn(&[f64]) -> Result<f64, E> + Send + Sync + 'static,
        E: Into<ObjectiveError>,
    {
        let wrapped: Arc<Objective> = Arc::new(move |x: &[f64]| -> Result<f64, ObjectiveError> {
            objective(x).map_err(Into::into)
        });
        self.install(wrapped)
    }

    fn install(&mut self, objective: Arc<Objective>) -> Result<(), ConfigError> {
        if self.objective.is_some() {
            return Err(ConfigError::ObjectiveAlreadyRegistered);
        }
        self.objective = Some(objective);
        Ok(())
    }

    /// Whether an objective has been registered
    pub fn is_registered(&self) -> bool {
        self.objective.is_some()
    }

    /// Optimization direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Normalization transform
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Raw objective value of an individual
    pub fn evaluate(&self, individual: &Individual) -> EngineResult<f64> {
        let objective = self
            .objective
            .as_ref()
            .ok_or(ConfigError::MissingObjective)?;
        objective(individual.solution()).map_err(EngineError::Objective)
    }

    /// Raw objective values of a slice of individuals, in order
    #[cfg(feature = "parallel")]
    pub fn evaluate_all(&self, individuals: &[Individual]) -> EngineResult<Vec<f64>> {
        individuals
            .par_iter()
            .map(|individual| self.evaluate(individual))
            .collect()
    }

    /// Raw objective values of a slice of individuals, in order
    #[cfg(not(feature = "parallel"))]
    pub fn evaluate_all(&self, individuals: &[Individual]) -> EngineResult<Vec<f64>> {
        individuals
            .iter()
            .map(|individual| self.evaluate(individual))
            .collect()
    }

    /// Maximize-oriented score of a raw value
    pub fn score(&self, raw: f64) -> f64 {
        self.direction.score(raw)
    }

    /// Maximize-oriented score of an individual; re-evaluates the objective
    pub fn fitness(&self, individual: &Individual) -> EngineResult<f64> {
        self.evaluate(individual).map(|raw| self.score(raw))
    }

    /// Recompute the generation's extrema from its raw values
    pub fn update(&mut self, raw: &[f64], generation: usize) {
        self.generation = generation;
        let scores: Vec<f64> = raw.iter().map(|&r| self.score(r)).collect();
        match (best_of(&scores), worst_of(&scores)) {
            (Some(best), Some(worst)) => {
                self.ori_fmax = raw[best];
                self.ori_fmin = raw[worst];
                self.ori_fmean = raw.iter().sum::<f64>() / raw.len() as f64;
            }
            _ => {
                self.ori_fmax = f64::NAN;
                self.ori_fmin = f64::NAN;
                self.ori_fmean = f64::NAN;
            }
        }
    }

    /// Non-negative selection weight of a raw value under the current extrema
    pub fn normalized_value(&self, raw: f64) -> f64 {
        let min_score = self.score(self.ori_fmin);
        self.normalization
            .apply(self.score(raw), min_score, self.generation)
    }

    /// Non-negative selection weight of an individual; re-evaluates the objective
    pub fn normalized(&self, individual: &Individual) -> EngineResult<f64> {
        self.evaluate(individual)
            .map(|raw| self.normalized_value(raw))
    }

    /// Selection weights for a whole generation of raw values
    pub fn normalize_all(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&r| self.normalized_value(r)).collect()
    }

    /// Raw value of the best individual of the current generation
    pub fn ori_fmax(&self) -> f64 {
        self.ori_fmax
    }

    /// Raw value of the worst individual of the current generation
    pub fn ori_fmin(&self) -> f64 {
        self.ori_fmin
    }

    /// Mean raw value of the current generation
    pub fn ori_fmean(&self) -> f64 {
        self.ori_fmean
    }
}

impl fmt::Debug for FitnessAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessAdapter")
            .field("registered", &self.is_registered())
            .field("direction", &self.direction)
            .field("normalization", &self.normalization)
            .field("generation", &self.generation)
            .field("ori_fmax", &self.ori_fmax)
            .field("ori_fmin", &self.ori_fmin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bit_string::BitString;
    use crate::genome::encoding::BinaryEncoding;

    fn individual(value: f64) -> Individual {
        let enc = Arc::new(BinaryEncoding::new(vec![(0.0, 10.0)], 0.001).unwrap());
        Individual::from_solution(enc, &[value]).unwrap()
    }

    fn adapter(direction: Direction) -> FitnessAdapter {
        FitnessAdapter::new(direction, Normalization::ShiftByMinimum).unwrap()
    }

    #[test]
    fn test_register_twice_fails() {
        let mut fitness = adapter(Direction::Maximize);
        fitness.register(|x| x[0]).unwrap();
        assert_eq!(
            fitness.register(|x| x[0]).unwrap_err(),
            ConfigError::ObjectiveAlreadyRegistered
        );
        assert_eq!(
            fitness.try_register(|x| Ok::<_, ObjectiveError>(x[0])).unwrap_err(),
            ConfigError::ObjectiveAlreadyRegistered
        );
    }

    #[test]
    fn test_evaluate_without_objective() {
        let fitness = adapter(Direction::Maximize);
        let err = fitness.evaluate(&individual(1.0)).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::MissingObjective)));
    }

    #[test]
    fn test_evaluate_uses_decoded_solution() {
        let mut fitness = adapter(Direction::Maximize);
        fitness.register(|x| 2.0 * x[0]).unwrap();
        let ind = individual(3.0);
        assert_eq!(fitness.evaluate(&ind).unwrap(), 2.0 * ind.solution()[0]);
    }

    #[test]
    fn test_objective_error_propagates() {
        let mut fitness = adapter(Direction::Maximize);
        fitness
            .try_register(|x| {
                if x[0] > 5.0 {
                    Err("out of domain")
                } else {
                    Ok(x[0])
                }
            })
            .unwrap();
        let err = fitness.evaluate(&individual(9.0)).unwrap_err();
        assert_eq!(err.to_string(), "out of domain");
        assert!(fitness.evaluate(&individual(1.0)).is_ok());
    }

    #[test]
    fn test_extrema_and_normalization_maximize() {
        let mut fitness = adapter(Direction::Maximize);
        fitness.update(&[-3.0, 4.0, 1.0], 0);
        assert_eq!(fitness.ori_fmax(), 4.0);
        assert_eq!(fitness.ori_fmin(), -3.0);
        assert_eq!(fitness.normalize_all(&[-3.0, 4.0, 1.0]), vec![0.0, 7.0, 4.0]);
    }

    #[test]
    fn test_extrema_and_normalization_minimize() {
        let mut fitness = adapter(Direction::Minimize);
        fitness.update(&[-3.0, 4.0, 1.0], 0);
        // Best raw value is the smallest one
        assert_eq!(fitness.ori_fmax(), -3.0);
        assert_eq!(fitness.ori_fmin(), 4.0);
        assert_eq!(fitness.normalize_all(&[-3.0, 4.0, 1.0]), vec![7.0, 0.0, 3.0]);
    }

    #[test]
    fn test_normalization_preserves_order() {
        let raw = [0.5, -2.0, 3.25, 3.0, -7.5];
        for direction in [Direction::Maximize, Direction::Minimize] {
            let mut fitness = adapter(direction);
            fitness.update(&raw, 3);
            let weights = fitness.normalize_all(&raw);
            for i in 0..raw.len() {
                assert!(weights[i] >= 0.0);
                for j in 0..raw.len() {
                    let better = direction.score(raw[i]) > direction.score(raw[j]);
                    if better {
                        assert!(weights[i] > weights[j]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_fitness_is_direction_aware() {
        let mut fitness = adapter(Direction::Minimize);
        fitness.register(|x| x[0]).unwrap();
        let enc = Arc::new(BinaryEncoding::new(vec![(0.0, 10.0)], 0.001).unwrap());
        let zero = Individual::from_chromosome(enc, BitString::zeros(14)).unwrap();
        assert_eq!(fitness.fitness(&zero).unwrap(), -0.0);
    }
}
