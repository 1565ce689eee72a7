//! Selection operators
//!
//! This module provides the selection variants. Each works on the
//! non-negative normalized fitness computed by the engine, so no operator
//! ever re-evaluates the objective.

use std::borrow::Cow;

use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::error::{check_probability, ConfigError, OperatorError};
use crate::operators::traits::SelectionOperator;
use crate::population::population::Population;

/// Tournament selection operator
///
/// Samples `tournament_size` individuals uniformly with replacement and
/// keeps the first one with the highest fitness. With equal fitness values
/// the first draw wins, which is a uniform random choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TournamentFields")]
pub struct TournamentSelection {
    tournament_size: usize,
}

#[derive(Deserialize)]
struct TournamentFields {
    tournament_size: usize,
}

impl TryFrom<TournamentFields> for TournamentSelection {
    type Error = ConfigError;

    fn try_from(fields: TournamentFields) -> Result<Self, Self::Error> {
        Self::new(fields.tournament_size)
    }
}

impl TournamentSelection {
    /// Create a new tournament selection with the given size
    pub fn new(tournament_size: usize) -> Result<Self, ConfigError> {
        if tournament_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "tournament_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self { tournament_size })
    }

    /// Create binary tournament selection (size = 2)
    pub fn binary() -> Self {
        Self { tournament_size: 2 }
    }

    /// Number of competitors per tournament
    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self::binary()
    }
}

impl SelectionOperator for TournamentSelection {
    fn select_index<R: Rng + ?Sized>(&self, fitness: &[f64], rng: &mut R) -> usize {
        let mut winner = rng.gen_range(0..fitness.len());
        for _ in 1..self.tournament_size {
            let challenger = rng.gen_range(0..fitness.len());
            if fitness[challenger] > fitness[winner] {
                winner = challenger;
            }
        }
        winner
    }
}

/// Roulette wheel selection (fitness proportionate)
///
/// Selection probability is proportional to normalized fitness. When every
/// weight is zero the choice is uniform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouletteWheelSelection;

impl RouletteWheelSelection {
    /// Create a new roulette wheel selection
    pub fn new() -> Self {
        Self
    }
}

impl SelectionOperator for RouletteWheelSelection {
    fn select_index<R: Rng + ?Sized>(&self, fitness: &[f64], rng: &mut R) -> usize {
        weighted_or_uniform(fitness, rng)
    }

    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        fitness: &[f64],
        rng: &mut R,
    ) -> Result<Population, OperatorError> {
        sample_with_weights(population, fitness, fitness, rng)
    }
}

/// Linear ranking selection
///
/// Individuals are ranked by fitness; the worst gets weight `pmin`, the best
/// `pmax`, and the rest are interpolated linearly by rank. Selection is then
/// proportional to those weights, which keeps the pressure independent of
/// the fitness scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RankingFields")]
pub struct LinearRankingSelection {
    pmin: f64,
    pmax: f64,
}

#[derive(Deserialize)]
struct RankingFields {
    pmin: f64,
    pmax: f64,
}

impl TryFrom<RankingFields> for LinearRankingSelection {
    type Error = ConfigError;

    fn try_from(fields: RankingFields) -> Result<Self, Self::Error> {
        Self::new(fields.pmin, fields.pmax)
    }
}

impl LinearRankingSelection {
    /// Create a linear ranking selection, `0 <= pmin <= pmax <= 1`
    pub fn new(pmin: f64, pmax: f64) -> Result<Self, ConfigError> {
        check_probability("pmin", pmin)?;
        check_probability("pmax", pmax)?;
        if pmin > pmax {
            return Err(ConfigError::InvalidParameter {
                name: "pmin",
                reason: format!("must not exceed pmax ({pmin} > {pmax})"),
            });
        }
        Ok(Self { pmin, pmax })
    }

    /// Weight of the worst-ranked individual
    pub fn pmin(&self) -> f64 {
        self.pmin
    }

    /// Weight of the best-ranked individual
    pub fn pmax(&self) -> f64 {
        self.pmax
    }

    /// Rank-based weight of every individual, in population order
    ///
    /// Ties are ranked by position so the result is deterministic.
    pub fn rank_weights(&self, fitness: &[f64]) -> Vec<f64> {
        let n = fitness.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            fitness[a]
                .partial_cmp(&fitness[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.cmp(&a))
        });

        let mut weights = vec![self.pmax; n];
        if n > 1 {
            let step = (self.pmax - self.pmin) / (n - 1) as f64;
            for (rank, &index) in order.iter().enumerate() {
                weights[index] = self.pmin + step * rank as f64;
            }
        }
        weights
    }
}

impl Default for LinearRankingSelection {
    fn default() -> Self {
        Self {
            pmin: 0.1,
            pmax: 0.9,
        }
    }
}

impl SelectionOperator for LinearRankingSelection {
    fn select_index<R: Rng + ?Sized>(&self, fitness: &[f64], rng: &mut R) -> usize {
        weighted_or_uniform(&self.rank_weights(fitness), rng)
    }

    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        fitness: &[f64],
        rng: &mut R,
    ) -> Result<Population, OperatorError> {
        let weights = self.rank_weights(fitness);
        sample_with_weights(population, fitness, &weights, rng)
    }
}

/// The closed set of selection variants the engine can drive
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Best-of-k tournament
    Tournament(TournamentSelection),
    /// Fitness proportionate
    RouletteWheel(RouletteWheelSelection),
    /// Rank proportionate
    LinearRanking(LinearRankingSelection),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(TournamentSelection::default())
    }
}

impl SelectionOperator for Selection {
    fn select_index<R: Rng + ?Sized>(&self, fitness: &[f64], rng: &mut R) -> usize {
        match self {
            Selection::Tournament(op) => op.select_index(fitness, rng),
            Selection::RouletteWheel(op) => op.select_index(fitness, rng),
            Selection::LinearRanking(op) => op.select_index(fitness, rng),
        }
    }

    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        fitness: &[f64],
        rng: &mut R,
    ) -> Result<Population, OperatorError> {
        match self {
            Selection::Tournament(op) => op.select(population, fitness, rng),
            Selection::RouletteWheel(op) => op.select(population, fitness, rng),
            Selection::LinearRanking(op) => op.select(population, fitness, rng),
        }
    }
}

impl From<TournamentSelection> for Selection {
    fn from(op: TournamentSelection) -> Self {
        Selection::Tournament(op)
    }
}

impl From<RouletteWheelSelection> for Selection {
    fn from(op: RouletteWheelSelection) -> Self {
        Selection::RouletteWheel(op)
    }
}

impl From<LinearRankingSelection> for Selection {
    fn from(op: LinearRankingSelection) -> Self {
        Selection::LinearRanking(op)
    }
}

// `WeightedIndex` panics when the cumulative weight overflows. Infinite
// weights therefore share the whole mass, and finite weights whose total
// overflows are rescaled by the largest one.
fn bounded_weights(weights: &[f64]) -> Cow<'_, [f64]> {
    if weights.contains(&f64::INFINITY) {
        return Cow::Owned(
            weights
                .iter()
                .map(|&w| if w == f64::INFINITY { 1.0 } else { 0.0 })
                .collect(),
        );
    }
    if weights.iter().sum::<f64>().is_finite() {
        return Cow::Borrowed(weights);
    }
    let largest = weights
        .iter()
        .copied()
        .filter(|w| w.is_finite())
        .fold(0.0, f64::max);
    if largest > 0.0 {
        Cow::Owned(weights.iter().map(|w| w / largest).collect())
    } else {
        Cow::Borrowed(weights)
    }
}

fn weighted_index(weights: &[f64]) -> Option<WeightedIndex<f64>> {
    WeightedIndex::new(bounded_weights(weights).iter()).ok()
}

fn weighted_or_uniform<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    match weighted_index(weights) {
        Some(dist) => dist.sample(rng),
        // All-zero or otherwise unusable weights
        None => rng.gen_range(0..weights.len()),
    }
}

// Builds the weighted distribution once for the whole mating pool.
fn sample_with_weights<R: Rng + ?Sized>(
    population: &Population,
    fitness: &[f64],
    weights: &[f64],
    rng: &mut R,
) -> Result<Population, OperatorError> {
    if population.is_empty() {
        return Err(OperatorError::EmptyPopulation);
    }
    if fitness.len() != population.len() {
        return Err(OperatorError::FitnessLengthMismatch {
            population: population.len(),
            fitness: fitness.len(),
        });
    }

    let dist = weighted_index(weights);
    let selected = (0..population.len())
        .map(|_| {
            let index = match &dist {
                Some(dist) => dist.sample(rng),
                None => rng.gen_range(0..population.len()),
            };
            population[index].clone()
        })
        .collect();
    Ok(population.derived(selected))
}
