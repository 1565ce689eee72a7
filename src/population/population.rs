//! Population type
//!
//! This module provides the Population container type.

use std::sync::Arc;

use rand::Rng;

use crate::error::ConfigError;
use crate::genome::encoding::BinaryEncoding;
use crate::population::individual::Individual;

/// An ordered collection of individuals sharing one encoding template
///
/// The declared size is fixed once the population exists; replacing the
/// members never changes it.
#[derive(Clone, Debug)]
pub struct Population {
    /// The individuals in this population
    individuals: Vec<Individual>,
    /// Template shared by every member
    encoding: Arc<BinaryEncoding>,
}

impl Population {
    /// Create a population of `size` random individuals
    pub fn initialize<R: Rng + ?Sized>(
        encoding: impl Into<Arc<BinaryEncoding>>,
        size: usize,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let encoding = encoding.into();
        if size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if encoding.dimension() == 0 {
            return Err(ConfigError::NoDimensions);
        }

        let individuals = (0..size)
            .map(|_| Individual::random(Arc::clone(&encoding), rng))
            .collect();
        Ok(Self {
            individuals,
            encoding,
        })
    }

    /// Create a population from existing individuals
    ///
    /// Every individual must have been built from an encoding equal to `encoding`.
    pub fn from_individuals(
        encoding: impl Into<Arc<BinaryEncoding>>,
        individuals: Vec<Individual>,
    ) -> Result<Self, ConfigError> {
        let encoding = encoding.into();
        if individuals
            .iter()
            .any(|i| !Arc::ptr_eq(i.encoding(), &encoding) && **i.encoding() != *encoding)
        {
            return Err(ConfigError::TemplateMismatch);
        }
        Ok(Self {
            individuals,
            encoding,
        })
    }

    /// Build a same-template population from operator output
    pub(crate) fn derived(&self, individuals: Vec<Individual>) -> Self {
        Self::with_template(Arc::clone(&self.encoding), individuals)
    }

    /// Assemble a population whose members are known to share `encoding`
    pub(crate) fn with_template(encoding: Arc<BinaryEncoding>, individuals: Vec<Individual>) -> Self {
        Self {
            individuals,
            encoding,
        }
    }

    /// The shared encoding template
    pub fn encoding(&self) -> &Arc<BinaryEncoding> {
        &self.encoding
    }

    /// Get the population size
    pub fn size(&self) -> usize {
        self.individuals.len()
    }

    /// Get the population size
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population is empty
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Get an individual by index
    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    /// Get an iterator over the individuals
    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    /// Get the underlying slice of individuals
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Take the individuals out of this population
    pub fn into_individuals(self) -> Vec<Individual> {
        self.individuals
    }

    /// Index of the first individual with the highest score
    ///
    /// Evaluates `fitness` once per member and keeps the first strict maximum.
    pub fn best_index<F>(&self, fitness: F) -> Option<usize>
    where
        F: FnMut(&Individual) -> f64,
    {
        best_of(&self.all_fits(fitness))
    }

    /// Get the best individual under a fitness function (first one wins ties)
    pub fn best<F>(&self, fitness: F) -> Option<&Individual>
    where
        F: FnMut(&Individual) -> f64,
    {
        self.best_index(fitness).map(|i| &self.individuals[i])
    }

    /// Fallible variant of [`Population::best`]; stops at the first error
    pub fn try_best<F, E>(&self, mut fitness: F) -> Result<Option<&Individual>, E>
    where
        F: FnMut(&Individual) -> Result<f64, E>,
    {
        let scores = self
            .individuals
            .iter()
            .map(&mut fitness)
            .collect::<Result<Vec<f64>, E>>()?;
        Ok(best_of(&scores).map(|i| &self.individuals[i]))
    }

    /// Get the worst individual under a fitness function (first one wins ties)
    pub fn worst<F>(&self, mut fitness: F) -> Option<&Individual>
    where
        F: FnMut(&Individual) -> f64,
    {
        self.best_index(|i| -fitness(i)).map(|i| &self.individuals[i])
    }

    /// Evaluate a fitness function over every member, in order
    pub fn all_fits<F>(&self, fitness: F) -> Vec<f64>
    where
        F: FnMut(&Individual) -> f64,
    {
        self.individuals.iter().map(fitness).collect()
    }

    /// Highest value of a fitness function over the population
    pub fn max<F>(&self, fitness: F) -> Option<f64>
    where
        F: FnMut(&Individual) -> f64,
    {
        let fits = self.all_fits(fitness);
        best_of(&fits).map(|i| fits[i])
    }

    /// Lowest value of a fitness function over the population
    pub fn min<F>(&self, fitness: F) -> Option<f64>
    where
        F: FnMut(&Individual) -> f64,
    {
        let fits = self.all_fits(fitness);
        worst_of(&fits).map(|i| fits[i])
    }

    /// Mean value of a fitness function over the population
    pub fn mean<F>(&self, fitness: F) -> Option<f64>
    where
        F: FnMut(&Individual) -> f64,
    {
        if self.is_empty() {
            return None;
        }
        Some(self.all_fits(fitness).iter().sum::<f64>() / self.len() as f64)
    }

    /// Compute population diversity (average pairwise Hamming distance)
    pub fn diversity(&self) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }

        let mut total_distance = 0usize;
        let mut count = 0usize;

        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                total_distance += self.individuals[i]
                    .chromosome()
                    .hamming_distance(self.individuals[j].chromosome());
                count += 1;
            }
        }

        total_distance as f64 / count as f64
    }
}

/// Index of the first strict maximum of a score slice
pub(crate) fn best_of(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if !(score > top) => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the first strict minimum of a score slice
pub(crate) fn worst_of(scores: &[f64]) -> Option<usize> {
    let mut worst: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match worst {
            Some((_, bottom)) if !(score < bottom) => {}
            _ => worst = Some((i, score)),
        }
    }
    worst.map(|(i, _)| i)
}

impl std::ops::Index<usize> for Population {
    type Output = Individual;

    fn index(&self, index: usize) -> &Self::Output {
        &self.individuals[index]
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Individual;
    type IntoIter = std::slice::Iter<'a, Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bit_string::BitString;
    use rand::SeedableRng;

    fn encoding() -> Arc<BinaryEncoding> {
        Arc::new(BinaryEncoding::new(vec![(0.0, 1.0)], 0.1).unwrap())
    }

    fn from_values(values: &[u64]) -> Population {
        let enc = encoding();
        let bits = enc.total_bits();
        let individuals = values
            .iter()
            .map(|&v| Individual::from_chromosome(Arc::clone(&enc), BitString::from_u64(v, bits)))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        Population::from_individuals(enc, individuals).unwrap()
    }

    #[test]
    fn test_population_initialize() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let population = Population::initialize(encoding(), 12, &mut rng).unwrap();
        assert_eq!(population.size(), 12);
        assert!(population
            .iter()
            .all(|i| Arc::ptr_eq(i.encoding(), population.encoding())));
    }

    #[test]
    fn test_population_initialize_zero_size() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let err = Population::initialize(encoding(), 0, &mut rng).unwrap_err();
        assert_eq!(err, ConfigError::EmptyPopulation);
    }

    #[test]
    fn test_population_best_first_wins_ties() {
        let population = from_values(&[1, 7, 3, 7, 2]);
        let best = population.best_index(|i| i.chromosome().count_ones() as f64);
        // 7 = 0b0111 and 7 again; 3 ones each, first one wins
        assert_eq!(best, Some(1));

        let again = population.best_index(|i| i.chromosome().count_ones() as f64);
        assert_eq!(best, again);
    }

    #[test]
    fn test_population_best_evaluates_once_per_member() {
        let population = from_values(&[1, 2, 3, 4]);
        let mut calls = 0;
        population.best(|i| {
            calls += 1;
            i.solution()[0]
        });
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_population_worst_and_all_fits() {
        let population = from_values(&[4, 0, 9, 0]);
        let worst = population.worst(|i| i.solution()[0]).unwrap();
        assert_eq!(worst, &population[1]);

        let fits = population.all_fits(|i| i.chromosome().count_ones() as f64);
        assert_eq!(fits, vec![1.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_population_try_best_propagates_error() {
        let population = from_values(&[1, 2]);
        let result: Result<Option<&Individual>, &str> = population.try_best(|_| Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_population_statistics() {
        let population = from_values(&[1, 3, 7]);
        let ones = |i: &Individual| i.chromosome().count_ones() as f64;
        assert_eq!(population.max(ones), Some(3.0));
        assert_eq!(population.min(ones), Some(1.0));
        assert_eq!(population.mean(ones), Some(2.0));
        assert_eq!(from_values(&[]).mean(ones), None);
    }

    #[test]
    fn test_population_template_mismatch() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        let other = Arc::new(BinaryEncoding::new(vec![(0.0, 5.0)], 0.1).unwrap());
        let stranger = Individual::random(other, &mut rng);
        let err = Population::from_individuals(encoding(), vec![stranger]).unwrap_err();
        assert_eq!(err, ConfigError::TemplateMismatch);
    }

    #[test]
    fn test_best_of_and_worst_of() {
        assert_eq!(best_of(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(worst_of(&[1.0, 0.5, 3.0, 0.5]), Some(1));
        assert_eq!(best_of(&[]), None);
    }

    #[test]
    fn test_population_diversity() {
        let population = from_values(&[0, 15]);
        assert_eq!(population.diversity(), 4.0);
    }
}
