//! Operator traits
//!
//! This module defines the core operator contracts. Operators never retain
//! references to the populations they transform and return new values
//! rather than mutating their input.

use std::sync::Arc;

use rand::Rng;

use crate::error::OperatorError;
use crate::population::individual::{Individual, IndividualPair};
use crate::population::population::Population;

/// Selection operator trait
///
/// Builds a mating pool of the same size as the source population.
pub trait SelectionOperator: Send + Sync {
    /// Select one index given non-negative normalized fitness values
    fn select_index<R: Rng + ?Sized>(&self, fitness: &[f64], rng: &mut R) -> usize;

    /// Fill a new population, choosing each slot independently
    ///
    /// `fitness[i]` is the normalized fitness of `population[i]`.
    fn select<R: Rng + ?Sized>(
        &self,
        population: &Population,
        fitness: &[f64],
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

        let selected = (0..population.len())
            .map(|_| population[self.select_index(fitness, rng)].clone())
            .collect();
        Ok(population.derived(selected))
    }
}

/// Crossover operator trait
///
/// Combines genetic material from two parents to create two children.
pub trait CrossoverOperator: Send + Sync {
    /// Apply crossover to a pair of parents
    ///
    /// Whether crossover triggers at all is decided here, by the operator's
    /// own probability; when it does not, the children equal the parents.
    fn cross<R: Rng + ?Sized>(
        &self,
        parents: (&Individual, &Individual),
        rng: &mut R,
    ) -> Result<IndividualPair, OperatorError>;

    /// Get the probability of crossover being applied to a pair
    fn crossover_probability(&self) -> f64;

    /// Cross consecutive non-overlapping pairs, in population order
    ///
    /// With an odd population size the last individual has no partner and
    /// passes through unchanged.
    fn cross_population<R: Rng + ?Sized>(
        &self,
        population: &Population,
        rng: &mut R,
    ) -> Result<Population, OperatorError> {
        let mut children = Vec::with_capacity(population.len());
        let mut pairs = population.individuals().chunks_exact(2);
        for pair in &mut pairs {
            let (first, second) = self.cross((&pair[0], &pair[1]), rng)?;
            children.push(first);
            children.push(second);
        }
        children.extend(pairs.remainder().iter().cloned());
        Ok(population.derived(children))
    }
}

/// Mutation operator trait
///
/// Takes ownership of an individual and returns its mutated successor.
pub trait MutationOperator: Send + Sync {
    /// Apply mutation to an individual
    fn mutate<R: Rng + ?Sized>(&self, individual: Individual, rng: &mut R) -> Individual;

    /// Get the per-bit mutation probability
    fn mutation_probability(&self) -> f64;

    /// Mutate every member of a population
    fn mutate_population<R: Rng + ?Sized>(&self, population: Population, rng: &mut R) -> Population {
        let encoding = Arc::clone(population.encoding());
        let mutated = population
            .into_individuals()
            .into_iter()
            .map(|individual| self.mutate(individual, rng))
            .collect();
        Population::with_template(encoding, mutated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bit_string::BitString;
    use crate::genome::encoding::BinaryEncoding;
    use rand::SeedableRng;
    use std::sync::Arc;

    // Always picks the first candidate
    struct FirstSelection;

    impl SelectionOperator for FirstSelection {
        fn select_index<R: Rng + ?Sized>(&self, _fitness: &[f64], _rng: &mut R) -> usize {
            0
        }
    }

    // Swaps the parents
    struct SwapCrossover;

    impl CrossoverOperator for SwapCrossover {
        fn cross<R: Rng + ?Sized>(
            &self,
            parents: (&Individual, &Individual),
            _rng: &mut R,
        ) -> Result<IndividualPair, OperatorError> {
            Ok((parents.1.clone(), parents.0.clone()))
        }

        fn crossover_probability(&self) -> f64 {
            1.0
        }
    }

    fn population(values: &[u64]) -> Population {
        let enc = Arc::new(BinaryEncoding::new(vec![(0.0, 1.0)], 0.1).unwrap());
        let individuals = values
            .iter()
            .map(|&v| Individual::from_chromosome(Arc::clone(&enc), BitString::from_u64(v, 4)))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        Population::from_individuals(enc, individuals).unwrap()
    }

    #[test]
    fn test_default_select_fills_population() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let source = population(&[1, 2, 3]);
        let selected = FirstSelection
            .select(&source, &[0.0, 1.0, 2.0], &mut rng)
            .unwrap();
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|i| i == &source[0]));
    }

    #[test]
    fn test_default_select_rejects_bad_input() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let source = population(&[1, 2]);
        assert_eq!(
            FirstSelection.select(&source, &[1.0], &mut rng).unwrap_err(),
            OperatorError::FitnessLengthMismatch {
                population: 2,
                fitness: 1
            }
        );

        let empty = population(&[]);
        assert_eq!(
            FirstSelection.select(&empty, &[], &mut rng).unwrap_err(),
            OperatorError::EmptyPopulation
        );
    }

    #[test]
    fn test_cross_population_pairs_in_order() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let source = population(&[1, 2, 3, 4]);
        let children = SwapCrossover.cross_population(&source, &mut rng).unwrap();
        let expected = population(&[2, 1, 4, 3]);
        assert_eq!(children.individuals(), expected.individuals());
    }

    #[test]
    fn test_cross_population_odd_size_passes_last_through() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let source = population(&[1, 2, 3, 4, 5]);
        let children = SwapCrossover.cross_population(&source, &mut rng).unwrap();
        let expected = population(&[2, 1, 4, 3, 5]);
        assert_eq!(children.individuals(), expected.individuals());
    }
}
