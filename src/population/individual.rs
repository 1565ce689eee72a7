//! Individual type
//!
//! This module provides the Individual: a chromosome bound to the shared
//! encoding template, with its decoded solution cached at construction.

use std::sync::Arc;

use rand::Rng;

use crate::error::EncodingError;
use crate::genome::bit_string::BitString;
use crate::genome::encoding::BinaryEncoding;

/// One candidate solution
///
/// Individuals are immutable once built. Operators derive new individuals
/// through [`Individual::mutate_bits`] or [`Individual::with_chromosome`],
/// both of which re-decode the solution. Equality compares chromosome content.
#[derive(Clone, Debug)]
pub struct Individual {
    chromosome: BitString,
    encoding: Arc<BinaryEncoding>,
    solution: Vec<f64>,
}

impl Individual {
    /// Create an individual from an explicit chromosome
    pub fn from_chromosome(
        encoding: Arc<BinaryEncoding>,
        chromosome: BitString,
    ) -> Result<Self, EncodingError> {
        let solution = encoding.decode(&chromosome)?;
        Ok(Self {
            chromosome,
            encoding,
            solution,
        })
    }

    /// Create an individual with independently uniform bits
    pub fn random<R: Rng + ?Sized>(encoding: Arc<BinaryEncoding>, rng: &mut R) -> Self {
        let chromosome = encoding.random_chromosome(rng);
        let solution = encoding.decode_unchecked(&chromosome);
        Self {
            chromosome,
            encoding,
            solution,
        }
    }

    /// Create the individual nearest to a given solution vector
    pub fn from_solution(
        encoding: Arc<BinaryEncoding>,
        solution: &[f64],
    ) -> Result<Self, EncodingError> {
        let chromosome = encoding.encode(solution)?;
        Self::from_chromosome(encoding, chromosome)
    }

    /// The chromosome
    pub fn chromosome(&self) -> &BitString {
        &self.chromosome
    }

    /// The decoded solution, one value per dimension
    pub fn solution(&self) -> &[f64] {
        &self.solution
    }

    /// The shared encoding template
    pub fn encoding(&self) -> &Arc<BinaryEncoding> {
        &self.encoding
    }

    /// Decode the chromosome afresh
    pub fn decode(&self) -> Result<Vec<f64>, EncodingError> {
        self.encoding.decode(&self.chromosome)
    }

    /// Chromosome length in bits
    pub fn len(&self) -> usize {
        self.chromosome.len()
    }

    /// Whether the chromosome has no bits
    pub fn is_empty(&self) -> bool {
        self.chromosome.is_empty()
    }

    /// Check if another individual was built from an equal template
    pub fn shares_template(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.encoding, &other.encoding) || self.encoding == other.encoding
    }

    /// Derive a new individual with the same template and another chromosome
    pub fn with_chromosome(&self, chromosome: BitString) -> Result<Self, EncodingError> {
        Self::from_chromosome(Arc::clone(&self.encoding), chromosome)
    }

    /// Modify bits in place and re-decode
    ///
    /// The closure sees a fixed-length slice, so the result always fits the template.
    pub fn mutate_bits<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut [bool]),
    {
        f(self.chromosome.bits_mut());
        self.solution = self.encoding.decode_unchecked(&self.chromosome);
        self
    }

    /// Take the chromosome out of this individual
    pub fn into_chromosome(self) -> BitString {
        self.chromosome
    }
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.chromosome == other.chromosome
    }
}

impl Eq for Individual {}

/// A pair of individuals (for crossover)
pub type IndividualPair = (Individual, Individual);
