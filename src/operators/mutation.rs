//! Mutation operators
//!
//! This module provides bit-flip mutation and its "big" variant, which
//! occasionally inverts a whole contiguous block to escape local optima.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{check_probability, ConfigError};
use crate::operators::traits::MutationOperator;
use crate::population::individual::Individual;

/// Bit-flip mutation for bit strings
///
/// Flips each bit with a given probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FlipBitFields")]
pub struct FlipBitMutation {
    pm: f64,
}

#[derive(Deserialize)]
struct FlipBitFields {
    pm: f64,
}

impl TryFrom<FlipBitFields> for FlipBitMutation {
    type Error = ConfigError;

    fn try_from(fields: FlipBitFields) -> Result<Self, Self::Error> {
        Self::new(fields.pm)
    }
}

impl FlipBitMutation {
    /// Create a new bit-flip mutation, `pm` in `[0, 1]`
    pub fn new(pm: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            pm: check_probability("pm", pm)?,
        })
    }
}

impl MutationOperator for FlipBitMutation {
    fn mutate<R: Rng + ?Sized>(&self, individual: Individual, rng: &mut R) -> Individual {
        individual.mutate_bits(|bits| flip_each(bits, self.pm, rng))
    }

    fn mutation_probability(&self) -> f64 {
        self.pm
    }
}

/// Bit-flip mutation with occasional block inversion
///
/// Each individual is picked for big mutation with probability `pbm`. A
/// picked individual has a contiguous block of `floor(alpha * len)` bits,
/// starting at a uniformly random position, inverted at once. Individuals
/// not picked (or whose block would be empty) undergo ordinary bit-flip
/// mutation at rate `pm`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FlipBitBigFields")]
pub struct FlipBitBigMutation {
    pm: f64,
    pbm: f64,
    alpha: f64,
}

#[derive(Deserialize)]
struct FlipBitBigFields {
    pm: f64,
    pbm: f64,
    alpha: f64,
}

impl TryFrom<FlipBitBigFields> for FlipBitBigMutation {
    type Error = ConfigError;

    fn try_from(fields: FlipBitBigFields) -> Result<Self, Self::Error> {
        Self::new(fields.pm, fields.pbm, fields.alpha)
    }
}

impl FlipBitBigMutation {
    /// Create a new big mutation; every parameter must be in `[0, 1]`
    pub fn new(pm: f64, pbm: f64, alpha: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            pm: check_probability("pm", pm)?,
            pbm: check_probability("pbm", pbm)?,
            alpha: check_probability("alpha", alpha)?,
        })
    }

    /// Probability of picking an individual for block inversion
    pub fn big_mutation_probability(&self) -> f64 {
        self.pbm
    }

    /// Fraction of the chromosome inverted as a block
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of bits inverted together for a chromosome of `len` bits
    pub fn block_size(&self, len: usize) -> usize {
        ((self.alpha * len as f64).floor() as usize).min(len)
    }
}

impl MutationOperator for FlipBitBigMutation {
    fn mutate<R: Rng + ?Sized>(&self, individual: Individual, rng: &mut R) -> Individual {
        let block = self.block_size(individual.len());
        let big = rng.gen::<f64>() < self.pbm;

        individual.mutate_bits(|bits| {
            if big && block > 0 {
                let start = rng.gen_range(0..=bits.len() - block);
                bits[start..start + block]
                    .iter_mut()
                    .for_each(|bit| *bit = !*bit);
            } else {
                flip_each(bits, self.pm, rng);
            }
        })
    }

    fn mutation_probability(&self) -> f64 {
        self.pm
    }
}

/// The closed set of mutation variants the engine can drive
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Independent per-bit flips
    FlipBit(FlipBitMutation),
    /// Per-bit flips with occasional block inversion
    FlipBitBig(FlipBitBigMutation),
}

impl MutationOperator for Mutation {
    fn mutate<R: Rng + ?Sized>(&self, individual: Individual, rng: &mut R) -> Individual {
        match self {
            Mutation::FlipBit(op) => op.mutate(individual, rng),
            Mutation::FlipBitBig(op) => op.mutate(individual, rng),
        }
    }

    fn mutation_probability(&self) -> f64 {
        match self {
            Mutation::FlipBit(op) => op.mutation_probability(),
            Mutation::FlipBitBig(op) => op.mutation_probability(),
        }
    }
}

impl From<FlipBitMutation> for Mutation {
    fn from(op: FlipBitMutation) -> Self {
        Mutation::FlipBit(op)
    }
}

impl From<FlipBitBigMutation> for Mutation {
    fn from(op: FlipBitBigMutation) -> Self {
        Mutation::FlipBitBig(op)
    }
}

fn flip_each<R: Rng + ?Sized>(bits: &mut [bool], pm: f64, rng: &mut R) {
    for bit in bits.iter_mut() {
        if rng.gen::<f64>() < pm {
            *bit = !*bit;
        }
    }
}
