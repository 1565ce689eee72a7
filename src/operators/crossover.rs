//! Crossover operators
//!
//! This module provides crossover over binary chromosomes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{check_probability, ConfigError, OperatorError};
use crate::operators::traits::CrossoverOperator;
use crate::population::individual::{Individual, IndividualPair};

/// Uniform crossover for bit strings
///
/// With probability `pc` a pair is crossed at all. A crossed pair swaps each
/// bit position independently with probability `pe`, so the two children
/// together hold exactly the parents' bits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UniformFields")]
pub struct UniformCrossover {
    pc: f64,
    pe: f64,
}

#[derive(Deserialize)]
struct UniformFields {
    pc: f64,
    pe: f64,
}

impl TryFrom<UniformFields> for UniformCrossover {
    type Error = ConfigError;

    fn try_from(fields: UniformFields) -> Result<Self, Self::Error> {
        Self::new(fields.pc, fields.pe)
    }
}

impl UniformCrossover {
    /// Create a new uniform crossover, `pc, pe` in `[0, 1]`
    pub fn new(pc: f64, pe: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            pc: check_probability("pc", pc)?,
            pe: check_probability("pe", pe)?,
        })
    }

    /// Probability of exchanging a single bit position
    pub fn exchange_probability(&self) -> f64 {
        self.pe
    }
}

impl Default for UniformCrossover {
    fn default() -> Self {
        Self { pc: 0.8, pe: 0.5 }
    }
}

impl CrossoverOperator for UniformCrossover {
    fn cross<R: Rng + ?Sized>(
        &self,
        parents: (&Individual, &Individual),
        rng: &mut R,
    ) -> Result<IndividualPair, OperatorError> {
        let (left, right) = parents;
        if left.len() != right.len() {
            return Err(OperatorError::ParentLengthMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        if rng.gen::<f64>() >= self.pc {
            return Ok((left.clone(), right.clone()));
        }

        let swap: Vec<bool> = (0..left.len()).map(|_| rng.gen::<f64>() < self.pe).collect();
        let left_bits = left.chromosome().bits();
        let right_bits = right.chromosome().bits();

        let child1 = left.clone().mutate_bits(|bits| {
            for (i, bit) in bits.iter_mut().enumerate() {
                if swap[i] {
                    *bit = right_bits[i];
                }
            }
        });
        let child2 = right.clone().mutate_bits(|bits| {
            for (i, bit) in bits.iter_mut().enumerate() {
                if swap[i] {
                    *bit = left_bits[i];
                }
            }
        });

        Ok((child1, child2))
    }

    fn crossover_probability(&self) -> f64 {
        self.pc
    }
}
