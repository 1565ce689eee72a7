//! Bit string chromosome
//!
//! [`BitString`] is the raw genetic material of an individual. Its length is
//! set once by the encoding template; operators only ever change bit values.

use std::fmt;
use std::ops::Index;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed-length chromosome of bits
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitString {
    bits: Vec<bool>,
}

impl BitString {
    /// Wrap explicit bits
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// `length` cleared bits
    pub fn zeros(length: usize) -> Self {
        Self::new(vec![false; length])
    }

    /// `length` set bits
    pub fn ones(length: usize) -> Self {
        Self::new(vec![true; length])
    }

    /// `length` independently uniform bits
    pub fn random<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Self {
        Self::new((0..length).map(|_| rng.gen::<bool>()).collect())
    }

    /// Write `value` into `length` bits, most significant first
    ///
    /// Positions beyond the 64 bits of `value` are zero, and high bits of
    /// `value` that do not fit are dropped.
    pub fn from_u64(value: u64, length: usize) -> Self {
        let bits = (0..length)
            .rev()
            .map(|shift| shift < 64 && (value >> shift) & 1 == 1)
            .collect();
        Self { bits }
    }

    /// Read `len` bits starting at `start` as an unsigned integer, most significant first
    ///
    /// `None` if the window runs past the end or is wider than 64 bits.
    pub fn window_u64(&self, start: usize, len: usize) -> Option<u64> {
        if len > 64 {
            return None;
        }
        let window = self.bits.get(start..start.checked_add(len)?)?;
        Some(
            window
                .iter()
                .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit)),
        )
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether there are no bits
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The bits, in chromosome order
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Mutable access to the bit values; the length stays fixed
    pub fn bits_mut(&mut self) -> &mut [bool] {
        &mut self.bits
    }

    /// Bit at `index`, if in range
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Invert the bit at `index`; out-of-range indices are ignored
    pub fn flip(&mut self, index: usize) {
        if let Some(bit) = self.bits.get_mut(index) {
            *bit = !*bit;
        }
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    /// Number of positions at which two chromosomes differ
    pub fn hamming_distance(&self, other: &Self) -> usize {
        self.bits
            .iter()
            .zip(&other.bits)
            .filter(|(a, b)| a != b)
            .count()
    }
}

impl Index<usize> for BitString {
    type Output = bool;

    fn index(&self, index: usize) -> &bool {
        &self.bits[index]
    }
}

impl From<Vec<bool>> for BitString {
    fn from(bits: Vec<bool>) -> Self {
        Self::new(bits)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bits
            .iter()
            .try_for_each(|&bit| f.write_str(if bit { "1" } else { "0" }))
    }
}
