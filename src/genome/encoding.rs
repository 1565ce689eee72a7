//! Binary encoding of real-valued parameters
//!
//! A [`BinaryEncoding`] is the template shared by every individual of a
//! population: it fixes the interval and precision of each dimension and,
//! from those, the number of bits each dimension occupies in the chromosome.
//!
//! A dimension over `[lo, hi]` with precision `eps` gets the smallest bit
//! count `n >= 1` such that `(hi - lo) / (2^n - 1) <= eps`. Its bits are read
//! most significant first as an unsigned integer `v` and decoded to
//! `lo + (hi - lo) * v / (2^n - 1)`, which is monotonic in `v` and always
//! lands in `[lo, hi]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EncodingError};
use crate::genome::bit_string::BitString;

/// Largest bit count of a single dimension; every integer up to `2^53 - 1` is exact in f64
pub const MAX_BITS_PER_DIMENSION: u32 = 53;

/// Interval and precision of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Lower bound (inclusive)
    pub lo: f64,
    /// Upper bound (inclusive)
    pub hi: f64,
    /// Required precision
    pub eps: f64,
}

impl Dimension {
    /// Create a new dimension
    pub fn new(lo: f64, hi: f64, eps: f64) -> Self {
        Self { lo, hi, eps }
    }

    /// Get the range (hi - lo)
    pub fn range(&self) -> f64 {
        self.hi - self.lo
    }

    /// Check if a value is within the interval
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if !self.lo.is_finite() || !self.hi.is_finite() || self.lo > self.hi {
            return Err(ConfigError::InvalidRange {
                dimension: index,
                lo: self.lo,
                hi: self.hi,
            });
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ConfigError::InvalidPrecision {
                dimension: index,
                eps: self.eps,
            });
        }
        Ok(())
    }
}

impl From<(f64, f64, f64)> for Dimension {
    fn from((lo, hi, eps): (f64, f64, f64)) -> Self {
        Self::new(lo, hi, eps)
    }
}

/// Spacing between adjacent decoded values for a range split over `bits` bits
fn resolution(range: f64, bits: u32) -> f64 {
    range / max_value(bits) as f64
}

fn max_value(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Minimum bit count reaching `eps` over `range`
fn required_bits(range: f64, eps: f64) -> u32 {
    if range <= 0.0 {
        return 1;
    }
    let estimate = (range / eps + 1.0).log2().ceil();
    let mut bits = if estimate.is_finite() && estimate >= 1.0 {
        estimate.min(64.0) as u32
    } else {
        1
    };
    // The float estimate can be off by one either way near powers of two.
    while bits > 1 && resolution(range, bits - 1) <= eps {
        bits -= 1;
    }
    while bits < 64 && resolution(range, bits) > eps {
        bits += 1;
    }
    bits
}

/// Template mapping chromosomes to real-valued solution vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct BinaryEncoding {
    dimensions: Vec<Dimension>,
    lengths: Vec<u32>,
    offsets: Vec<usize>,
    total_bits: usize,
}

impl BinaryEncoding {
    /// Create an encoding with the same precision for every range
    pub fn new(ranges: Vec<(f64, f64)>, eps: f64) -> Result<Self, ConfigError> {
        Self::from_dimensions(
            ranges
                .into_iter()
                .map(|(lo, hi)| Dimension::new(lo, hi, eps))
                .collect(),
        )
    }

    /// Create an encoding with a precision per range
    pub fn with_precisions(ranges: Vec<(f64, f64)>, eps: Vec<f64>) -> Result<Self, ConfigError> {
        if ranges.len() != eps.len() {
            return Err(ConfigError::InvalidParameter {
                name: "eps",
                reason: format!("{} precisions for {} ranges", eps.len(), ranges.len()),
            });
        }
        Self::from_dimensions(
            ranges
                .into_iter()
                .zip(eps)
                .map(|((lo, hi), eps)| Dimension::new(lo, hi, eps))
                .collect(),
        )
    }

    /// Create an encoding from fully specified dimensions
    pub fn from_dimensions(dimensions: Vec<Dimension>) -> Result<Self, ConfigError> {
        if dimensions.is_empty() {
            return Err(ConfigError::NoDimensions);
        }

        let mut lengths = Vec::with_capacity(dimensions.len());
        let mut offsets = Vec::with_capacity(dimensions.len());
        let mut total_bits = 0usize;

        for (i, dim) in dimensions.iter().enumerate() {
            dim.validate(i)?;
            let bits = required_bits(dim.range(), dim.eps);
            if bits > MAX_BITS_PER_DIMENSION {
                return Err(ConfigError::PrecisionTooFine {
                    dimension: i,
                    required: bits,
                    max: MAX_BITS_PER_DIMENSION,
                });
            }
            offsets.push(total_bits);
            lengths.push(bits);
            total_bits += bits as usize;
        }

        Ok(Self {
            dimensions,
            lengths,
            offsets,
            total_bits,
        })
    }

    /// Number of real-valued dimensions
    pub fn dimension(&self) -> usize {
        self.dimensions.len()
    }

    /// The dimensions, in chromosome order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Total chromosome length in bits
    pub fn total_bits(&self) -> usize {
        self.total_bits
    }

    /// Bit count of each dimension
    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    /// Bit range occupied by dimension `index` within the chromosome
    pub fn bit_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        let start = *self.offsets.get(index)?;
        Some(start..start + self.lengths[index] as usize)
    }

    /// Actual spacing between adjacent decoded values of dimension `index` (always `<= eps`)
    pub fn resolution(&self, index: usize) -> Option<f64> {
        let dim = self.dimensions.get(index)?;
        Some(resolution(dim.range(), self.lengths[index]))
    }

    /// Draw a chromosome with independently uniform bits
    pub fn random_chromosome<R: Rng + ?Sized>(&self, rng: &mut R) -> BitString {
        BitString::random(self.total_bits, rng)
    }

    /// Decode a chromosome into one real value per dimension
    pub fn decode(&self, chromosome: &BitString) -> Result<Vec<f64>, EncodingError> {
        if chromosome.len() != self.total_bits {
            return Err(EncodingError::LengthMismatch {
                expected: self.total_bits,
                actual: chromosome.len(),
            });
        }

        Ok(self.decode_unchecked(chromosome))
    }

    /// Decode a chromosome already known to have `total_bits` bits
    pub(crate) fn decode_unchecked(&self, chromosome: &BitString) -> Vec<f64> {
        self.dimensions
            .iter()
            .zip(self.offsets.iter().zip(&self.lengths))
            .map(|(dim, (&start, &bits))| {
                let value = chromosome.window_u64(start, bits as usize).unwrap_or(0);
                let fraction = value as f64 / max_value(bits) as f64;
                (dim.lo + dim.range() * fraction).clamp(dim.lo, dim.hi)
            })
            .collect()
    }

    /// Encode a solution vector to the nearest representable chromosome
    ///
    /// Values are clamped to their interval first.
    pub fn encode(&self, solution: &[f64]) -> Result<BitString, EncodingError> {
        if solution.len() != self.dimensions.len() {
            return Err(EncodingError::LengthMismatch {
                expected: self.dimensions.len(),
                actual: solution.len(),
            });
        }

        let mut bits = Vec::with_capacity(self.total_bits);
        for ((dim, &bits_len), &x) in self.dimensions.iter().zip(&self.lengths).zip(solution) {
            let max = max_value(bits_len);
            let value = if dim.range() > 0.0 {
                let fraction = (x.clamp(dim.lo, dim.hi) - dim.lo) / dim.range();
                ((fraction * max as f64).round() as u64).min(max)
            } else {
                0
            };
            bits.extend_from_slice(BitString::from_u64(value, bits_len as usize).bits());
        }
        Ok(BitString::new(bits))
    }
}

impl TryFrom<Vec<Dimension>> for BinaryEncoding {
    type Error = ConfigError;

    fn try_from(dimensions: Vec<Dimension>) -> Result<Self, Self::Error> {
        Self::from_dimensions(dimensions)
    }
}

impl From<BinaryEncoding> for Vec<Dimension> {
    fn from(encoding: BinaryEncoding) -> Self {
        encoding.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_required_bits_minimal() {
        // 10 / (2^14 - 1) ~ 0.00061 <= 0.001, 10 / (2^13 - 1) ~ 0.00122 > 0.001
        let enc = BinaryEncoding::new(vec![(0.0, 10.0)], 0.001).unwrap();
        assert_eq!(enc.lengths(), &[14]);
        assert!(enc.resolution(0).unwrap() <= 0.001);

        let enc = BinaryEncoding::new(vec![(0.0, 1.0)], 0.001).unwrap();
        assert_eq!(enc.lengths(), &[10]);
    }

    #[test]
    fn test_required_bits_exact_boundary() {
        // 3 / (2^2 - 1) == 1 exactly
        let enc = BinaryEncoding::new(vec![(0.0, 3.0)], 1.0).unwrap();
        assert_eq!(enc.lengths(), &[2]);
    }

    #[test]
    fn test_degenerate_range_uses_one_bit() {
        let enc = BinaryEncoding::new(vec![(2.5, 2.5)], 0.1).unwrap();
        assert_eq!(enc.lengths(), &[1]);
        let solution = enc.decode(&BitString::ones(1)).unwrap();
        assert_eq!(solution, vec![2.5]);
    }

    #[test]
    fn test_offsets_and_total_bits() {
        let enc = BinaryEncoding::with_precisions(vec![(0.0, 1.0), (-2.0, 2.0)], vec![0.5, 0.001])
            .unwrap();
        assert_eq!(enc.lengths(), &[2, 12]);
        assert_eq!(enc.total_bits(), 14);
        assert_eq!(enc.bit_range(0), Some(0..2));
        assert_eq!(enc.bit_range(1), Some(2..14));
        assert_eq!(enc.bit_range(2), None);
    }

    #[test]
    fn test_decode_extremes() {
        let enc = BinaryEncoding::new(vec![(-2.0, 2.0), (0.0, 10.0)], 0.01).unwrap();
        let lo = enc.decode(&BitString::zeros(enc.total_bits())).unwrap();
        let hi = enc.decode(&BitString::ones(enc.total_bits())).unwrap();
        assert_eq!(lo, vec![-2.0, 0.0]);
        assert_relative_eq!(hi[0], 2.0);
        assert_relative_eq!(hi[1], 10.0);
    }

    #[test]
    fn test_decode_length_mismatch() {
        let enc = BinaryEncoding::new(vec![(0.0, 1.0)], 0.001).unwrap();
        let err = enc.decode(&BitString::zeros(3)).unwrap_err();
        assert_eq!(
            err,
            EncodingError::LengthMismatch {
                expected: 10,
                actual: 3
            }
        );
    }

    #[test]
    fn test_encode_decode_nearest() {
        let enc = BinaryEncoding::new(vec![(0.0, 10.0), (-2.0, 2.0)], 0.001).unwrap();
        let chromosome = enc.encode(&[3.3, -1.25]).unwrap();
        let solution = enc.decode(&chromosome).unwrap();
        assert!((solution[0] - 3.3).abs() <= enc.resolution(0).unwrap());
        assert!((solution[1] + 1.25).abs() <= enc.resolution(1).unwrap());
    }

    #[test]
    fn test_invalid_templates() {
        assert_eq!(
            BinaryEncoding::new(vec![], 0.1).unwrap_err(),
            ConfigError::NoDimensions
        );
        assert!(matches!(
            BinaryEncoding::new(vec![(1.0, 0.0)], 0.1),
            Err(ConfigError::InvalidRange { dimension: 0, .. })
        ));
        assert!(matches!(
            BinaryEncoding::new(vec![(0.0, 1.0)], 0.0),
            Err(ConfigError::InvalidPrecision { .. })
        ));
        assert!(matches!(
            BinaryEncoding::new(vec![(0.0, 1.0e6)], 1.0e-12),
            Err(ConfigError::PrecisionTooFine { .. })
        ));
        assert!(BinaryEncoding::with_precisions(vec![(0.0, 1.0)], vec![0.1, 0.1]).is_err());
    }

    #[test]
    fn test_encoding_serde_validates() {
        let enc = BinaryEncoding::new(vec![(0.0, 1.0)], 0.01).unwrap();
        let json = serde_json::to_string(&enc).unwrap();
        let back: BinaryEncoding = serde_json::from_str(&json).unwrap();
        assert_eq!(enc, back);

        let bad = r#"[{"lo": 1.0, "hi": 0.0, "eps": 0.1}]"#;
        assert!(serde_json::from_str::<BinaryEncoding>(bad).is_err());
    }
}
