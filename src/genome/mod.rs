//! Chromosome representation
//!
//! This module provides the bit string chromosome and the binary encoding
//! that maps it to real-valued parameters.

pub mod bit_string;
pub mod encoding;

pub mod prelude {
    pub use super::bit_string::*;
    pub use super::encoding::*;
}
