//! Individuals and populations
//!
//! An [`individual::Individual`] binds a chromosome to the shared encoding
//! template; a [`population::Population`] is the ordered set evolved
//! together in one generation.

pub mod individual;
#[allow(clippy::module_inception)]
pub mod population;

pub mod prelude {
    pub use super::individual::*;
    pub use super::population::*;
}
