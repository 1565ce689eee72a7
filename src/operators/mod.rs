//! Genetic operators
//!
//! Selection, crossover and mutation over binary chromosomes. The engine
//! drives them through the closed [`selection::Selection`] and
//! [`mutation::Mutation`] enums, or any other type implementing the traits.

pub mod crossover;
pub mod mutation;
pub mod selection;
pub mod traits;

pub mod prelude {
    pub use super::crossover::*;
    pub use super::mutation::*;
    pub use super::selection::*;
    pub use super::traits::*;
}
