//! Analysis plugins
//!
//! Observers attached to an engine: the [`traits::AnalysisPlugin`] contract,
//! lifecycle bookkeeping, and the built-in [`fitness_store::FitnessStore`]
//! and [`console_output::ConsoleOutput`].

pub mod console_output;
pub mod fitness_store;
pub mod traits;

pub mod prelude {
    pub use super::console_output::*;
    pub use super::fitness_store::*;
    pub use super::traits::*;
}
