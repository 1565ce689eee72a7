//! # evo-engine
//!
//! A generational evolutionary-optimization engine over binary-encoded
//! real-valued parameters.
//!
//! ## Core Concepts
//!
//! - **Binary encoding**: each dimension `[lo, hi]` gets the fewest bits that
//!   resolve it to a requested precision `eps`
//! - **Pluggable operators**: selection, crossover and mutation behind small
//!   traits, with closed enums for the built-in variants
//! - **Analysis plugins**: observers stepped every `interval` generations and
//!   finalized once, optionally on the coordinator only
//! - **Distributed evaluation**: a coordinator and any number of workers
//!   share fitness evaluation through a minimal collective interface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evo_engine::prelude::*;
//! use rand::SeedableRng;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let encoding = BinaryEncoding::new(vec![(0.0, 10.0)], 0.001)?;
//! let population = Population::initialize(encoding, 50, &mut rng)?;
//!
//! let mut engine = EngineBuilder::new()
//!     .population(population)
//!     .selection(Selection::from(TournamentSelection::binary()))
//!     .crossover(UniformCrossover::new(0.8, 0.5)?)
//!     .mutation(Mutation::from(FlipBitMutation::new(0.1)?))
//!     .analysis(ConsoleOutput::new())
//!     .seed(42)
//!     .build()?;
//!
//! engine.fitness_register(|x| x[0] + 10.0 * (5.0 * x[0]).sin() + 7.0 * (4.0 * x[0]).cos())?;
//! engine.run(100)?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod distributed;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod population;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::prelude::*;
    pub use crate::distributed::prelude::*;
    pub use crate::engine::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
}
