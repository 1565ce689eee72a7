//! Error types for evo-engine
//!
//! This module defines all error types used throughout the library. Every
//! category except [`EngineError::Objective`] signals programmer
//! misconfiguration and aborts a run at the point of detection.

use thiserror::Error;

/// Error raised by a user objective function
pub type ObjectiveError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid construction-time parameters
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A probability-like parameter fell outside `[0, 1]`
    #[error("{name} must be in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    /// A dimension range is empty, inverted or not finite
    #[error("Invalid range for dimension {dimension}: [{lo}, {hi}]")]
    InvalidRange { dimension: usize, lo: f64, hi: f64 },

    /// A precision is not strictly positive and finite
    #[error("Invalid precision for dimension {dimension}: eps = {eps}")]
    InvalidPrecision { dimension: usize, eps: f64 },

    /// The requested precision needs more bits than a dimension can hold
    #[error("Dimension {dimension} needs {required} bits, at most {max} are supported")]
    PrecisionTooFine {
        dimension: usize,
        required: u32,
        max: u32,
    },

    /// A template without any dimension
    #[error("Template must have at least one dimension")]
    NoDimensions,

    /// Population size of zero
    #[error("Population size must be positive")]
    EmptyPopulation,

    /// Individuals built from different templates were mixed
    #[error("All individuals must share the population template")]
    TemplateMismatch,

    /// Generic invalid parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A required builder component was not supplied
    #[error("{0} must be specified")]
    Missing(&'static str),

    /// `run` was called without an objective
    #[error("No fitness function registered")]
    MissingObjective,

    /// A second objective was registered
    #[error("A fitness function is already registered")]
    ObjectiveAlreadyRegistered,
}

/// Operator invoked on invalid input
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperatorError {
    /// Selection over an empty population
    #[error("Selection failed: population is empty")]
    EmptyPopulation,

    /// Fitness slice does not line up with the population
    #[error("Selection failed: {fitness} fitness values for {population} individuals")]
    FitnessLengthMismatch { population: usize, fitness: usize },

    /// Crossover parents of different chromosome lengths
    #[error("Crossover failed: parent lengths {left} and {right} differ")]
    ParentLengthMismatch { left: usize, right: usize },
}

/// Illegal lifecycle transition
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    /// The engine already completed a run
    #[error("Engine has already run; engines are single-use")]
    AlreadyRun,

    /// A previous run aborted with an error
    #[error("Engine aborted during a previous run")]
    Aborted,

    /// Objective or plugin registration after the run started
    #[error("Registration is only possible before the engine runs")]
    RegistrationClosed,
}

/// Chromosome does not fit its template
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodingError {
    /// Chromosome length differs from the template's total bit count
    #[error("Chromosome length mismatch: expected {expected} bits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Failure inside the collective-operations layer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommError {
    /// Payload could not be encoded or decoded
    #[error("Payload codec error: {0}")]
    Codec(String),

    /// Non-coordinator passed data only the coordinator may provide, or vice versa
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A peer disappeared or the transport broke
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for CommError {
    fn from(err: serde_json::Error) -> Self {
        CommError::Codec(err.to_string())
    }
}

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Operator error
    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),

    /// Lifecycle error
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Encoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The user objective failed; surfaced as-is
    #[error(transparent)]
    Objective(ObjectiveError),

    /// Another participant of a distributed run failed
    #[error("Rank {rank} failed: {message}")]
    Remote { rank: usize, message: String },

    /// Collective operation failed
    #[error("Communication error: {0}")]
    Communication(#[from] CommError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Validate that a probability-like parameter lies in `[0, 1]`
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}
