//! The evolution engine and its configuration

pub mod config;
#[allow(clippy::module_inception)]
pub mod engine;

pub mod prelude {
    pub use super::config::*;
    pub use super::engine::*;
}
