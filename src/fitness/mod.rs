//! Fitness evaluation
//!
//! This module provides the fitness adapter wrapping the user objective and
//! the transforms that turn raw objective values into selection weights.

pub mod adapter;
pub mod normalization;

pub mod prelude {
    pub use super::adapter::*;
    pub use super::normalization::*;
}
