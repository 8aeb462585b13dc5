//! Domain types for the running order and judging core.

pub mod domain;
mod error;

pub use domain::*;
pub use error::CoreError;
