//! Core types and utilities for the cellsim organism simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use stats::*;
pub use store::*;
