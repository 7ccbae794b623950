//! Utility modules
//!
//! This module contains common utilities used throughout the engine,
//! including error handling, logging setup, and date normalization.

pub mod errors;
pub mod logging;
pub mod time;

pub use errors::{RepriseError, Result};
