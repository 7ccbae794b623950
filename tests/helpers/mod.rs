//! Test helpers module
//!
//! Shared utilities for integration tests: database setup against a real
//! Postgres instance, stub payment and identity providers, and builders
//! for templates, patterns and accounts.

pub mod database_helper;
pub mod provider_stubs;
pub mod test_data;

pub use database_helper::*;
pub use provider_stubs::*;
pub use test_data::*;
