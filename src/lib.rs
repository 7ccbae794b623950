//! Reprise
//!
//! A recurring event scheduling engine. This library materializes concrete
//! event instances from recurrence templates, manages free and paid
//! registrations with capacity control, and runs the background jobs that
//! keep the instance window, trials and retention healthy.

pub mod config;
pub mod database;
pub mod jobs;
pub mod models;
pub mod recurrence;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{RepriseError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use jobs::{JobContext, JobKind, JobRunner, JobSummary};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
