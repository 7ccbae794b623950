//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod template;
pub mod instance;
pub mod registration;
pub mod account;

// Re-export repositories
pub use template::TemplateRepository;
pub use instance::{InstanceRepository, UpsertOutcome};
pub use registration::RegistrationRepository;
pub use account::AccountRepository;
