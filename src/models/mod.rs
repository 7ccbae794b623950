//! Data models module
//!
//! This module contains all data structures used throughout the engine

pub mod template;
pub mod instance;
pub mod registration;
pub mod account;

// Re-export commonly used models
pub use template::{EventTemplate, RecurrencePattern, PatternKind, CreateTemplateRequest, UpdateTemplateRequest};
pub use instance::{EventInstance, InstanceStatus, CreateInstanceRequest, LegacyMeeting};
pub use registration::{Registration, RegistrationStatus, CreateRegistrationRequest};
pub use account::{SubscriptionRecord, SubscriptionStatus, SubscriptionPlan, CreateSubscriptionRequest, UserAccount, CreateAccountRequest, ArchivedUser};
