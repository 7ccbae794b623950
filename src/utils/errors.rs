//! Error handling for Reprise
//!
//! This module defines the main error types used throughout the engine
//! and provides a unified error handling strategy.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the Reprise engine
#[derive(Error, Debug)]
pub enum RepriseError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Payment gateway error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid recurrence pattern: {0}")]
    InvalidPattern(String),

    #[error("Capacity exceeded for instance {instance_id}: requested {requested}, remaining {remaining}")]
    CapacityExceeded { instance_id: Uuid, requested: i32, remaining: i32 },

    #[error("User {user_id} already has an active registration for instance {instance_id}")]
    AlreadyRegistered { instance_id: Uuid, user_id: i64 },

    #[error("Pattern edit would drop instance {instance_id} which has {active_registrations} active registrations")]
    RegisteredInstanceConflict { instance_id: Uuid, active_registrations: i64 },

    #[error("Stale materialization for template {template_id}: {detail}")]
    StaleMaterialization { template_id: Uuid, detail: String },

    #[error("External verification failed: {0}")]
    ExternalVerification(String),

    #[error("Template not found: {template_id}")]
    TemplateNotFound { template_id: Uuid },

    #[error("Instance not found: {instance_id}")]
    InstanceNotFound { instance_id: Uuid },

    #[error("Registration not found: {registration_id}")]
    RegistrationNotFound { registration_id: Uuid },

    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Payment gateway specific errors
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment request failed: {0}")]
    RequestFailed(String),

    #[error("Payment gateway timeout")]
    Timeout,

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Payment gateway unavailable")]
    ServiceUnavailable,
}

/// Identity provider specific errors
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity request failed: {0}")]
    RequestFailed(String),

    #[error("Identity provider timeout")]
    Timeout,

    #[error("Identity not found: {0}")]
    NotFound(String),

    #[error("Identity provider unavailable")]
    ServiceUnavailable,
}

/// Result type alias for Reprise operations
pub type Result<T> = std::result::Result<T, RepriseError>;

/// Result type alias for payment gateway operations
pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

/// Result type alias for identity provider operations
pub type IdentityResult<T> = std::result::Result<T, IdentityError>;

impl RepriseError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            RepriseError::Database(_) => false,
            RepriseError::Migration(_) => false,
            RepriseError::Payment(_) => true,
            RepriseError::Identity(_) => true,
            RepriseError::Config(_) => false,
            RepriseError::InvalidPattern(_) => false,
            RepriseError::CapacityExceeded { .. } => false,
            RepriseError::AlreadyRegistered { .. } => false,
            RepriseError::RegisteredInstanceConflict { .. } => false,
            RepriseError::StaleMaterialization { .. } => true,
            RepriseError::ExternalVerification(_) => true,
            RepriseError::TemplateNotFound { .. } => false,
            RepriseError::InstanceNotFound { .. } => false,
            RepriseError::RegistrationNotFound { .. } => false,
            RepriseError::AccountNotFound { .. } => false,
            RepriseError::InvalidStateTransition { .. } => false,
            RepriseError::Http(_) => true,
            RepriseError::Serialization(_) => false,
            RepriseError::Io(_) => true,
            RepriseError::UrlParse(_) => false,
            RepriseError::InvalidInput(_) => false,
            RepriseError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RepriseError::Database(_) => ErrorSeverity::Critical,
            RepriseError::Migration(_) => ErrorSeverity::Critical,
            RepriseError::Config(_) => ErrorSeverity::Critical,
            RepriseError::StaleMaterialization { .. } => ErrorSeverity::Warning,
            RepriseError::ExternalVerification(_) => ErrorSeverity::Warning,
            RepriseError::CapacityExceeded { .. } => ErrorSeverity::Info,
            RepriseError::AlreadyRegistered { .. } => ErrorSeverity::Info,
            RepriseError::InvalidPattern(_) => ErrorSeverity::Info,
            RepriseError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
