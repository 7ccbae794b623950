//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{RepriseError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_engine_config(&settings.engine)?;
    validate_jobs_config(&settings.jobs)?;
    validate_payment_config(&settings.payment)?;
    validate_identity_config(&settings.identity)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(RepriseError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(RepriseError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(RepriseError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate engine configuration
fn validate_engine_config(config: &super::EngineConfig) -> Result<()> {
    if config.lookahead_days <= 0 {
        return Err(RepriseError::Config(
            "Lookahead window must be at least 1 day".to_string()
        ));
    }

    if config.trial_days < 0 {
        return Err(RepriseError::Config(
            "Trial length cannot be negative".to_string()
        ));
    }

    Ok(())
}

/// Validate background job configuration
fn validate_jobs_config(config: &super::JobsConfig) -> Result<()> {
    for (name, job) in [
        ("materialize", &config.materialize),
        ("trial_sweep", &config.trial_sweep),
        ("payment_timeout", &config.payment_timeout),
        ("archival", &config.archival),
        ("cleanup", &config.cleanup),
    ] {
        if job.enabled && job.interval_secs == 0 {
            return Err(RepriseError::Config(
                format!("Job {} is enabled with a zero interval", name)
            ));
        }
        if job.min_interval_secs > job.interval_secs && job.enabled {
            return Err(RepriseError::Config(
                format!("Job {} has a min interval above its schedule interval", name)
            ));
        }
    }

    if config.payment_timeout_minutes <= 0 {
        return Err(RepriseError::Config(
            "Payment timeout must be at least 1 minute".to_string()
        ));
    }

    if config.inactive_days <= 0 {
        return Err(RepriseError::Config(
            "Inactivity threshold must be at least 1 day".to_string()
        ));
    }

    if config.retention_days <= 0 {
        return Err(RepriseError::Config(
            "Retention period must be at least 1 day".to_string()
        ));
    }

    Ok(())
}

/// Validate payment gateway configuration
fn validate_payment_config(config: &super::PaymentConfig) -> Result<()> {
    if config.api_url.is_empty() {
        return Err(RepriseError::Config(
            "Payment API URL is required".to_string()
        ));
    }

    if config.secret_key.is_empty() {
        return Err(RepriseError::Config(
            "Payment secret key is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(RepriseError::Config(
            "Payment timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate identity provider configuration
fn validate_identity_config(config: &super::IdentityConfig) -> Result<()> {
    if let Some(ref api_url) = config.api_url {
        if api_url.is_empty() {
            return Err(RepriseError::Config(
                "Identity API URL cannot be empty when set".to_string()
            ));
        }
        if config.timeout_seconds == 0 {
            return Err(RepriseError::Config(
                "Identity timeout must be greater than 0".to_string()
            ));
        }
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(RepriseError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(RepriseError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
