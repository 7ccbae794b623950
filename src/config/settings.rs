//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub jobs: JobsConfig,
    pub payment: PaymentConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Scheduling engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// How far ahead instances are materialized, in days
    pub lookahead_days: i64,
    /// Trial length granted to new accounts, in days
    pub trial_days: i64,
}

/// Per-job scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    pub enabled: bool,
    /// Seconds between scheduled runs
    pub interval_secs: u64,
    /// Minimum seconds between two starts, enforced even for manual runs
    pub min_interval_secs: u64,
    pub dry_run: bool,
}

/// Background job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    pub materialize: JobConfig,
    pub trial_sweep: JobConfig,
    pub payment_timeout: JobConfig,
    pub archival: JobConfig,
    pub cleanup: JobConfig,
    /// Minutes a pending payment may linger before the sweep abandons it
    pub payment_timeout_minutes: i64,
    /// Days without activity before an account is archived
    pub inactive_days: i64,
    /// Days past instances and legacy rows are retained before cleanup
    pub retention_days: i64,
}

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
    pub api_url: String,
    pub secret_key: String,
    pub timeout_seconds: u64,
}

/// External identity provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Absent means no external identity store is wired up
    pub api_url: Option<String>,
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory the rolling log file is written into
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("REPRISE").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::RepriseError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/reprise".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            engine: EngineConfig {
                lookahead_days: 90,
                trial_days: 14,
            },
            jobs: JobsConfig {
                materialize: JobConfig {
                    enabled: true,
                    interval_secs: 3600,
                    min_interval_secs: 300,
                    dry_run: false,
                },
                trial_sweep: JobConfig {
                    enabled: true,
                    interval_secs: 21600,
                    min_interval_secs: 3600,
                    dry_run: false,
                },
                payment_timeout: JobConfig {
                    enabled: true,
                    interval_secs: 900,
                    min_interval_secs: 300,
                    dry_run: false,
                },
                archival: JobConfig {
                    enabled: false,
                    interval_secs: 86400,
                    min_interval_secs: 21600,
                    dry_run: true,
                },
                cleanup: JobConfig {
                    enabled: true,
                    interval_secs: 86400,
                    min_interval_secs: 3600,
                    dry_run: false,
                },
                payment_timeout_minutes: 30,
                inactive_days: 180,
                retention_days: 365,
            },
            payment: PaymentConfig {
                api_url: "https://api.paystack.co".to_string(),
                secret_key: String::new(),
                timeout_seconds: 10,
            },
            identity: IdentityConfig {
                api_url: None,
                timeout_seconds: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let mut settings = Settings::default();
        // Secret key is the only hole in the defaults
        settings.payment.secret_key = "sk_test_x".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_window_and_trial() {
        let settings = Settings::default();
        assert_eq!(settings.engine.lookahead_days, 90);
        assert_eq!(settings.engine.trial_days, 14);
        assert_eq!(settings.jobs.payment_timeout_minutes, 30);
    }
}
