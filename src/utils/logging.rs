//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the Reprise engine.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
///
/// The returned guard must stay alive for the lifetime of the process,
/// otherwise the file writer shuts down.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "reprise.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log registration lifecycle events with structured data
pub fn log_registration_event(instance_id: Uuid, user_id: i64, action: &str, details: &str) {
    info!(
        instance_id = %instance_id,
        user_id = user_id,
        action = action,
        details = details,
        "Registration event"
    );
}

/// Log a materialization pass over one template
pub fn log_materialization(template_id: Uuid, created: u32, updated: u32, unchanged: u32) {
    if created > 0 || updated > 0 {
        info!(
            template_id = %template_id,
            created = created,
            updated = updated,
            unchanged = unchanged,
            "Instances materialized"
        );
    } else {
        debug!(
            template_id = %template_id,
            unchanged = unchanged,
            "Materialization pass made no changes"
        );
    }
}

/// Log a background job run summary
pub fn log_job_run(job: &str, scanned: u32, affected: u32, error_count: usize, dry_run: bool, duration_ms: u64) {
    if error_count > 0 {
        warn!(
            job = job,
            scanned = scanned,
            affected = affected,
            errors = error_count,
            dry_run = dry_run,
            duration_ms = duration_ms,
            "Job completed with errors"
        );
    } else {
        info!(
            job = job,
            scanned = scanned,
            affected = affected,
            dry_run = dry_run,
            duration_ms = duration_ms,
            "Job completed"
        );
    }
}

/// Log external API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}
