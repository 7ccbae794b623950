//! Background jobs module
//!
//! Periodic maintenance work: window roll-forward materialization,
//! trial expiry sweeps, payment timeout sweeps, account archival and
//! data cleanup. Every job is a pure `run` function over a shared
//! [`JobContext`]; scheduling and overlap protection live in the
//! runner and scheduler.

pub mod archival;
pub mod cleanup;
pub mod materialize;
pub mod payment_timeout;
pub mod runner;
pub mod scheduler;
pub mod trial_sweep;

pub use runner::JobRunner;
pub use scheduler::{JobScheduler, JobSkip};

use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::config::Settings;
use crate::database::DatabaseService;
use crate::services::{InstanceMaterializer, IdentityProvider, PaymentGateway};

/// The background jobs the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Materialize,
    TrialSweep,
    PaymentTimeout,
    Archival,
    Cleanup,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::Materialize,
        JobKind::TrialSweep,
        JobKind::PaymentTimeout,
        JobKind::Archival,
        JobKind::Cleanup,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Materialize => "materialize",
            JobKind::TrialSweep => "trial_sweep",
            JobKind::PaymentTimeout => "payment_timeout",
            JobKind::Archival => "archival",
            JobKind::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What one job run scanned and changed
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job: JobKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Rows examined
    pub scanned: u32,
    /// Rows changed, or that would change under dry run
    pub affected: u32,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

impl JobSummary {
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// Everything a job needs to do its work
#[derive(Clone)]
pub struct JobContext {
    pub db: DatabaseService,
    pub materializer: InstanceMaterializer,
    pub gateway: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub settings: Settings,
}
