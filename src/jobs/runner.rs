//! Background job runner
//!
//! Owns one scheduler per job kind and a spawned loop per enabled job.
//! Every tick goes through the scheduler guard, so a manually triggered
//! run and a periodic run can never overlap for the same job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::JobConfig;
use crate::utils::errors::Result;
use crate::utils::logging::log_job_run;

use super::scheduler::{JobScheduler, JobSkip};
use super::{JobContext, JobKind, JobSummary};

/// Runs the periodic jobs and guards them against overlap
pub struct JobRunner {
    ctx: JobContext,
    schedulers: Arc<Mutex<HashMap<JobKind, JobScheduler>>>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl JobRunner {
    /// Create a runner with one scheduler per job kind
    pub fn new(ctx: JobContext) -> Self {
        let mut schedulers = HashMap::new();
        for kind in JobKind::ALL {
            let config = job_config(&ctx, kind);
            let min_interval = chrono::Duration::seconds(config.min_interval_secs as i64);
            schedulers.insert(kind, JobScheduler::new(kind, min_interval));
        }

        Self {
            ctx,
            schedulers: Arc::new(Mutex::new(schedulers)),
            handles: Vec::new(),
        }
    }

    /// Spawn the periodic loop for every enabled job
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            warn!("Job runner is already started");
            return;
        }

        for kind in JobKind::ALL {
            let config = job_config(&self.ctx, kind).clone();
            if !config.enabled {
                info!("Job {} is disabled, not scheduling", kind);
                continue;
            }

            let ctx = self.ctx.clone();
            let schedulers = Arc::clone(&self.schedulers);

            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));

                loop {
                    ticker.tick().await;

                    match run_guarded(&ctx, &schedulers, kind, config.dry_run).await {
                        Ok(Some(summary)) => {
                            log_job_run(
                                summary.job.name(),
                                summary.scanned,
                                summary.affected,
                                summary.errors.len(),
                                summary.dry_run,
                                summary.duration_ms(),
                            );
                        }
                        Ok(None) => {}
                        Err(err) => {
                            error!("Job {} failed: {}", kind, err);
                        }
                    }
                }
            });

            self.handles.push(handle);
            info!(
                "Scheduled job {} every {}s (dry_run: {})",
                kind, config.interval_secs, config.dry_run
            );
        }
    }

    /// Abort all job loops
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Stopped job runner");
    }

    /// Run a single job immediately, subject to the same overlap and
    /// spacing guards as the periodic loops.
    ///
    /// Returns `Ok(None)` when the scheduler refused the run.
    pub async fn run_once(&self, kind: JobKind, dry_run: bool) -> Result<Option<JobSummary>> {
        run_guarded(&self.ctx, &self.schedulers, kind, dry_run).await
    }

    /// Latest completed summary for a job, if any
    pub async fn last_summary(&self, kind: JobKind) -> Option<JobSummary> {
        let schedulers = self.schedulers.lock().await;
        schedulers
            .get(&kind)
            .and_then(|scheduler| scheduler.last_summary().cloned())
    }
}

fn job_config(ctx: &JobContext, kind: JobKind) -> &JobConfig {
    let jobs = &ctx.settings.jobs;
    match kind {
        JobKind::Materialize => &jobs.materialize,
        JobKind::TrialSweep => &jobs.trial_sweep,
        JobKind::PaymentTimeout => &jobs.payment_timeout,
        JobKind::Archival => &jobs.archival,
        JobKind::Cleanup => &jobs.cleanup,
    }
}

/// Acquire the scheduler slot, dispatch, and record the outcome.
///
/// The lock is held only around scheduler state changes, never across
/// the job body.
async fn run_guarded(
    ctx: &JobContext,
    schedulers: &Arc<Mutex<HashMap<JobKind, JobScheduler>>>,
    kind: JobKind,
    dry_run: bool,
) -> Result<Option<JobSummary>> {
    let now = Utc::now();

    {
        let mut guard = schedulers.lock().await;
        if let Some(scheduler) = guard.get_mut(&kind) {
            match scheduler.try_begin(now) {
                Ok(()) => {}
                Err(JobSkip::AlreadyRunning) => {
                    debug!("Job {} is still running, skipping this tick", kind);
                    return Ok(None);
                }
                Err(JobSkip::RanRecently) => {
                    debug!("Job {} ran recently, skipping this tick", kind);
                    return Ok(None);
                }
            }
        }
    }

    let result = dispatch(ctx, kind, dry_run).await;

    let mut guard = schedulers.lock().await;
    if let Some(scheduler) = guard.get_mut(&kind) {
        match &result {
            Ok(summary) => scheduler.complete(summary.clone()),
            Err(_) => scheduler.fail(Utc::now()),
        }
    }

    result.map(Some)
}

async fn dispatch(ctx: &JobContext, kind: JobKind, dry_run: bool) -> Result<JobSummary> {
    let now = Utc::now();
    match kind {
        JobKind::Materialize => super::materialize::run(ctx, now, dry_run).await,
        JobKind::TrialSweep => super::trial_sweep::run(ctx, now, dry_run).await,
        JobKind::PaymentTimeout => super::payment_timeout::run(ctx, now, dry_run).await,
        JobKind::Archival => super::archival::run(ctx, now, dry_run).await,
        JobKind::Cleanup => super::cleanup::run(ctx, now, dry_run).await,
    }
}
