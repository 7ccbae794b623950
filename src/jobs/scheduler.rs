//! Job scheduling state
//!
//! Tracks, per job, whether a run is in flight and when the last run
//! happened. The state is explicit and queryable instead of being
//! implied by timer internals, so overlapping runs and manual triggers
//! inside the minimum spacing are refused deterministically.

use chrono::{DateTime, Duration, Utc};
use super::{JobKind, JobSummary};

/// Why a run request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSkip {
    /// A run of this job is still in flight
    AlreadyRunning,
    /// The last run started too recently
    RanRecently,
}

#[derive(Debug, Clone)]
pub struct JobScheduler {
    kind: JobKind,
    min_interval: Duration,
    last_run: Option<DateTime<Utc>>,
    running: bool,
    last_summary: Option<JobSummary>,
}

impl JobScheduler {
    pub fn new(kind: JobKind, min_interval: Duration) -> Self {
        Self {
            kind,
            min_interval,
            last_run: None,
            running: false,
            last_summary: None,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn last_summary(&self) -> Option<&JobSummary> {
        self.last_summary.as_ref()
    }

    /// Claim the job for a run starting at `now`
    pub fn try_begin(&mut self, now: DateTime<Utc>) -> Result<(), JobSkip> {
        if self.running {
            return Err(JobSkip::AlreadyRunning);
        }
        if let Some(last_run) = self.last_run {
            if now - last_run < self.min_interval {
                return Err(JobSkip::RanRecently);
            }
        }
        self.running = true;
        self.last_run = Some(now);
        Ok(())
    }

    /// Record a finished run
    pub fn complete(&mut self, summary: JobSummary) {
        self.running = false;
        self.last_run = Some(summary.started_at);
        self.last_summary = Some(summary);
    }

    /// Release the job after a run that failed outright
    ///
    /// The failed start still counts against the minimum spacing so a
    /// crashing job cannot hot-loop.
    pub fn fail(&mut self, now: DateTime<Utc>) {
        self.running = false;
        self.last_run = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(kind: JobKind, started_at: DateTime<Utc>) -> JobSummary {
        JobSummary {
            job: kind,
            started_at,
            finished_at: started_at + Duration::seconds(1),
            scanned: 1,
            affected: 1,
            errors: vec![],
            dry_run: false,
        }
    }

    #[test]
    fn test_overlapping_run_is_refused() {
        let mut scheduler = JobScheduler::new(JobKind::Cleanup, Duration::minutes(5));
        let now = Utc::now();

        assert!(scheduler.try_begin(now).is_ok());
        assert!(scheduler.is_running());
        assert_eq!(scheduler.try_begin(now), Err(JobSkip::AlreadyRunning));
    }

    #[test]
    fn test_minimum_spacing_is_enforced() {
        let mut scheduler = JobScheduler::new(JobKind::Cleanup, Duration::minutes(5));
        let now = Utc::now();

        assert!(scheduler.try_begin(now).is_ok());
        scheduler.complete(summary(JobKind::Cleanup, now));

        assert_eq!(
            scheduler.try_begin(now + Duration::minutes(2)),
            Err(JobSkip::RanRecently)
        );
        assert!(scheduler.try_begin(now + Duration::minutes(5)).is_ok());
    }

    #[test]
    fn test_completion_exposes_summary() {
        let mut scheduler = JobScheduler::new(JobKind::TrialSweep, Duration::zero());
        let now = Utc::now();

        assert!(scheduler.last_summary().is_none());
        scheduler.try_begin(now).unwrap();
        scheduler.complete(summary(JobKind::TrialSweep, now));

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.last_run(), Some(now));
        assert_eq!(scheduler.last_summary().map(|s| s.affected), Some(1));
    }

    #[test]
    fn test_failed_run_releases_and_counts_for_spacing() {
        let mut scheduler = JobScheduler::new(JobKind::Archival, Duration::minutes(10));
        let now = Utc::now();

        scheduler.try_begin(now).unwrap();
        scheduler.fail(now + Duration::seconds(3));

        assert!(!scheduler.is_running());
        assert_eq!(
            scheduler.try_begin(now + Duration::minutes(1)),
            Err(JobSkip::RanRecently)
        );
        assert!(scheduler
            .try_begin(now + Duration::minutes(10) + Duration::seconds(3))
            .is_ok());
    }
}
