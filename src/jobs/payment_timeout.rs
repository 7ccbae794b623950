//! Abandoned payment sweep
//!
//! Pending-payment registrations hold no seat, so an abandoned checkout
//! costs nothing in capacity. This job exists for hygiene: rows stuck in
//! `pending_payment` past the timeout are moved to `abandoned` so they
//! stop surfacing in user history and duplicate-registration checks.

use chrono::{DateTime, Duration, Utc};
use crate::utils::errors::Result;
use super::{JobContext, JobKind, JobSummary};

pub async fn run(ctx: &JobContext, now: DateTime<Utc>, dry_run: bool) -> Result<JobSummary> {
    let started_at = Utc::now();
    let cutoff = now - Duration::minutes(ctx.settings.jobs.payment_timeout_minutes);

    let scanned = ctx
        .db
        .registrations
        .count_pending_older_than(cutoff)
        .await? as u32;

    let affected = if dry_run {
        scanned
    } else {
        ctx.db
            .registrations
            .mark_abandoned_older_than(cutoff, now)
            .await? as u32
    };

    Ok(JobSummary {
        job: JobKind::PaymentTimeout,
        started_at,
        finished_at: Utc::now(),
        scanned,
        affected,
        errors: Vec::new(),
        dry_run,
    })
}
