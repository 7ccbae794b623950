//! Retention cleanup
//!
//! Two independent passes share one job slot. Legacy meeting rows from
//! the previous system are deleted once their schedule instant is in
//! the past; rows whose date cannot be read under any historical shape
//! are logged and kept for manual review. Past event instances older
//! than the retention window are deleted outright.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use crate::utils::errors::Result;
use super::{JobContext, JobKind, JobSummary};

const CLEANUP_BATCH: i64 = 500;

pub async fn run(ctx: &JobContext, now: DateTime<Utc>, dry_run: bool) -> Result<JobSummary> {
    let started_at = Utc::now();
    let mut scanned = 0u32;
    let mut affected = 0u32;

    let meetings = ctx.db.instances.list_legacy_meetings(CLEANUP_BATCH).await?;
    scanned += meetings.len() as u32;

    let mut expired_meetings = Vec::new();
    for meeting in &meetings {
        match meeting.scheduled_at() {
            Some(at) if at < now => expired_meetings.push(meeting.id),
            Some(_) => {}
            None => warn!(
                "Legacy meeting {} has no readable schedule date, keeping for review",
                meeting.id
            ),
        }
    }

    if dry_run {
        affected += expired_meetings.len() as u32;
    } else if !expired_meetings.is_empty() {
        let deleted = ctx.db.instances.delete_legacy_meetings(&expired_meetings).await?;
        affected += deleted as u32;
        info!("Deleted {} expired legacy meetings", deleted);
    }

    let retention_cutoff = now - Duration::days(ctx.settings.jobs.retention_days);
    let stale = ctx
        .db
        .instances
        .list_past_before(retention_cutoff, CLEANUP_BATCH)
        .await?;
    scanned += stale.len() as u32;

    if dry_run {
        affected += stale.len() as u32;
    } else if !stale.is_empty() {
        let ids: Vec<_> = stale.iter().map(|instance| instance.id).collect();
        let deleted = ctx.db.instances.delete_by_ids(&ids).await?;
        affected += deleted as u32;
        info!("Deleted {} instances past the retention window", deleted);
    }

    Ok(JobSummary {
        job: JobKind::Cleanup,
        started_at,
        finished_at: Utc::now(),
        scanned,
        affected,
        errors: Vec::new(),
        dry_run,
    })
}
