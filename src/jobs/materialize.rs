//! Window roll-forward job
//!
//! As time advances, the fixed-length lookahead window uncovers new
//! occurrences. This job re-materializes every active template so
//! instances keep existing ahead of the calendar, and retries any
//! occurrence skipped by an earlier run.

use std::collections::HashSet;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use crate::models::instance::EventInstance;
use crate::recurrence::occurrences_in_window;
use crate::utils::errors::Result;
use super::{JobContext, JobKind, JobSummary};

pub async fn run(ctx: &JobContext, now: DateTime<Utc>, dry_run: bool) -> Result<JobSummary> {
    let started_at = Utc::now();
    let mut errors = Vec::new();

    let (scanned, affected) = if dry_run {
        preview(ctx, now, &mut errors).await?
    } else {
        let (report, scanned, run_errors) = ctx.materializer.materialize_all(now).await?;
        errors = run_errors;
        (scanned, report.created + report.updated)
    };

    Ok(JobSummary {
        job: JobKind::Materialize,
        started_at,
        finished_at: Utc::now(),
        scanned,
        affected,
        errors,
        dry_run,
    })
}

/// Count the instances a real run would create, without writing
async fn preview(ctx: &JobContext, now: DateTime<Utc>, errors: &mut Vec<String>) -> Result<(u32, u32)> {
    let templates = ctx.db.templates.list_active().await?;
    let window_end = now + Duration::days(ctx.settings.engine.lookahead_days);

    let mut missing = 0u32;
    for template in &templates {
        let occurrences = match occurrences_in_window(&template.pattern, now, window_end) {
            Ok(occurrences) => occurrences,
            Err(err) => {
                errors.push(format!("template {}: {}", template.id, err));
                continue;
            }
        };

        let existing: HashSet<Uuid> = ctx
            .db
            .instances
            .list_future_for_template(template.id, now)
            .await?
            .into_iter()
            .map(|instance| instance.id)
            .collect();

        missing += occurrences
            .iter()
            .filter(|occurrence| {
                !existing.contains(&EventInstance::deterministic_id(template.id, occurrence.utc))
            })
            .count() as u32;
    }

    Ok((templates.len() as u32, missing))
}
