//! Inactive account archival
//!
//! Moves long-dormant accounts out of the live table into the archive,
//! then asks the identity provider to forget the external identity. The
//! database move commits first: a failed identity call leaves the
//! archive intact and is reported for manual follow-up rather than
//! rolled back.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use crate::utils::errors::Result;
use crate::utils::logging::log_api_error;
use super::{JobContext, JobKind, JobSummary};

const ARCHIVAL_BATCH: i64 = 100;
const ARCHIVAL_REASON: &str = "inactivity";

pub async fn run(ctx: &JobContext, now: DateTime<Utc>, dry_run: bool) -> Result<JobSummary> {
    let started_at = Utc::now();
    let cutoff = now - Duration::days(ctx.settings.jobs.inactive_days);
    let mut errors = Vec::new();

    let candidates = ctx.db.accounts.list_archivable(cutoff, ARCHIVAL_BATCH).await?;
    let scanned = candidates.len() as u32;
    let mut affected = 0u32;

    if dry_run {
        affected = scanned;
        for account in &candidates {
            info!(
                "Would archive account {} (external {}, last seen {})",
                account.id, account.external_id, account.last_seen_at
            );
        }
    } else {
        for account in &candidates {
            match ctx.db.accounts.archive_account(account.id, ARCHIVAL_REASON).await {
                Ok(_) => {
                    affected += 1;
                    info!("Archived account {} (external {})", account.id, account.external_id);
                    if let Err(err) = ctx.identity.delete_identity(&account.external_id).await {
                        log_api_error(
                            "identity",
                            &err.to_string(),
                            Some(&format!("account {}", account.id)),
                        );
                        errors.push(format!(
                            "account {}: archived but identity deletion failed: {}",
                            account.id, err
                        ));
                    }
                }
                Err(err) => {
                    warn!("Failed to archive account {}: {}", account.id, err);
                    errors.push(format!("account {}: {}", account.id, err));
                }
            }
        }
    }

    Ok(JobSummary {
        job: JobKind::Archival,
        started_at,
        finished_at: Utc::now(),
        scanned,
        affected,
        errors,
        dry_run,
    })
}
