//! Trial expiry sweep
//!
//! Finds subscriptions whose trial window has ended and settles them:
//! users with a billing profile are verified against the payment
//! provider and either promoted to the paid plan or downgraded, users
//! without one are downgraded outright. Verification failures are left
//! untouched so the next sweep retries them.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use crate::models::account::SubscriptionPlan;
use crate::services::payment::SubscriptionStanding;
use crate::utils::errors::Result;
use super::{JobContext, JobKind, JobSummary};

const SWEEP_BATCH: i64 = 500;

pub async fn run(ctx: &JobContext, now: DateTime<Utc>, dry_run: bool) -> Result<JobSummary> {
    let started_at = Utc::now();
    let mut errors = Vec::new();

    let expired = ctx.db.accounts.list_expired_trials(now, SWEEP_BATCH).await?;
    let scanned = expired.len() as u32;
    let mut affected = 0u32;

    if dry_run {
        affected = scanned;
    } else {
        for subscription in &expired {
            match settle(ctx, subscription.user_id, subscription.customer_reference.as_deref()).await {
                Ok(()) => affected += 1,
                Err(err) => {
                    warn!("Trial settlement failed for user {}: {}", subscription.user_id, err);
                    errors.push(format!("user {}: {}", subscription.user_id, err));
                }
            }
        }
    }

    Ok(JobSummary {
        job: JobKind::TrialSweep,
        started_at,
        finished_at: Utc::now(),
        scanned,
        affected,
        errors,
        dry_run,
    })
}

async fn settle(ctx: &JobContext, user_id: i64, customer_reference: Option<&str>) -> Result<()> {
    match customer_reference {
        Some(reference) => match ctx.gateway.verify_subscription(reference).await? {
            SubscriptionStanding::Active => {
                ctx.db
                    .accounts
                    .activate_subscription(user_id, SubscriptionPlan::Pro)
                    .await?;
                info!("Promoted user {} to paid plan after trial", user_id);
            }
            SubscriptionStanding::Lapsed => {
                ctx.db.accounts.cancel_subscription(user_id).await?;
                info!("Downgraded user {} after trial (subscription lapsed)", user_id);
            }
        },
        None => {
            ctx.db.accounts.cancel_subscription(user_id).await?;
            info!("Downgraded user {} after trial (no billing profile)", user_id);
        }
    }
    Ok(())
}
