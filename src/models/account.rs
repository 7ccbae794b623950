//! Subscription and user account lifecycle models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Pro,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionRecord {
    pub id: i64,
    pub user_id: i64,
    pub status: SubscriptionStatus,
    pub plan: SubscriptionPlan,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Gateway-side customer handle used for standing verification
    pub customer_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    pub fn trial_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Trial
            && self.trial_ends_at.map(|ends| ends <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: i64,
    pub plan: SubscriptionPlan,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub customer_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: i64,
    /// External auth identity, owned by the identity provider
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_inactive: bool,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Snapshot written before an inactive account's live row is removed
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArchivedUser {
    pub id: i64,
    pub account_id: i64,
    pub snapshot: serde_json::Value,
    pub reason: String,
    pub archived_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_trial_expiry_check() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let record = SubscriptionRecord {
            id: 1,
            user_id: 42,
            status: SubscriptionStatus::Trial,
            plan: SubscriptionPlan::Free,
            trial_ends_at: Some(now - chrono::Duration::days(1)),
            customer_reference: None,
            created_at: now,
            updated_at: now,
        };
        assert!(record.trial_expired(now));

        let mut future = record.clone();
        future.trial_ends_at = Some(now + chrono::Duration::days(1));
        assert!(!future.trial_expired(now));

        // Open-ended trials and non-trial states never expire
        let mut open_ended = record.clone();
        open_ended.trial_ends_at = None;
        assert!(!open_ended.trial_expired(now));

        let mut active = record;
        active.status = SubscriptionStatus::Active;
        assert!(!active.trial_expired(now));
    }

    #[test]
    fn test_account_snapshot_round_trip() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let account = UserAccount {
            id: 7,
            external_id: "auth-abc123".to_string(),
            email: Some("person@example.com".to_string()),
            display_name: Some("Person".to_string()),
            is_inactive: true,
            last_seen_at: now,
            created_at: now,
            updated_at: now,
        };

        let snapshot = serde_json::to_value(&account).unwrap();
        let restored: UserAccount = serde_json::from_value(snapshot).unwrap();
        assert_eq!(restored.id, account.id);
        assert_eq!(restored.external_id, account.external_id);
        assert_eq!(restored.email, account.email);
    }
}
