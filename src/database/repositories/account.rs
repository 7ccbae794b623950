//! Subscription and user account repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::account::{
    SubscriptionRecord, SubscriptionPlan, CreateSubscriptionRequest,
    UserAccount, CreateAccountRequest, ArchivedUser,
};
use crate::utils::errors::RepriseError;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, status, plan, trial_ends_at, customer_reference, created_at, updated_at";
const ACCOUNT_COLUMNS: &str = "id, external_id, email, display_name, is_inactive, last_seen_at, created_at, updated_at";

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a subscription; new subscriptions start on trial
    pub async fn create_subscription(&self, request: CreateSubscriptionRequest) -> Result<SubscriptionRecord, RepriseError> {
        let subscription = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            r#"
            INSERT INTO subscriptions (user_id, plan, trial_ends_at, customer_reference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(request.plan)
        .bind(request.trial_ends_at)
        .bind(request.customer_reference)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Find subscription by user
    pub async fn find_subscription(&self, user_id: i64) -> Result<Option<SubscriptionRecord>, RepriseError> {
        let subscription = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Trials whose end date already passed
    pub async fn list_expired_trials(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<SubscriptionRecord>, RepriseError> {
        let subscriptions = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE status = 'trial' AND trial_ends_at IS NOT NULL AND trial_ends_at <= $1 ORDER BY trial_ends_at ASC LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    /// Move a subscription to active on the given plan
    pub async fn activate_subscription(&self, user_id: i64, plan: SubscriptionPlan) -> Result<SubscriptionRecord, RepriseError> {
        let subscription = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "UPDATE subscriptions SET status = 'active', plan = $2, updated_at = $3 WHERE user_id = $1 RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(plan)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        subscription.ok_or(RepriseError::AccountNotFound { account_id: user_id })
    }

    /// Cancel a subscription and drop it to the free plan
    pub async fn cancel_subscription(&self, user_id: i64) -> Result<SubscriptionRecord, RepriseError> {
        let subscription = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "UPDATE subscriptions SET status = 'cancelled', plan = 'free', updated_at = $2 WHERE user_id = $1 RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        subscription.ok_or(RepriseError::AccountNotFound { account_id: user_id })
    }

    /// Create a user account
    pub async fn create_account(&self, request: CreateAccountRequest) -> Result<UserAccount, RepriseError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            r#"
            INSERT INTO user_accounts (external_id, email, display_name, last_seen_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(request.external_id)
        .bind(request.email)
        .bind(request.display_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    /// Find account by ID
    pub async fn find_account(&self, id: i64) -> Result<Option<UserAccount>, RepriseError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM user_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Find account by external identity id
    pub async fn find_account_by_external_id(&self, external_id: &str) -> Result<Option<UserAccount>, RepriseError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM user_accounts WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Record account activity
    pub async fn touch_last_seen(&self, id: i64, now: DateTime<Utc>) -> Result<(), RepriseError> {
        sqlx::query("UPDATE user_accounts SET last_seen_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Flag an account as deactivated
    pub async fn mark_inactive(&self, id: i64) -> Result<UserAccount, RepriseError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "UPDATE user_accounts SET is_inactive = true, updated_at = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        account.ok_or(RepriseError::AccountNotFound { account_id: id })
    }

    /// Accounts idle since before the cutoff, or explicitly deactivated
    pub async fn list_archivable(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<UserAccount>, RepriseError> {
        let accounts = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM user_accounts WHERE last_seen_at < $1 OR is_inactive = true ORDER BY last_seen_at ASC LIMIT $2"
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Move an account into the archive
    ///
    /// The snapshot row is written and read back before the live row is
    /// deleted, all inside one transaction. If any step fails the live
    /// account survives untouched.
    pub async fn archive_account(&self, account_id: i64, reason: &str) -> Result<ArchivedUser, RepriseError> {
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM user_accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepriseError::AccountNotFound { account_id })?;

        let snapshot = serde_json::to_value(&account)?;

        sqlx::query(
            r#"
            INSERT INTO archived_users (account_id, snapshot, reason, archived_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_id) DO NOTHING
            "#
        )
        .bind(account_id)
        .bind(&snapshot)
        .bind(reason)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // Confirm the archive copy exists before removing the live row
        let archived = sqlx::query_as::<_, ArchivedUser>(
            "SELECT id, account_id, snapshot, reason, archived_at FROM archived_users WHERE account_id = $1"
        )
        .bind(account_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_accounts WHERE id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(archived)
    }

    /// Restore an archived account to the live table
    pub async fn restore_account(&self, account_id: i64) -> Result<UserAccount, RepriseError> {
        let mut tx = self.pool.begin().await?;

        let archived = sqlx::query_as::<_, ArchivedUser>(
            "SELECT id, account_id, snapshot, reason, archived_at FROM archived_users WHERE account_id = $1"
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepriseError::AccountNotFound { account_id })?;

        let account: UserAccount = serde_json::from_value(archived.snapshot)?;

        let restored = sqlx::query_as::<_, UserAccount>(&format!(
            r#"
            INSERT INTO user_accounts (id, external_id, email, display_name, is_inactive, last_seen_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.id)
        .bind(account.external_id)
        .bind(account.email)
        .bind(account.display_name)
        .bind(account.is_inactive)
        .bind(account.last_seen_at)
        .bind(account.created_at)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM archived_users WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(restored)
    }

    /// Count live accounts
    pub async fn count_accounts(&self) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
