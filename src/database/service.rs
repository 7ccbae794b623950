//! Database service layer
//!
//! This module provides a high-level interface to database operations

use chrono::{Duration, Utc};
use crate::database::{DatabasePool, TemplateRepository, InstanceRepository, RegistrationRepository, AccountRepository};
use crate::models::account::{SubscriptionRecord, SubscriptionPlan, CreateSubscriptionRequest, UserAccount, CreateAccountRequest};
use crate::models::registration::RegistrationStatus;
use crate::utils::errors::RepriseError;

#[derive(Clone)]
pub struct DatabaseService {
    pub templates: TemplateRepository,
    pub instances: InstanceRepository,
    pub registrations: RegistrationRepository,
    pub accounts: AccountRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            templates: TemplateRepository::new(pool.clone()),
            instances: InstanceRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            accounts: AccountRepository::new(pool),
        }
    }

    /// Initialize an account together with its trial subscription
    ///
    /// Idempotent per external identity: an existing account is returned
    /// as-is, and a missing subscription is backfilled.
    pub async fn initialize_account(
        &self,
        external_id: &str,
        email: Option<String>,
        display_name: Option<String>,
        trial_days: i64,
    ) -> Result<(UserAccount, SubscriptionRecord), RepriseError> {
        let account = match self.accounts.find_account_by_external_id(external_id).await? {
            Some(existing) => existing,
            None => {
                self.accounts
                    .create_account(CreateAccountRequest {
                        external_id: external_id.to_string(),
                        email,
                        display_name,
                    })
                    .await?
            }
        };

        let subscription = match self.accounts.find_subscription(account.id).await? {
            Some(existing) => existing,
            None => {
                self.accounts
                    .create_subscription(CreateSubscriptionRequest {
                        user_id: account.id,
                        plan: SubscriptionPlan::Free,
                        trial_ends_at: Some(Utc::now() + Duration::days(trial_days)),
                        customer_reference: None,
                    })
                    .await?
            }
        };

        Ok((account, subscription))
    }

    /// Get a user's account, subscription and recent registrations
    pub async fn get_user_overview(&self, user_id: i64) -> Result<serde_json::Value, RepriseError> {
        let account = self
            .accounts
            .find_account(user_id)
            .await?
            .ok_or(RepriseError::AccountNotFound { account_id: user_id })?;

        let subscription = self.accounts.find_subscription(user_id).await?;
        let registrations = self.registrations.list_for_user(user_id, 20, 0).await?;

        let overview = serde_json::json!({
            "account": account,
            "subscription": subscription,
            "registrations": registrations
        });

        Ok(overview)
    }

    /// Get system statistics
    pub async fn get_system_stats(&self) -> Result<serde_json::Value, RepriseError> {
        let templates = self.templates.count().await?;
        let accounts = self.accounts.count_accounts().await?;
        let upcoming_instances = self.instances.count_upcoming(Utc::now()).await?;
        let active_registrations = self
            .registrations
            .count_by_status(RegistrationStatus::Registered)
            .await?;
        let pending_payments = self
            .registrations
            .count_by_status(RegistrationStatus::PendingPayment)
            .await?;

        let stats = serde_json::json!({
            "templates": templates,
            "accounts": accounts,
            "upcoming_instances": upcoming_instances,
            "active_registrations": active_registrations,
            "pending_payments": pending_payments
        });

        Ok(stats)
    }
}
