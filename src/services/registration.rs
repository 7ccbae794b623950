//! Registration service
//!
//! Drives the registration lifecycle on top of the repositories: free
//! instances claim a seat immediately, paid instances go through the
//! payment gateway and only hold a seat once the payment verifies.

use std::sync::Arc;
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use crate::database::repositories::{InstanceRepository, RegistrationRepository};
use crate::models::instance::{EventInstance, InstanceStatus};
use crate::models::registration::{Registration, RegistrationStatus, CreateRegistrationRequest};
use crate::services::payment::{PaymentGateway, PaymentInitiation, PaymentStatus, new_reference};
use crate::utils::errors::{RepriseError, Result};
use crate::utils::logging::log_registration_event;

/// Result of a registration attempt
///
/// `payment` is set when the instance is paid: the registration is
/// pending and the user must complete checkout at the returned URL.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub registration: Registration,
    pub payment: Option<PaymentInitiation>,
}

#[derive(Clone)]
pub struct RegistrationService {
    instances: InstanceRepository,
    registrations: RegistrationRepository,
    gateway: Arc<dyn PaymentGateway>,
}

impl RegistrationService {
    pub fn new(
        instances: InstanceRepository,
        registrations: RegistrationRepository,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self { instances, registrations, gateway }
    }

    /// Register a user on an instance
    #[instrument(skip(self), fields(instance_id = %instance_id, user_id = user_id))]
    pub async fn register(&self, instance_id: Uuid, user_id: i64, email: &str) -> Result<RegistrationOutcome> {
        let instance = self.registerable_instance(instance_id).await?;

        if let Some(existing) = self.registrations.find_active(instance_id, user_id).await? {
            return Err(RepriseError::AlreadyRegistered {
                instance_id: existing.instance_id,
                user_id,
            });
        }

        if !instance.is_paid() {
            let mut created = self
                .registrations
                .register_with_seats(instance_id, &[user_id], 0)
                .await?;
            let registration = created.pop().ok_or_else(|| {
                RepriseError::InvalidInput("registration batch came back empty".to_string())
            })?;

            log_registration_event(instance_id, user_id, "registered", "free instance");
            return Ok(RegistrationOutcome { registration, payment: None });
        }

        // Paid flow: record the pending row first so an interrupted
        // checkout is visible and swept by the payment timeout job
        let reference = new_reference();
        let registration = self
            .registrations
            .create_pending(CreateRegistrationRequest {
                instance_id,
                user_id,
                payment_reference: Some(reference.clone()),
                amount_minor: instance.price_minor,
            })
            .await?;

        let payment = match self
            .gateway
            .initialize_payment(email, instance.price_minor, &reference)
            .await
        {
            Ok(initiation) => initiation,
            Err(err) => {
                // Best effort: fold the unusable pending row back in
                if let Err(cleanup_err) = self
                    .registrations
                    .release_seat_and_cancel(registration.id, Utc::now())
                    .await
                {
                    warn!(
                        registration_id = %registration.id,
                        error = %cleanup_err,
                        "Failed to cancel pending registration after gateway error"
                    );
                }
                return Err(err.into());
            }
        };

        log_registration_event(instance_id, user_id, "payment_initiated", &payment.reference);
        Ok(RegistrationOutcome { registration, payment: Some(payment) })
    }

    /// Register a batch of users on a free instance, all-or-nothing
    #[instrument(skip(self, user_ids), fields(instance_id = %instance_id, count = user_ids.len()))]
    pub async fn register_bulk(&self, instance_id: Uuid, user_ids: &[i64]) -> Result<Vec<Registration>> {
        let instance = self.registerable_instance(instance_id).await?;

        if instance.is_paid() {
            return Err(RepriseError::InvalidInput(
                "bulk registration is only available for free instances".to_string(),
            ));
        }

        let registrations = self
            .registrations
            .register_with_seats(instance_id, user_ids, 0)
            .await?;

        info!(
            instance_id = %instance_id,
            count = registrations.len(),
            "Bulk registration committed"
        );
        Ok(registrations)
    }

    /// Settle a payment reference against the gateway
    ///
    /// Idempotent under webhook re-delivery: an already-registered row
    /// is returned unchanged. A gateway `Pending` leaves the row
    /// pending for a later retry; a definitive failure is an error and
    /// the row stays pending until the timeout sweep abandons it.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, reference: &str) -> Result<Registration> {
        let registration = self
            .registrations
            .find_by_payment_reference(reference)
            .await?
            .ok_or_else(|| {
                RepriseError::InvalidInput(format!("unknown payment reference {reference}"))
            })?;

        if registration.status == RegistrationStatus::Registered {
            return Ok(registration);
        }

        match self.gateway.verify_payment(reference).await? {
            PaymentStatus::Success => {
                let confirmed = self
                    .registrations
                    .confirm_with_seat(registration.id, Utc::now())
                    .await?;
                log_registration_event(
                    confirmed.instance_id,
                    confirmed.user_id,
                    "payment_confirmed",
                    reference,
                );
                Ok(confirmed)
            }
            PaymentStatus::Pending => {
                info!(reference = reference, "Payment still pending at gateway");
                Ok(registration)
            }
            PaymentStatus::Failed => {
                warn!(reference = reference, "Gateway reports payment failed");
                Err(RepriseError::ExternalVerification(format!(
                    "payment {reference} failed gateway verification"
                )))
            }
        }
    }

    /// Cancel a registration by id
    pub async fn cancel(&self, registration_id: Uuid) -> Result<Registration> {
        let registration = self
            .registrations
            .release_seat_and_cancel(registration_id, Utc::now())
            .await?;

        log_registration_event(
            registration.instance_id,
            registration.user_id,
            "cancelled",
            &registration.status.to_string(),
        );
        Ok(registration)
    }

    /// Cancel a user's active registration on an instance
    pub async fn unregister(&self, instance_id: Uuid, user_id: i64) -> Result<Registration> {
        let active = self
            .registrations
            .find_active(instance_id, user_id)
            .await?
            .ok_or_else(|| {
                RepriseError::InvalidInput(format!(
                    "user {user_id} has no active registration on instance {instance_id}"
                ))
            })?;

        self.cancel(active.id).await
    }

    /// Record attendance for a registration
    pub async fn check_in(&self, registration_id: Uuid) -> Result<Registration> {
        let registration = self.registrations.check_in(registration_id, Utc::now()).await?;
        log_registration_event(
            registration.instance_id,
            registration.user_id,
            "checked_in",
            "",
        );
        Ok(registration)
    }

    /// Cancel an instance and all of its active registrations
    pub async fn cancel_instance(&self, instance_id: Uuid) -> Result<(EventInstance, u64)> {
        let (instance, cancelled) = self
            .registrations
            .cancel_instance_with_registrations(instance_id, Utc::now())
            .await?;

        info!(
            instance_id = %instance_id,
            cancelled_registrations = cancelled,
            "Instance cancelled"
        );
        Ok((instance, cancelled))
    }

    /// Fetch an instance and refuse registration on cancelled or past ones
    async fn registerable_instance(&self, instance_id: Uuid) -> Result<EventInstance> {
        let instance = self
            .instances
            .find_by_id(instance_id)
            .await?
            .ok_or(RepriseError::InstanceNotFound { instance_id })?;

        match instance.status_at(Utc::now()) {
            InstanceStatus::Cancelled => Err(RepriseError::InvalidStateTransition {
                from: "cancelled".to_string(),
                to: "registered".to_string(),
            }),
            InstanceStatus::Past => Err(RepriseError::InvalidStateTransition {
                from: "past".to_string(),
                to: "registered".to_string(),
            }),
            // Full is left to the transactional seat claim, which reads
            // the authoritative count
            InstanceStatus::Full | InstanceStatus::Available => Ok(instance),
        }
    }
}
