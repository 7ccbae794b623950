//! Registration repository implementation
//!
//! Seat accounting lives here. Every operation that claims or releases a
//! seat runs the conditional instance update and the registration row
//! change inside one transaction, so a failure at either step leaves
//! both tables untouched.

use sqlx::{PgPool, Postgres, Transaction};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::instance::EventInstance;
use crate::models::registration::{Registration, RegistrationStatus, CreateRegistrationRequest};
use crate::utils::errors::RepriseError;

const REGISTRATION_COLUMNS: &str = "id, instance_id, user_id, status, payment_reference, amount_minor, checked_in, checked_in_at, created_at, confirmed_at, cancelled_at";

#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find registration by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, RepriseError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Find the active registration of a user on an instance, if any
    pub async fn find_active(&self, instance_id: Uuid, user_id: i64) -> Result<Option<Registration>, RepriseError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE instance_id = $1 AND user_id = $2 AND status IN ('pending_payment', 'registered')"
        ))
        .bind(instance_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Find registration by its gateway payment reference
    pub async fn find_by_payment_reference(&self, reference: &str) -> Result<Option<Registration>, RepriseError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE payment_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// List registrations on an instance
    pub async fn list_for_instance(&self, instance_id: Uuid) -> Result<Vec<Registration>, RepriseError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE instance_id = $1 ORDER BY created_at ASC"
        ))
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// List a user's registrations, newest first
    pub async fn list_for_user(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Registration>, RepriseError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// Count active registrations on an instance
    pub async fn count_active_for_instance(&self, instance_id: Uuid) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE instance_id = $1 AND status IN ('pending_payment', 'registered')"
        )
        .bind(instance_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Active registration counts per future non-cancelled instance of a
    /// template, heaviest first
    pub async fn active_counts_for_future_instances(&self, template_id: Uuid, from: DateTime<Utc>) -> Result<Vec<(Uuid, i64)>, RepriseError> {
        let counts: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT i.id, COUNT(r.id)
            FROM event_instances i
            JOIN registrations r ON r.instance_id = i.id
                AND r.status IN ('pending_payment', 'registered')
            WHERE i.template_id = $1 AND i.event_date >= $2 AND i.is_cancelled = false
            GROUP BY i.id
            ORDER BY COUNT(r.id) DESC
            "#
        )
        .bind(template_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Insert a registration that does not hold a seat yet
    ///
    /// Used for paid instances: the seat is claimed later by
    /// [`confirm_with_seat`](Self::confirm_with_seat) once the gateway
    /// verifies the payment.
    pub async fn create_pending(&self, request: CreateRegistrationRequest) -> Result<Registration, RepriseError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            INSERT INTO registrations (id, instance_id, user_id, status, payment_reference, amount_minor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.instance_id)
        .bind(request.user_id)
        .bind(RegistrationStatus::PendingPayment)
        .bind(request.payment_reference)
        .bind(request.amount_minor)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_active_conflict(err, request.instance_id, request.user_id))?;

        Ok(registration)
    }

    /// Register users on a free instance, claiming their seats atomically
    ///
    /// All-or-nothing: if capacity cannot cover the whole batch, or any
    /// user already holds an active registration, nothing is written.
    pub async fn register_with_seats(&self, instance_id: Uuid, user_ids: &[i64], amount_minor: i64) -> Result<Vec<Registration>, RepriseError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        claim_seats(&mut tx, instance_id, user_ids.len() as i32).await?;

        let mut registrations = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let registration = sqlx::query_as::<_, Registration>(&format!(
                r#"
                INSERT INTO registrations (id, instance_id, user_id, status, amount_minor, created_at, confirmed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                RETURNING {REGISTRATION_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(instance_id)
            .bind(user_id)
            .bind(RegistrationStatus::Registered)
            .bind(amount_minor)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| map_active_conflict(err, instance_id, user_id))?;
            registrations.push(registration);
        }

        tx.commit().await?;
        Ok(registrations)
    }

    /// Promote a pending registration to registered and claim its seat
    ///
    /// The status change is a compare-and-set on `pending_payment`, so a
    /// re-delivered confirmation finds the row already registered and
    /// returns it unchanged. If the seat claim fails the whole
    /// transaction rolls back and the row stays pending.
    pub async fn confirm_with_seat(&self, registration_id: Uuid, now: DateTime<Utc>) -> Result<Registration, RepriseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Registration>(&format!(
            "UPDATE registrations SET status = 'registered', confirmed_at = $2 WHERE id = $1 AND status = 'pending_payment' RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(registration_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(registration) = updated else {
            let existing = sqlx::query_as::<_, Registration>(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
            ))
            .bind(registration_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepriseError::RegistrationNotFound { registration_id })?;

            return match existing.status {
                RegistrationStatus::Registered => Ok(existing),
                status => Err(RepriseError::InvalidStateTransition {
                    from: status.to_string(),
                    to: "registered".to_string(),
                }),
            };
        };

        claim_seats(&mut tx, registration.instance_id, 1).await?;

        tx.commit().await?;
        Ok(registration)
    }

    /// Cancel a registration, releasing its seat if one is held
    ///
    /// Cancelling an already-terminal registration is a no-op that
    /// returns the row as stored.
    pub async fn release_seat_and_cancel(&self, registration_id: Uuid, now: DateTime<Utc>) -> Result<Registration, RepriseError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1 FOR UPDATE"
        ))
        .bind(registration_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepriseError::RegistrationNotFound { registration_id })?;

        let registration = match existing.status {
            RegistrationStatus::Registered => {
                sqlx::query(
                    "UPDATE event_instances SET attendee_count = GREATEST(attendee_count - 1, 0), updated_at = $2 WHERE id = $1"
                )
                .bind(existing.instance_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query_as::<_, Registration>(&format!(
                    "UPDATE registrations SET status = 'cancelled', cancelled_at = $2 WHERE id = $1 RETURNING {REGISTRATION_COLUMNS}"
                ))
                .bind(registration_id)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
            // Pending rows never claimed a seat
            RegistrationStatus::PendingPayment => {
                sqlx::query_as::<_, Registration>(&format!(
                    "UPDATE registrations SET status = 'cancelled', cancelled_at = $2 WHERE id = $1 RETURNING {REGISTRATION_COLUMNS}"
                ))
                .bind(registration_id)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
            RegistrationStatus::Cancelled | RegistrationStatus::Abandoned => existing,
        };

        tx.commit().await?;
        Ok(registration)
    }

    /// Cancel an instance together with all of its active registrations
    pub async fn cancel_instance_with_registrations(&self, instance_id: Uuid, now: DateTime<Utc>) -> Result<(EventInstance, u64), RepriseError> {
        let mut tx = self.pool.begin().await?;

        let instance = sqlx::query_as::<_, EventInstance>(
            r#"
            UPDATE event_instances SET is_cancelled = true, updated_at = $2 WHERE id = $1
            RETURNING id, template_id, event_date, local_time, timezone_abbr, day_of_week, date_display, max_attendees, attendee_count, price_minor, is_cancelled, created_at, updated_at
            "#
        )
        .bind(instance_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepriseError::InstanceNotFound { instance_id })?;

        let cancelled = sqlx::query(
            "UPDATE registrations SET status = 'cancelled', cancelled_at = $2 WHERE instance_id = $1 AND status IN ('pending_payment', 'registered')"
        )
        .bind(instance_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((instance, cancelled.rows_affected()))
    }

    /// Record attendance for a registered user
    pub async fn check_in(&self, registration_id: Uuid, now: DateTime<Utc>) -> Result<Registration, RepriseError> {
        let updated = sqlx::query_as::<_, Registration>(&format!(
            "UPDATE registrations SET checked_in = true, checked_in_at = COALESCE(checked_in_at, $2) WHERE id = $1 AND status = 'registered' RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(registration_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(registration) => Ok(registration),
            None => {
                let existing = self
                    .find_by_id(registration_id)
                    .await?
                    .ok_or(RepriseError::RegistrationNotFound { registration_id })?;
                Err(RepriseError::InvalidStateTransition {
                    from: existing.status.to_string(),
                    to: "checked_in".to_string(),
                })
            }
        }
    }

    /// Count registrations in a given state
    pub async fn count_by_status(&self, status: RegistrationStatus) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Count pending registrations created before the cutoff
    pub async fn count_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE status = 'pending_payment' AND created_at < $1"
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Abandon pending registrations whose payment window has lapsed
    ///
    /// No seats are released: pending rows never held one.
    pub async fn mark_abandoned_older_than(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64, RepriseError> {
        let result = sqlx::query(
            "UPDATE registrations SET status = 'abandoned', cancelled_at = $2 WHERE status = 'pending_payment' AND created_at < $1"
        )
        .bind(cutoff)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Claim `count` seats on an instance inside an open transaction
///
/// The update is conditional on capacity, so two claims racing for the
/// last seat serialize on the row lock and exactly one succeeds.
async fn claim_seats(tx: &mut Transaction<'_, Postgres>, instance_id: Uuid, count: i32) -> Result<(), RepriseError> {
    let result = sqlx::query(
        r#"
        UPDATE event_instances
        SET attendee_count = attendee_count + $2, updated_at = NOW()
        WHERE id = $1
          AND is_cancelled = false
          AND (max_attendees <= 0 OR attendee_count + $2 <= max_attendees)
        "#
    )
    .bind(instance_id)
    .bind(count)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // Claim refused; look at the row to report why
    let row: Option<(i32, i32, bool)> = sqlx::query_as(
        "SELECT max_attendees, attendee_count, is_cancelled FROM event_instances WHERE id = $1"
    )
    .bind(instance_id)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        None => Err(RepriseError::InstanceNotFound { instance_id }),
        Some((_, _, true)) => Err(RepriseError::InvalidStateTransition {
            from: "cancelled".to_string(),
            to: "registered".to_string(),
        }),
        Some((max_attendees, attendee_count, false)) => Err(RepriseError::CapacityExceeded {
            instance_id,
            requested: count,
            remaining: (max_attendees - attendee_count).max(0),
        }),
    }
}

fn map_active_conflict(err: sqlx::Error, instance_id: Uuid, user_id: i64) -> RepriseError {
    if let sqlx::Error::Database(ref db) = err {
        if db.constraint() == Some("uq_registrations_active") {
            return RepriseError::AlreadyRegistered { instance_id, user_id };
        }
    }
    err.into()
}
