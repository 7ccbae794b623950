//! Event instance repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::instance::{EventInstance, CreateInstanceRequest, LegacyMeeting};
use crate::utils::errors::RepriseError;

const INSTANCE_COLUMNS: &str = "id, template_id, event_date, local_time, timezone_abbr, day_of_week, date_display, max_attendees, attendee_count, price_minor, is_cancelled, created_at, updated_at";

/// How an idempotent upsert resolved against the existing row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed for this occurrence
    Created,
    /// Row existed and display fields were refreshed
    Refreshed,
    /// Row existed and already matched
    Unchanged,
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    instance: EventInstance,
    inserted: bool,
}

#[derive(Clone)]
pub struct InstanceRepository {
    pool: PgPool,
}

impl InstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotently write one materialized occurrence
    ///
    /// Existing rows only have their display fields refreshed; the
    /// registration state (`attendee_count`, `is_cancelled`) is never
    /// touched. A row that already matches is left alone entirely so
    /// repeated materialization runs are no-ops.
    pub async fn upsert(&self, request: CreateInstanceRequest) -> Result<(EventInstance, UpsertOutcome), RepriseError> {
        let result = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO event_instances (id, template_id, event_date, local_time, timezone_abbr, day_of_week, date_display, max_attendees, price_minor, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                local_time = EXCLUDED.local_time,
                timezone_abbr = EXCLUDED.timezone_abbr,
                day_of_week = EXCLUDED.day_of_week,
                date_display = EXCLUDED.date_display,
                max_attendees = EXCLUDED.max_attendees,
                price_minor = EXCLUDED.price_minor,
                updated_at = EXCLUDED.updated_at
            WHERE (event_instances.local_time, event_instances.timezone_abbr, event_instances.day_of_week, event_instances.date_display, event_instances.max_attendees, event_instances.price_minor)
                IS DISTINCT FROM
                (EXCLUDED.local_time, EXCLUDED.timezone_abbr, EXCLUDED.day_of_week, EXCLUDED.date_display, EXCLUDED.max_attendees, EXCLUDED.price_minor)
            RETURNING id, template_id, event_date, local_time, timezone_abbr, day_of_week, date_display, max_attendees, attendee_count, price_minor, is_cancelled, created_at, updated_at, (xmax = 0) AS inserted
            "#
        )
        .bind(request.id)
        .bind(request.template_id)
        .bind(request.event_date)
        .bind(&request.local_time)
        .bind(&request.timezone_abbr)
        .bind(&request.day_of_week)
        .bind(&request.date_display)
        .bind(request.max_attendees)
        .bind(request.price_minor)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;

        let row = match result {
            Ok(row) => row,
            // A different id holding the same (template, occurrence) slot
            // means this run raced a concurrent pattern edit
            Err(err) if is_occurrence_conflict(&err) => {
                return Err(RepriseError::StaleMaterialization {
                    template_id: request.template_id,
                    detail: format!(
                        "occurrence at {} already materialized under a different id",
                        request.event_date
                    ),
                });
            }
            Err(err) => return Err(err.into()),
        };

        match row {
            Some(row) if row.inserted => Ok((row.instance, UpsertOutcome::Created)),
            Some(row) => Ok((row.instance, UpsertOutcome::Refreshed)),
            None => {
                let existing = self
                    .find_by_id(request.id)
                    .await?
                    .ok_or(RepriseError::InstanceNotFound { instance_id: request.id })?;
                Ok((existing, UpsertOutcome::Unchanged))
            }
        }
    }

    /// Find instance by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EventInstance>, RepriseError> {
        let instance = sqlx::query_as::<_, EventInstance>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM event_instances WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instance)
    }

    /// List instances of a template ordered by occurrence time
    pub async fn list_for_template(&self, template_id: Uuid, limit: i64, offset: i64) -> Result<Vec<EventInstance>, RepriseError> {
        let instances = sqlx::query_as::<_, EventInstance>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM event_instances WHERE template_id = $1 ORDER BY event_date ASC LIMIT $2 OFFSET $3"
        ))
        .bind(template_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    /// List a template's instances at or after the given instant
    pub async fn list_future_for_template(&self, template_id: Uuid, from: DateTime<Utc>) -> Result<Vec<EventInstance>, RepriseError> {
        let instances = sqlx::query_as::<_, EventInstance>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM event_instances WHERE template_id = $1 AND event_date >= $2 ORDER BY event_date ASC"
        ))
        .bind(template_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    /// Get upcoming non-cancelled instances across all templates
    pub async fn list_upcoming(&self, from: DateTime<Utc>, limit: i64) -> Result<Vec<EventInstance>, RepriseError> {
        let instances = sqlx::query_as::<_, EventInstance>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM event_instances WHERE event_date >= $1 AND is_cancelled = false ORDER BY event_date ASC LIMIT $2"
        ))
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    /// Instances that finished before the cutoff
    pub async fn list_past_before(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<EventInstance>, RepriseError> {
        let instances = sqlx::query_as::<_, EventInstance>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM event_instances WHERE event_date < $1 ORDER BY event_date ASC LIMIT $2"
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    /// Delete instances by id (registrations cascade)
    pub async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<u64, RepriseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM event_instances WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Count upcoming non-cancelled instances
    pub async fn count_upcoming(&self, from: DateTime<Utc>) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_instances WHERE event_date >= $1 AND is_cancelled = false"
        )
        .bind(from)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Count instances materialized for a template
    pub async fn count_for_template(&self, template_id: Uuid) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_instances WHERE template_id = $1")
            .bind(template_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Oldest imported meeting rows that still carry unnormalized dates
    pub async fn list_legacy_meetings(&self, limit: i64) -> Result<Vec<LegacyMeeting>, RepriseError> {
        let meetings = sqlx::query_as::<_, LegacyMeeting>(
            "SELECT id, title, scheduled, first_booking_at, created_at FROM legacy_meetings ORDER BY created_at ASC LIMIT $1"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(meetings)
    }

    /// Remove migrated legacy meeting rows
    pub async fn delete_legacy_meetings(&self, ids: &[i64]) -> Result<u64, RepriseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM legacy_meetings WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn is_occurrence_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some("uq_event_instances_occurrence"),
        _ => false,
    }
}
