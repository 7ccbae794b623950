//! Event template repository implementation

use sqlx::PgPool;
use sqlx::types::Json;
use chrono::Utc;
use uuid::Uuid;
use crate::models::template::{EventTemplate, RecurrencePattern, CreateTemplateRequest, UpdateTemplateRequest};
use crate::utils::errors::RepriseError;

#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event template
    pub async fn create(&self, request: CreateTemplateRequest) -> Result<EventTemplate, RepriseError> {
        let template = sqlx::query_as::<_, EventTemplate>(
            r#"
            INSERT INTO event_templates (id, organizer_id, title, description, location, pattern, max_attendees, price_minor, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(request.organizer_id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.location)
        .bind(Json(request.pattern))
        .bind(request.max_attendees)
        .bind(request.price_minor)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(template)
    }

    /// Find template by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EventTemplate>, RepriseError> {
        let template = sqlx::query_as::<_, EventTemplate>(
            "SELECT id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at FROM event_templates WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(template)
    }

    /// Update template display fields
    ///
    /// The recurrence pattern is deliberately not touched here; pattern
    /// edits go through [`update_pattern`](Self::update_pattern) so the
    /// registered-instance guard cannot be bypassed.
    pub async fn update(&self, id: Uuid, request: UpdateTemplateRequest) -> Result<EventTemplate, RepriseError> {
        let template = sqlx::query_as::<_, EventTemplate>(
            r#"
            UPDATE event_templates
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                max_attendees = COALESCE($5, max_attendees),
                price_minor = COALESCE($6, price_minor),
                is_active = COALESCE($7, is_active),
                updated_at = $8
            WHERE id = $1
            RETURNING id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.location)
        .bind(request.max_attendees)
        .bind(request.price_minor)
        .bind(request.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        template.ok_or(RepriseError::TemplateNotFound { template_id: id })
    }

    /// Replace the recurrence pattern
    pub async fn update_pattern(&self, id: Uuid, pattern: &RecurrencePattern) -> Result<EventTemplate, RepriseError> {
        let template = sqlx::query_as::<_, EventTemplate>(
            r#"
            UPDATE event_templates
            SET pattern = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(Json(pattern))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        template.ok_or(RepriseError::TemplateNotFound { template_id: id })
    }

    /// Activate/deactivate template
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<EventTemplate, RepriseError> {
        let template = sqlx::query_as::<_, EventTemplate>(
            r#"
            UPDATE event_templates
            SET is_active = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        template.ok_or(RepriseError::TemplateNotFound { template_id: id })
    }

    /// Get all active templates
    pub async fn list_active(&self) -> Result<Vec<EventTemplate>, RepriseError> {
        let templates = sqlx::query_as::<_, EventTemplate>(
            "SELECT id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at FROM event_templates WHERE is_active = true ORDER BY created_at ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    /// Get templates owned by an organizer
    pub async fn list_by_organizer(&self, organizer_id: i64, limit: i64, offset: i64) -> Result<Vec<EventTemplate>, RepriseError> {
        let templates = sqlx::query_as::<_, EventTemplate>(
            "SELECT id, organizer_id, title, description, location, pattern, max_attendees, price_minor, is_active, created_at, updated_at FROM event_templates WHERE organizer_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        )
        .bind(organizer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    /// Delete template and its instances (cascades)
    pub async fn delete(&self, id: Uuid) -> Result<(), RepriseError> {
        sqlx::query("DELETE FROM event_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Count total templates
    pub async fn count(&self) -> Result<i64, RepriseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_templates")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
