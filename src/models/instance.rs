//! Materialized event instance model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventInstance {
    pub id: Uuid,
    pub template_id: Uuid,
    /// Resolved UTC instant of the occurrence
    pub event_date: DateTime<Utc>,
    pub local_time: String,
    pub timezone_abbr: String,
    pub day_of_week: String,
    pub date_display: String,
    /// <= 0 means unlimited
    pub max_attendees: i32,
    pub attendee_count: i32,
    pub price_minor: i64,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventInstance {
    /// Deterministic instance id for a (template, occurrence) pair
    ///
    /// Re-materializing the same occurrence always produces the same id,
    /// which is what makes the upsert idempotent.
    pub fn deterministic_id(template_id: Uuid, event_date: DateTime<Utc>) -> Uuid {
        let name = format!("{}:{}", template_id, event_date.format("%Y-%m-%dT%H:%M:%SZ"));
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_attendees <= 0
    }

    /// Seats still claimable, or `None` for unlimited instances
    pub fn remaining_capacity(&self) -> Option<i32> {
        if self.is_unlimited() {
            None
        } else {
            Some((self.max_attendees - self.attendee_count).max(0))
        }
    }

    pub fn is_paid(&self) -> bool {
        self.price_minor > 0
    }

    /// Status derived at read time, never stored
    pub fn status_at(&self, now: DateTime<Utc>) -> InstanceStatus {
        if self.is_cancelled {
            InstanceStatus::Cancelled
        } else if self.event_date < now {
            InstanceStatus::Past
        } else if !self.is_unlimited() && self.attendee_count >= self.max_attendees {
            InstanceStatus::Full
        } else {
            InstanceStatus::Available
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Available,
    Full,
    Past,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    pub id: Uuid,
    pub template_id: Uuid,
    pub event_date: DateTime<Utc>,
    pub local_time: String,
    pub timezone_abbr: String,
    pub day_of_week: String,
    pub date_display: String,
    pub max_attendees: i32,
    pub price_minor: i64,
}

/// Legacy meeting row carried over from the previous system
///
/// The `scheduled` column holds one of several historical JSON date shapes;
/// `scheduled_at` is the only place that tolerance lives.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LegacyMeeting {
    pub id: i64,
    pub title: Option<String>,
    pub scheduled: Option<serde_json::Value>,
    pub first_booking_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LegacyMeeting {
    /// Best-effort schedule instant across all historical shapes,
    /// falling back to the first booking time when the raw value is unusable
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled
            .as_ref()
            .and_then(crate::utils::time::to_instant)
            .or(self.first_booking_at)
    }
}
