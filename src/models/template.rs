//! Event template and recurrence pattern models

use std::collections::BTreeSet;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;
use crate::utils::errors::{RepriseError, Result};

/// Discriminant and per-type fields of a recurrence pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternKind {
    Daily,
    Weekly {
        /// Weekday indices 0-6, 0 = Sunday
        days_of_week: BTreeSet<u8>,
    },
    Monthly {
        day_of_month: u8,
    },
}

/// Authored rule describing how an event template repeats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    #[serde(flatten)]
    pub kind: PatternKind,
    /// Every N days/weeks/months
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    /// IANA zone the wall-clock times are authored in
    pub timezone: Tz,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    /// Absent means the series never ends
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Local dates explicitly skipped (holiday overrides)
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
}

fn default_frequency() -> u32 {
    1
}

impl RecurrencePattern {
    /// Validate the pattern configuration
    ///
    /// Malformed patterns fail here and are never silently defaulted.
    pub fn validate(&self) -> Result<()> {
        if self.frequency == 0 {
            return Err(RepriseError::InvalidPattern(
                "frequency must be at least 1".to_string()
            ));
        }

        match &self.kind {
            PatternKind::Daily => {}
            PatternKind::Weekly { days_of_week } => {
                if days_of_week.is_empty() {
                    return Err(RepriseError::InvalidPattern(
                        "weekly pattern requires a non-empty days_of_week set".to_string()
                    ));
                }
                if let Some(&day) = days_of_week.iter().find(|&&day| day > 6) {
                    return Err(RepriseError::InvalidPattern(
                        format!("weekday index out of range 0-6: {}", day)
                    ));
                }
            }
            PatternKind::Monthly { day_of_month } => {
                if !(1..=31).contains(day_of_month) {
                    return Err(RepriseError::InvalidPattern(
                        format!("day_of_month must be within 1-31, got {}", day_of_month)
                    ));
                }
            }
        }

        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(RepriseError::InvalidPattern(
                    format!("end_date {} is before start_date {}", end_date, self.start_date)
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventTemplate {
    pub id: Uuid,
    pub organizer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub pattern: Json<RecurrencePattern>,
    /// Default capacity for materialized instances; <= 0 means unlimited
    pub max_attendees: i32,
    /// Price in minor currency units; 0 means free
    pub price_minor: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventTemplate {
    /// Paid templates require a verified payment before a seat is held
    pub fn is_paid(&self) -> bool {
        self.price_minor > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub organizer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub pattern: RecurrencePattern,
    pub max_attendees: i32,
    pub price_minor: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub max_attendees: Option<i32>,
    pub price_minor: Option<i64>,
    pub is_active: Option<bool>,
}
