//! Builders for patterns, templates and accounts used across tests

use std::collections::BTreeSet;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use reprise::models::account::CreateAccountRequest;
use reprise::models::template::{CreateTemplateRequest, PatternKind, RecurrencePattern};

/// Weekly pattern in UTC anchored on Monday 2025-06-02 at 18:00
pub fn weekly_pattern(days: &[u8]) -> RecurrencePattern {
    RecurrencePattern {
        kind: PatternKind::Weekly {
            days_of_week: days.iter().copied().collect(),
        },
        frequency: 1,
        timezone: chrono_tz::UTC,
        start_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        end_date: None,
        excluded_dates: BTreeSet::new(),
    }
}

/// Monthly pattern in UTC on the given day of month
pub fn monthly_pattern(day_of_month: u8) -> RecurrencePattern {
    RecurrencePattern {
        kind: PatternKind::Monthly { day_of_month },
        frequency: 1,
        timezone: chrono_tz::UTC,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        end_date: None,
        excluded_dates: BTreeSet::new(),
    }
}

/// Daily pattern whose occurrences all lie in the real future: it starts
/// two days from now and produces exactly `occurrences` instances.
///
/// Keeping every occurrence strictly ahead of the wall clock makes counts
/// independent of the time of day a test runs.
pub fn future_daily_pattern(occurrences: u32) -> RecurrencePattern {
    let start_date = (Utc::now() + Duration::days(2)).date_naive();
    RecurrencePattern {
        kind: PatternKind::Daily,
        frequency: 1,
        timezone: chrono_tz::UTC,
        start_date,
        start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        end_date: Some(start_date + Duration::days(occurrences as i64 - 1)),
        excluded_dates: BTreeSet::new(),
    }
}

/// Free-entry template request with unlimited capacity
pub fn free_template(pattern: RecurrencePattern) -> CreateTemplateRequest {
    CreateTemplateRequest {
        organizer_id: 1,
        title: "Tuesday Social".to_string(),
        description: Some("Weekly social night".to_string()),
        location: Some("Main Hall".to_string()),
        pattern,
        max_attendees: 0,
        price_minor: 0,
    }
}

/// Paid template request with the given capacity and price
pub fn paid_template(pattern: RecurrencePattern, max_attendees: i32, price_minor: i64) -> CreateTemplateRequest {
    CreateTemplateRequest {
        organizer_id: 1,
        title: "Workshop Series".to_string(),
        description: Some("Limited-seat workshop".to_string()),
        location: Some("Studio B".to_string()),
        pattern,
        max_attendees,
        price_minor,
    }
}

/// Account request with a unique external id
pub fn account_request(display_name: &str) -> CreateAccountRequest {
    CreateAccountRequest {
        external_id: format!("ext-{}", Uuid::new_v4().simple()),
        email: Some(format!("{}@test.example", display_name.to_lowercase())),
        display_name: Some(display_name.to_string()),
    }
}
