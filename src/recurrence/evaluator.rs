//! Recurrence rule evaluation
//!
//! Expands a recurrence pattern into the ordered sequence of occurrences
//! falling inside a window. Pure function of its inputs: the same pattern
//! and window always produce the same sequence.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use crate::models::template::{PatternKind, RecurrencePattern};
use crate::utils::errors::Result;

/// A single evaluated occurrence: the authored wall-clock time and the
/// UTC instant it resolves to in the pattern's zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub local: NaiveDateTime,
    pub utc: DateTime<Utc>,
}

/// Evaluate all occurrences of `pattern` whose UTC instant falls inside
/// `[window_start, window_end]`, ordered and strictly increasing.
///
/// Week blocks for "every N weeks" are anchored at the pattern's own
/// start date. A monthly day-of-month that a target month cannot hold
/// skips that month entirely rather than rolling over.
pub fn occurrences_in_window(
    pattern: &RecurrencePattern,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<Occurrence>> {
    pattern.validate()?;

    if window_end < window_start {
        return Ok(Vec::new());
    }

    let tz = pattern.timezone;
    // Local-date bound for cursor termination; exact instants are still
    // filtered against the UTC window when pushed.
    let window_end_local = window_end.with_timezone(&tz).date_naive();
    let last_date = match pattern.end_date {
        Some(end_date) => end_date.min(window_end_local),
        None => window_end_local,
    };

    let mut occurrences = Vec::new();

    match &pattern.kind {
        PatternKind::Daily => {
            let step = Duration::days(pattern.frequency as i64);
            let mut date = pattern.start_date;
            while date <= last_date {
                push_occurrence(pattern, tz, date, window_start, window_end, &mut occurrences);
                date = date + step;
            }
        }
        PatternKind::Weekly { days_of_week } => {
            let mut date = pattern.start_date;
            while date <= last_date {
                let days_since_start = (date - pattern.start_date).num_days();
                let week_index = days_since_start / 7;
                if week_index % pattern.frequency as i64 == 0
                    && days_of_week.contains(&weekday_index(date))
                {
                    push_occurrence(pattern, tz, date, window_start, window_end, &mut occurrences);
                }
                date = date + Duration::days(1);
            }
        }
        PatternKind::Monthly { day_of_month } => {
            let start = pattern.start_date;
            let mut step: u32 = 0;
            loop {
                let total_months = start.month0() + step * pattern.frequency;
                let year = start.year() + (total_months / 12) as i32;
                let month = total_months % 12 + 1;
                match NaiveDate::from_ymd_opt(year, month, *day_of_month as u32) {
                    Some(date) => {
                        if date > last_date {
                            break;
                        }
                        if date >= start {
                            push_occurrence(pattern, tz, date, window_start, window_end, &mut occurrences);
                        }
                    }
                    None => {
                        // Month too short for day_of_month: skipped, not rolled over
                        let month_start = NaiveDate::from_ymd_opt(year, month, 1);
                        match month_start {
                            Some(first) if first <= last_date => {}
                            _ => break,
                        }
                    }
                }
                step += 1;
            }
        }
    }

    Ok(occurrences)
}

fn push_occurrence(
    pattern: &RecurrencePattern,
    tz: Tz,
    date: NaiveDate,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    out: &mut Vec<Occurrence>,
) {
    if pattern.excluded_dates.contains(&date) {
        return;
    }
    let local = date.and_time(pattern.start_time);
    let utc = resolve_local(tz, local);
    if utc >= window_start && utc <= window_end {
        out.push(Occurrence { local, utc });
    }
}

/// Weekday index with 0 = Sunday, matching the authored pattern convention
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Resolve a wall-clock time in the given zone to a UTC instant.
///
/// Times made ambiguous by a fall-back transition resolve to the earliest
/// offset. Times erased by a spring-forward gap shift forward in half-hour
/// steps until they become representable.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(resolved) => resolved.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let mut candidate = local;
            // Gaps are at most a few hours in every zone chrono-tz ships
            for _ in 0..8 {
                candidate += Duration::minutes(30);
                match tz.from_local_datetime(&candidate) {
                    LocalResult::Single(resolved) => return resolved.with_timezone(&Utc),
                    LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
                    LocalResult::None => continue,
                }
            }
            Utc.from_utc_datetime(&local)
        }
    }
}
