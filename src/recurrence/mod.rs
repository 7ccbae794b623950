//! Recurrence pattern expansion

pub mod evaluator;

pub use evaluator::{occurrences_in_window, resolve_local, weekday_index, Occurrence};
