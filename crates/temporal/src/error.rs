//! Error types for the gridver-temporal crate.

use chrono::NaiveDate;

/// Error type for all fallible operations in the gridver-temporal crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemporalError {
    /// Returned when a date string is not `YYYY-MM-DD`.
    #[error("invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate {
        /// The string that failed to parse.
        value: String,
    },

    /// Returned when the end date precedes the start date.
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Returned when an initialisation hour is outside 0..=23.
    #[error("init hour {hour} in group '{group_id}' is outside 0..=23")]
    InvalidInitHour { group_id: String, hour: u32 },

    /// Returned when an hour group lists no hours.
    #[error("hour group '{group_id}' has no hours")]
    EmptyGroup { group_id: String },

    /// Returned when two hour groups of the same kind share an id.
    #[error("duplicate hour group id '{group_id}'")]
    DuplicateGroup { group_id: String },
}
