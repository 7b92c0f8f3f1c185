use thiserror::Error;

/// Domain failures surfaced to the caller before or instead of aggregation.
#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("invalid grade: {0:?} (expected \"all\" or a number from 1 to 12)")]
    InvalidGrade(String),

    #[error("invalid time window: last {0} days (must be at least 1)")]
    InvalidWindow(i64),

    #[error("unknown activity type: {0:?}")]
    InvalidActivityType(String),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("teacher not found: {0}")]
    TeacherNotFound(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
