//! Error types for caltz.

use thiserror::Error;

/// Errors that can occur while converting events or managing timezone settings.
#[derive(Error, Debug)]
pub enum CalTzError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRRule(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Could not detect system timezone: {0}")]
    TimezoneDetection(String),

    #[error("Notice failed: {0}")]
    Notice(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for caltz operations.
pub type CalTzResult<T> = Result<T, CalTzError>;
