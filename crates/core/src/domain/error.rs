// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid report state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Malformed schedule: {0}")]
    MalformedSchedule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Unrepresentable local time: {0}")]
    UnrepresentableLocalTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
