use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Performance not found: {0}")]
    PerformanceNotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No role was presented at all.
    #[error("Unauthorized: caller role is missing")]
    MissingRole,
}
