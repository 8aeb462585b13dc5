use db::DbError;
use showrunner_core::{CoreError, ProgramOrder};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Supplied ids are not the event's numbered set.
    #[error("Invalid set: {message}")]
    InvalidSet {
        message: String,
        current: ProgramOrder,
    },

    #[error(
        "Concurrent modification: expected sequence version {expected:?}, found {}",
        current.sequence_version
    )]
    ConcurrentModification {
        expected: Option<i64>,
        current: ProgramOrder,
    },

    #[error("Performance {0} is withdrawn from judging")]
    Withdrawn(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unauthorized: caller role is missing")]
    MissingRole,

    #[error("Database error: {0}")]
    Database(DbError),
}

impl ServiceError {
    /// Stable machine-readable kind, shared by HTTP and socket replies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::InvalidSet { .. } => "invalid_set",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::Withdrawn(_) => "withdrawn",
            Self::Unauthorized(_) | Self::MissingRole => "unauthorized",
            Self::Database(_) => "database_error",
        }
    }

    /// Authoritative program order a client should roll back to.
    pub fn current(&self) -> Option<&ProgramOrder> {
        match self {
            Self::InvalidSet { current, .. } | Self::ConcurrentModification { current, .. } => {
                Some(current)
            }
            _ => None,
        }
    }

    pub(crate) fn performance_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Performance not found: {}", id))
    }

    pub(crate) fn event_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Event not found: {}", id))
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::EventNotFound(id) => Self::event_not_found(id),
            DbError::PerformanceNotFound(id) => Self::performance_not_found(id),
            other => Self::Database(other),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EventNotFound(id) => Self::event_not_found(id),
            CoreError::PerformanceNotFound(id) => Self::performance_not_found(id),
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Unauthorized(msg) => Self::Unauthorized(msg),
            CoreError::MissingRole => Self::MissingRole,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
