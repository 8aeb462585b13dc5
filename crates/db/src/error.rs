use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Performance not found: {0}")]
    PerformanceNotFound(Uuid),

    /// A stored value no longer parses into its domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}
