use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(Uuid),

    #[error("Concurrency conflict: expected version {expected}, but current is {actual}")]
    VersionConflict { expected: i64, actual: i64 },

    #[error("Storage constraint violated: {0}")]
    Constraint(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
