/// Repository error taxonomy
///
/// Every entity operation fails with one of these. The API layer maps them
/// onto HTTP statuses; messages are safe to show to clients except for
/// `Database`, which is logged and replaced.

/// Error type for entity repositories
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Entity or referenced entity does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation (409)
    #[error("{0}")]
    Duplicate(String),

    /// Operation blocked by rows that reference this one (409)
    #[error("{0}")]
    Conflict(String),

    /// Store unavailable or unexpected failure (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository result type alias
pub type RepoResult<T> = Result<T, RepoError>;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_foreign_key_violation())
        .unwrap_or(false)
}
