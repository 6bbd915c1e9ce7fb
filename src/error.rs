use thiserror::Error;

/// Library error type for console operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested user does not exist in the record store.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A store lock was poisoned by a panicking writer.
    #[error("record store lock poisoned")]
    LockPoisoned,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Data-file serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Master bundle generation error.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
