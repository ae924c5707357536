use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The record is absent, owned by someone else, or soft-deleted.
    /// Callers cannot tell these apart.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
