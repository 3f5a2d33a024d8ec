use scopesync_core::error::CoreError;

/// Error type for the sync engine and its adapters.
///
/// None of these reach the end user as a hard failure except
/// [`SyncError::Core`] validation errors on a rejected patch and
/// [`SyncError::Config`] at startup. Read and write failures are logged and
/// degrade to "absent data" or "retry on next edit".
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A domain-level error from `scopesync_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored or cached document did not decode.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local cache I/O failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote store could not be reached or refused the call.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for engine results.
pub type SyncResult<T> = Result<T, SyncError>;
