use thiserror::Error;

/// Errors that may occur while interacting with indexer storage.
///
/// This enum is used across all implementations of the storage traits.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error returned by the database driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to apply the schema migrations.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The expected entry was not found in the database.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A write conflicted with an existing entry.
    #[error("conflict error: {0}")]
    Conflict(String),

    /// A stored value could not be decoded into its domain type.
    #[error("failed to decode {field}: {reason}")]
    Decode {
        /// The column that failed to decode.
        field: &'static str,
        /// Why decoding failed.
        reason: String,
    },
}

impl StorageError {
    /// Returns true if the error signals a missing entry.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_))
    }
}
