//! Storage errors.

use thiserror::Error;

use asl_state::UnknownStatus;

/// A storage operation failed.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database rejected or failed the statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations could not be applied.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row referenced by an update does not exist.
    #[error("{kind} {id} does not exist")]
    Missing {
        /// Which table.
        kind: &'static str,
        /// The identifier written.
        id: String,
    },

    /// A stored value could not be decoded into its record type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<UnknownStatus> for StoreError {
    fn from(err: UnknownStatus) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Map a driver error, surfacing unique violations as [`StoreError::Conflict`].
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Database(err)
}
