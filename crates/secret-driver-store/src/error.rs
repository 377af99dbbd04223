//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Value encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot could not be turned back into device state.
    #[error("core error: {0}")]
    Core(#[from] secret_driver_core::CoreError),

    /// A published snapshot is missing one of its fields.
    #[error("snapshot field missing: {0}")]
    MissingField(String),

    /// The restored fields do not hash to the published digest.
    #[error("snapshot digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// The store's lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// A blocking task could not be joined.
    #[error("blocking task failed: {0}")]
    Blocking(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
