//! Store error types.

use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The email is already registered (unique index violation).
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// The order number is already taken (unique index violation).
    #[error("Order number already exists: {0}")]
    DuplicateOrderNumber(String),

    /// The slug is already taken (unique index violation).
    #[error("Course slug already exists: {0}")]
    DuplicateSlug(String),

    /// The referenced document does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
