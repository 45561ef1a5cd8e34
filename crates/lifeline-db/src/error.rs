//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and flags rows that no longer decode into the domain
//! types.

use lifeline_types::UnknownVariant;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored status, severity or leg string is not a known variant.
    #[error("Invalid stored value: {0}")]
    InvalidEnum(#[from] UnknownVariant),

    /// A stored row violates a domain constraint (e.g. a negative ETA).
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// An insert collided with an existing key.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
