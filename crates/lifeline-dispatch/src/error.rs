//! Error types for the dispatch core.
//!
//! Expected no-op outcomes of an assignment (no capacity, lost race,
//! routing failure) are *not* errors; they are reported through
//! [`AssignOutcome`](crate::matcher::AssignOutcome). [`DispatchError`] covers
//! lookups that fail outright and store failures that must reach the
//! caller.

use lifeline_db::DbError;
use lifeline_types::{EventId, UnitId};

/// Errors surfaced by [`Dispatcher`](crate::service::Dispatcher) operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The referenced camera does not exist (by ID or by name).
    #[error("camera not found: {0}")]
    CameraNotFound(String),

    /// The referenced event does not exist.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The referenced unit does not exist.
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// A simulator is already walking this unit.
    #[error("unit {0} is already being simulated")]
    AlreadySimulating(UnitId),

    /// The unit has no path to walk.
    #[error("unit {0} has no path to simulate")]
    NoPath(UnitId),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// A collection could not be serialized for the live channel.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
