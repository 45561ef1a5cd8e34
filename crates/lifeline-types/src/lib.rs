//! Shared type definitions for the Lifeline dispatch backend.
//!
//! This crate is the single source of truth for the records exchanged
//! between the store, the dispatch core, the HTTP API and the live channel.
//! Types flow downstream to `TypeScript` via `ts-rs` for the map dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for every record identifier
//! - [`enums`] -- Severity, status, leg and live-channel enumerations
//! - [`structs`] -- Events, units, cameras, hospitals and live messages

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EntityKind, EventStatus, Leg, Severity, UnitPhase, UnitStatus, UnknownVariant};
pub use ids::{CameraId, EventId, HospitalId, UnitId};
pub use structs::{Camera, Coordinates, Event, Hospital, LiveMessage, Unit, Waypoint};
