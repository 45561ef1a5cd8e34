//! Data layer for the Lifeline dispatch backend.
//!
//! Four collections -- cameras, events, ambulances and hospitals -- kept
//! either in `PostgreSQL` or in process. Callers go through [`Store`],
//! which exposes the same operations, including the atomic claim, over
//! both backends.
//!
//! # Architecture
//!
//! ```text
//! Store
//!     |
//!     +-- Postgres(PostgresPool)
//!     |       |-- EventStore    (events)
//!     |       |-- UnitStore     (ambulances, conditional claim/release)
//!     |       +-- CatalogStore  (cameras, hospitals)
//!     |
//!     +-- Memory(MemoryStore)   (same semantics under one RwLock)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and migrations
//! - [`event_store`] -- Event insertion, lookup and resolution
//! - [`unit_store`] -- Unit persistence and the conditional claim
//! - [`catalog_store`] -- Cameras and hospitals
//! - [`memory`] -- In-process store
//! - [`store`] -- The [`Store`] handle
//! - [`error`] -- Shared error types

pub mod catalog_store;
pub mod error;
pub mod event_store;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod unit_store;

// Re-export primary types for convenience.
pub use catalog_store::{CameraRow, CatalogStore, HospitalRow};
pub use error::DbError;
pub use event_store::{EventRow, EventStore};
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::Store;
pub use unit_store::{UnitClaim, UnitRow, UnitStore};
