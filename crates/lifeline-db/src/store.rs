//! Backend-agnostic store handle.
//!
//! An enum rather than a trait object: the operations are async and the
//! set of backends is closed. Clones are cheap and share the same
//! connection pool or in-memory tables.

use chrono::{DateTime, Utc};
use lifeline_types::{Camera, CameraId, Event, EventId, EventStatus, Hospital, Unit, UnitId};

use crate::catalog_store::CatalogStore;
use crate::error::DbError;
use crate::event_store::EventStore;
use crate::memory::MemoryStore;
use crate::postgres::PostgresPool;
use crate::unit_store::{UnitClaim, UnitStore};

/// The dispatch store: cameras, events, units and hospitals.
#[derive(Debug, Clone)]
pub enum Store {
    /// `PostgreSQL` tables.
    Postgres(PostgresPool),
    /// In-process tables.
    Memory(MemoryStore),
}

impl Store {
    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Short backend name for logging.
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Close the connection pool. A no-op for the in-memory store.
    pub async fn close(&self) {
        if let Self::Postgres(pg) = self {
            pg.close().await;
        }
    }

    // =========================================================================
    // Cameras & hospitals
    // =========================================================================

    /// Register a camera.
    pub async fn insert_camera(&self, camera: &Camera) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => CatalogStore::new(pg.pool()).insert_camera(camera).await,
            Self::Memory(mem) => mem.insert_camera(camera).await,
        }
    }

    /// Fetch a camera by ID.
    pub async fn get_camera(&self, id: CameraId) -> Result<Option<Camera>, DbError> {
        match self {
            Self::Postgres(pg) => CatalogStore::new(pg.pool()).get_camera(id).await,
            Self::Memory(mem) => Ok(mem.get_camera(id).await),
        }
    }

    /// Fetch a camera by name.
    pub async fn find_camera_by_name(&self, name: &str) -> Result<Option<Camera>, DbError> {
        match self {
            Self::Postgres(pg) => CatalogStore::new(pg.pool()).find_camera_by_name(name).await,
            Self::Memory(mem) => Ok(mem.find_camera_by_name(name).await),
        }
    }

    /// List every camera.
    pub async fn list_cameras(&self) -> Result<Vec<Camera>, DbError> {
        match self {
            Self::Postgres(pg) => CatalogStore::new(pg.pool()).list_cameras().await,
            Self::Memory(mem) => Ok(mem.list_cameras().await),
        }
    }

    /// Register a hospital.
    pub async fn insert_hospital(&self, hospital: &Hospital) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => CatalogStore::new(pg.pool()).insert_hospital(hospital).await,
            Self::Memory(mem) => mem.insert_hospital(hospital).await,
        }
    }

    /// List every hospital.
    pub async fn list_hospitals(&self) -> Result<Vec<Hospital>, DbError> {
        match self {
            Self::Postgres(pg) => CatalogStore::new(pg.pool()).list_hospitals().await,
            Self::Memory(mem) => Ok(mem.list_hospitals().await),
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Insert a freshly ingested event.
    pub async fn insert_event(&self, event: &Event) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => EventStore::new(pg.pool()).insert(event).await,
            Self::Memory(mem) => mem.insert_event(event).await,
        }
    }

    /// Fetch an event by ID.
    pub async fn get_event(&self, id: EventId) -> Result<Option<Event>, DbError> {
        match self {
            Self::Postgres(pg) => EventStore::new(pg.pool()).get(id).await,
            Self::Memory(mem) => Ok(mem.get_event(id).await),
        }
    }

    /// List events in creation order, optionally filtered by status.
    pub async fn list_events(&self, status: Option<EventStatus>) -> Result<Vec<Event>, DbError> {
        match self {
            Self::Postgres(pg) => EventStore::new(pg.pool()).list(status).await,
            Self::Memory(mem) => Ok(mem.list_events(status).await),
        }
    }

    /// Mark an event resolved unless it already is. Returns `true` if this
    /// call performed the transition.
    pub async fn mark_event_resolved(
        &self,
        id: EventId,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        match self {
            Self::Postgres(pg) => EventStore::new(pg.pool()).mark_resolved(id, at).await,
            Self::Memory(mem) => Ok(mem.mark_event_resolved(id, at).await),
        }
    }

    // =========================================================================
    // Units
    // =========================================================================

    /// Insert a provisioned unit.
    pub async fn insert_unit(&self, unit: &Unit) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).insert(unit).await,
            Self::Memory(mem) => mem.insert_unit(unit).await,
        }
    }

    /// Overwrite a unit's state.
    pub async fn save_unit(&self, unit: &Unit) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).save(unit).await,
            Self::Memory(mem) => {
                mem.save_unit(unit).await;
                Ok(())
            }
        }
    }

    /// Fetch a unit by ID.
    pub async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).get(id).await,
            Self::Memory(mem) => Ok(mem.get_unit(id).await),
        }
    }

    /// List every unit.
    pub async fn list_units(&self) -> Result<Vec<Unit>, DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).list().await,
            Self::Memory(mem) => Ok(mem.list_units().await),
        }
    }

    /// List idle units.
    pub async fn list_idle_units(&self) -> Result<Vec<Unit>, DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).list_idle().await,
            Self::Memory(mem) => Ok(mem.list_idle_units().await),
        }
    }

    /// Count provisioned units.
    pub async fn count_units(&self) -> Result<u64, DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).count().await,
            Self::Memory(mem) => Ok(mem.count_units().await),
        }
    }

    /// Atomically claim an idle unit for an open event. Returns `false`
    /// when the unit or the event has moved on; nothing is written then.
    pub async fn claim_unit(&self, claim: &UnitClaim) -> Result<bool, DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).claim(claim).await,
            Self::Memory(mem) => Ok(mem.claim_unit(claim).await),
        }
    }

    /// Return a unit to idle if it still serves `event_id`.
    pub async fn release_unit(
        &self,
        unit_id: UnitId,
        event_id: EventId,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        match self {
            Self::Postgres(pg) => UnitStore::new(pg.pool()).release(unit_id, event_id, at).await,
            Self::Memory(mem) => Ok(mem.release_unit(unit_id, event_id, at).await),
        }
    }
}

impl From<MemoryStore> for Store {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PostgresPool> for Store {
    fn from(pool: PostgresPool) -> Self {
        Self::Postgres(pool)
    }
}
