//! In-process store with the same semantics as the `PostgreSQL` tables.
//!
//! Used for local development and tests. All four collections sit behind
//! one [`RwLock`]; every conditional write (claim, release, resolve) is a
//! check-and-write under a single write guard, which is what makes the
//! claim race-free here. The guard is never held across an `.await` on
//! anything but the lock itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lifeline_types::{
    Camera, CameraId, Event, EventId, EventStatus, Hospital, HospitalId, Leg, Unit, UnitId,
    UnitStatus,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::unit_store::UnitClaim;

#[derive(Debug, Default)]
struct Tables {
    cameras: BTreeMap<CameraId, Camera>,
    events: BTreeMap<EventId, Event>,
    units: BTreeMap<UnitId, Unit>,
    hospitals: BTreeMap<HospitalId, Hospital>,
}

/// Shared in-memory store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Cameras
    // -------------------------------------------------------------------------

    /// Register a camera. Names are unique, like the `cameras.name` column.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the ID or name is taken.
    pub async fn insert_camera(&self, camera: &Camera) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.cameras.contains_key(&camera.id) {
            return Err(DbError::Duplicate(format!("camera {}", camera.id)));
        }
        let taken = camera.name.as_deref().filter(|name| {
            tables
                .cameras
                .values()
                .any(|c| c.name.as_deref() == Some(*name))
        });
        if let Some(name) = taken {
            return Err(DbError::Duplicate(format!("camera name {name}")));
        }
        tables.cameras.insert(camera.id, camera.clone());
        Ok(())
    }

    /// Fetch a camera by ID.
    pub async fn get_camera(&self, id: CameraId) -> Option<Camera> {
        self.tables.read().await.cameras.get(&id).cloned()
    }

    /// Fetch a camera by name.
    pub async fn find_camera_by_name(&self, name: &str) -> Option<Camera> {
        self.tables
            .read()
            .await
            .cameras
            .values()
            .find(|c| c.name.as_deref() == Some(name))
            .cloned()
    }

    /// List cameras ordered by name (unnamed last), then ID.
    pub async fn list_cameras(&self) -> Vec<Camera> {
        let mut cameras: Vec<Camera> = self.tables.read().await.cameras.values().cloned().collect();
        cameras.sort_by(|a, b| {
            (a.name.is_none(), &a.name, a.id).cmp(&(b.name.is_none(), &b.name, b.id))
        });
        cameras
    }

    // -------------------------------------------------------------------------
    // Hospitals
    // -------------------------------------------------------------------------

    /// Register a hospital.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the ID is taken.
    pub async fn insert_hospital(&self, hospital: &Hospital) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.hospitals.contains_key(&hospital.id) {
            return Err(DbError::Duplicate(format!("hospital {}", hospital.id)));
        }
        tables.hospitals.insert(hospital.id, hospital.clone());
        Ok(())
    }

    /// List hospitals ordered by name, then ID.
    pub async fn list_hospitals(&self) -> Vec<Hospital> {
        let mut hospitals: Vec<Hospital> =
            self.tables.read().await.hospitals.values().cloned().collect();
        hospitals.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        hospitals
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Insert a freshly ingested event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the ID is taken.
    pub async fn insert_event(&self, event: &Event) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(DbError::Duplicate(format!("event {}", event.id)));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    /// Fetch an event by ID.
    pub async fn get_event(&self, id: EventId) -> Option<Event> {
        self.tables.read().await.events.get(&id).cloned()
    }

    /// List events in creation order, optionally filtered by status.
    pub async fn list_events(&self, status: Option<EventStatus>) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .tables
            .read()
            .await
            .events
            .values()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        events.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        events
    }

    /// Mark an event resolved unless it already is.
    pub async fn mark_event_resolved(&self, id: EventId, at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().await;
        match tables.events.get_mut(&id) {
            Some(event) if !event.is_resolved() => {
                event.status = EventStatus::Resolved;
                event.resolved_at = Some(at);
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Units
    // -------------------------------------------------------------------------

    /// Insert a provisioned unit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the ID is taken.
    pub async fn insert_unit(&self, unit: &Unit) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.units.contains_key(&unit.id) {
            return Err(DbError::Duplicate(format!("unit {}", unit.id)));
        }
        tables.units.insert(unit.id, unit.clone());
        Ok(())
    }

    /// Overwrite a unit's state. Unknown IDs are ignored, like an
    /// `UPDATE` matching no rows.
    pub async fn save_unit(&self, unit: &Unit) {
        if let Some(slot) = self.tables.write().await.units.get_mut(&unit.id) {
            slot.clone_from(unit);
        }
    }

    /// Fetch a unit by ID.
    pub async fn get_unit(&self, id: UnitId) -> Option<Unit> {
        self.tables.read().await.units.get(&id).cloned()
    }

    /// List every unit in ID order.
    pub async fn list_units(&self) -> Vec<Unit> {
        self.tables.read().await.units.values().cloned().collect()
    }

    /// List idle units in ID order.
    pub async fn list_idle_units(&self) -> Vec<Unit> {
        self.tables
            .read()
            .await
            .units
            .values()
            .filter(|u| u.is_idle())
            .cloned()
            .collect()
    }

    /// Count provisioned units.
    pub async fn count_units(&self) -> u64 {
        u64::try_from(self.tables.read().await.units.len()).unwrap_or(u64::MAX)
    }

    /// Claim an idle unit for an open event, both sides under one guard.
    pub async fn claim_unit(&self, claim: &UnitClaim) -> bool {
        let mut tables = self.tables.write().await;

        let event_open = tables
            .events
            .get(&claim.event_id)
            .is_some_and(|e| e.status == EventStatus::Open);
        let unit_idle = tables.units.get(&claim.unit_id).is_some_and(Unit::is_idle);
        if !event_open || !unit_idle {
            return false;
        }

        if let Some(unit) = tables.units.get_mut(&claim.unit_id) {
            unit.status = UnitStatus::Enroute;
            unit.leg = Some(Leg::Outbound);
            unit.event_id = Some(claim.event_id);
            unit.eta_seconds = Some(claim.eta_seconds);
            unit.path.clone_from(&claim.path);
            unit.updated_at = claim.at;
        }
        if let Some(event) = tables.events.get_mut(&claim.event_id) {
            event.status = EventStatus::Enroute;
            event.ambulance_id = Some(claim.unit_id);
            event.dispatched_at = Some(claim.at);
        }
        true
    }

    /// Return a unit to idle if it is still serving `event_id`.
    pub async fn release_unit(&self, unit_id: UnitId, event_id: EventId, at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().await;
        match tables.units.get_mut(&unit_id) {
            Some(unit) if unit.event_id == Some(event_id) => {
                unit.release(at);
                true
            }
            _ => false,
        }
    }
}
