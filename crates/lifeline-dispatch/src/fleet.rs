//! Fleet provisioning.
//!
//! On startup an empty store (no ambulances) is seeded with the configured
//! cameras, hospitals and idle ambulances. A store that already has units
//! is left alone, so restarts against `PostgreSQL` are idempotent.

use chrono::{DateTime, Utc};
use lifeline_db::{DbError, Store};
use lifeline_types::{Camera, CameraId, Coordinates, Hospital, HospitalId, Unit};
use tracing::info;

use crate::config::FleetConfig;

/// What [`provision`] inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Cameras added.
    pub cameras: usize,
    /// Hospitals added.
    pub hospitals: usize,
    /// Ambulances added.
    pub ambulances: usize,
}

impl ProvisionReport {
    /// Whether nothing was inserted.
    pub const fn is_empty(&self) -> bool {
        self.cameras == 0 && self.hospitals == 0 && self.ambulances == 0
    }
}

/// Seed `store` from `fleet` if it has no ambulances yet.
///
/// Cameras whose name is already registered are skipped.
///
/// # Errors
///
/// Returns [`DbError`] if a store call fails. Rows inserted before the
/// failure stay in place.
pub async fn provision(
    store: &Store,
    fleet: &FleetConfig,
    now: DateTime<Utc>,
) -> Result<ProvisionReport, DbError> {
    let existing = store.count_units().await?;
    if existing > 0 {
        info!(existing, "Fleet already provisioned, skipping seed");
        return Ok(ProvisionReport::default());
    }

    let mut report = ProvisionReport::default();

    for seed in &fleet.cameras {
        if store.find_camera_by_name(&seed.name).await?.is_some() {
            continue;
        }
        let camera = Camera {
            id: CameraId::new(),
            name: Some(seed.name.clone()),
            lat: seed.lat,
            lng: seed.lng,
            latest_frame_url: seed.latest_frame_url.clone(),
        };
        store.insert_camera(&camera).await?;
        report.cameras = report.cameras.saturating_add(1);
    }

    for seed in &fleet.hospitals {
        let hospital = Hospital {
            id: HospitalId::new(),
            name: seed.name.clone(),
            lat: seed.lat,
            lng: seed.lng,
        };
        store.insert_hospital(&hospital).await?;
        report.hospitals = report.hospitals.saturating_add(1);
    }

    for seed in &fleet.ambulances {
        let unit = Unit::idle_at(Coordinates::new(seed.lat, seed.lng), now);
        store.insert_unit(&unit).await?;
        report.ambulances = report.ambulances.saturating_add(1);
    }

    info!(
        cameras = report.cameras,
        hospitals = report.hospitals,
        ambulances = report.ambulances,
        backend = store.backend(),
        "Fleet provisioned"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_empty_store_once() {
        let store = Store::memory();
        let fleet = FleetConfig::default();

        let first = provision(&store, &fleet, Utc::now()).await.unwrap();
        assert_eq!(first.cameras, 3);
        assert_eq!(first.hospitals, 3);
        assert_eq!(first.ambulances, 3);
        assert_eq!(store.list_idle_units().await.unwrap().len(), 3);
        assert!(store.find_camera_by_name("CAM_12").await.unwrap().is_some());

        let second = provision(&store, &fleet, Utc::now()).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.list_units().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn skips_cameras_already_registered() {
        let store = Store::memory();
        let fleet = FleetConfig::default();
        let camera = Camera {
            id: CameraId::new(),
            name: Some("CAM_12".to_owned()),
            lat: 0.0,
            lng: 0.0,
            latest_frame_url: String::new(),
        };
        store.insert_camera(&camera).await.unwrap();

        let report = provision(&store, &fleet, Utc::now()).await.unwrap();
        assert_eq!(report.cameras, 2);
        assert_eq!(store.list_cameras().await.unwrap().len(), 3);
    }
}
