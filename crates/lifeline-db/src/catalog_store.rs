//! Operations on the `cameras` and `hospitals` tables.
//!
//! Both are reference data: written at provisioning time and read by the
//! ingestion path and the map dashboard.

use lifeline_types::{Camera, CameraId, Hospital, HospitalId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on cameras and hospitals.
pub struct CatalogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogStore<'a> {
    /// Create a new catalog store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Cameras
    // =========================================================================

    /// Register a camera.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// duplicate name).
    pub async fn insert_camera(&self, camera: &Camera) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO cameras (id, name, lat, lng, latest_frame_url)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(camera.id.into_inner())
        .bind(camera.name.as_deref())
        .bind(camera.lat)
        .bind(camera.lng)
        .bind(&camera.latest_frame_url)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a camera by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_camera(&self, id: CameraId) -> Result<Option<Camera>, DbError> {
        let row = sqlx::query_as::<_, CameraRow>(
            r"SELECT id, name, lat, lng, latest_frame_url FROM cameras WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Camera::from))
    }

    /// Fetch a camera by its detector-facing name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_camera_by_name(&self, name: &str) -> Result<Option<Camera>, DbError> {
        let row = sqlx::query_as::<_, CameraRow>(
            r"SELECT id, name, lat, lng, latest_frame_url FROM cameras WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Camera::from))
    }

    /// List every camera.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_cameras(&self) -> Result<Vec<Camera>, DbError> {
        let rows = sqlx::query_as::<_, CameraRow>(
            r"SELECT id, name, lat, lng, latest_frame_url FROM cameras ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Camera::from).collect())
    }

    // =========================================================================
    // Hospitals
    // =========================================================================

    /// Register a hospital.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_hospital(&self, hospital: &Hospital) -> Result<(), DbError> {
        sqlx::query(r"INSERT INTO hospitals (id, name, lat, lng) VALUES ($1, $2, $3, $4)")
            .bind(hospital.id.into_inner())
            .bind(&hospital.name)
            .bind(hospital.lat)
            .bind(hospital.lng)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// List every hospital.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_hospitals(&self) -> Result<Vec<Hospital>, DbError> {
        let rows = sqlx::query_as::<_, HospitalRow>(
            r"SELECT id, name, lat, lng FROM hospitals ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Hospital::from).collect())
    }
}

/// A row from the `cameras` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CameraRow {
    /// Camera ID.
    pub id: Uuid,
    /// Detector-facing name.
    pub name: Option<String>,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Latest frame URL.
    pub latest_frame_url: String,
}

impl From<CameraRow> for Camera {
    fn from(row: CameraRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            lat: row.lat,
            lng: row.lng,
            latest_frame_url: row.latest_frame_url,
        }
    }
}

/// A row from the `hospitals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HospitalRow {
    /// Hospital ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl From<HospitalRow> for Hospital {
    fn from(row: HospitalRow) -> Self {
        Self {
            id: HospitalId::from(row.id),
            name: row.name,
            lat: row.lat,
            lng: row.lng,
        }
    }
}
