//! Operations on the `ambulances` table.
//!
//! The only write that may race is [`UnitStore::claim`]. It is a single
//! conditional `UPDATE ... WHERE status = 'idle'` committed together with
//! the event side in one transaction, so two dispatchers can never both
//! take the same unit. Walk updates ([`UnitStore::save`]) come only from
//! the simulator that owns the unit.

use chrono::{DateTime, Utc};
use lifeline_types::{EventId, Unit, UnitId, Waypoint};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::DbError;

/// Everything written when a unit is claimed for an event.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitClaim {
    /// The unit to move from `idle` to `enroute`.
    pub unit_id: UnitId,
    /// The `open` event it will serve.
    pub event_id: EventId,
    /// Routing oracle ETA for the outbound leg.
    pub eta_seconds: u32,
    /// Outbound route, unit to incident.
    pub path: Vec<Waypoint>,
    /// Claim time, written to `updated_at` and `dispatched_at`.
    pub at: DateTime<Utc>,
}

/// Operations on the `ambulances` table.
pub struct UnitStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UnitStore<'a> {
    /// Create a new unit store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a provisioned unit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, unit: &Unit) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO ambulances (id, lat, lng, status, leg, event_id, eta_seconds, path, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(unit.id.into_inner())
        .bind(unit.lat)
        .bind(unit.lng)
        .bind(unit.status.as_str())
        .bind(unit.leg.map(lifeline_types::Leg::as_str))
        .bind(unit.event_id.map(EventId::into_inner))
        .bind(eta_to_db(unit.eta_seconds))
        .bind(Json(&unit.path))
        .bind(unit.updated_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(unit_id = %unit.id, "Inserted unit");
        Ok(())
    }

    /// Overwrite a unit's mutable state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn save(&self, unit: &Unit) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE ambulances
              SET lat = $2, lng = $3, status = $4, leg = $5, event_id = $6,
                  eta_seconds = $7, path = $8, updated_at = $9
              WHERE id = $1",
        )
        .bind(unit.id.into_inner())
        .bind(unit.lat)
        .bind(unit.lng)
        .bind(unit.status.as_str())
        .bind(unit.leg.map(lifeline_types::Leg::as_str))
        .bind(unit.event_id.map(EventId::into_inner))
        .bind(eta_to_db(unit.eta_seconds))
        .bind(Json(&unit.path))
        .bind(unit.updated_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one unit by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the row is corrupt.
    pub async fn get(&self, id: UnitId) -> Result<Option<Unit>, DbError> {
        let row = sqlx::query_as::<_, UnitRow>(
            r"SELECT id, lat, lng, status, leg, event_id, eta_seconds, path, updated_at
              FROM ambulances
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(Unit::try_from).transpose()
    }

    /// List every unit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a row is corrupt.
    pub async fn list(&self) -> Result<Vec<Unit>, DbError> {
        let rows = sqlx::query_as::<_, UnitRow>(
            r"SELECT id, lat, lng, status, leg, event_id, eta_seconds, path, updated_at
              FROM ambulances
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Unit::try_from).collect()
    }

    /// List units currently `idle`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a row is corrupt.
    pub async fn list_idle(&self) -> Result<Vec<Unit>, DbError> {
        let rows = sqlx::query_as::<_, UnitRow>(
            r"SELECT id, lat, lng, status, leg, event_id, eta_seconds, path, updated_at
              FROM ambulances
              WHERE status = 'idle'
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Unit::try_from).collect()
    }

    /// Count provisioned units.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self) -> Result<u64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ambulances")
            .fetch_one(self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Claim an idle unit for an open event.
    ///
    /// Both rows are updated in one transaction. Returns `false`, with
    /// nothing written, if the event is no longer open or the unit is no
    /// longer idle.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the transaction fails.
    pub async fn claim(&self, claim: &UnitClaim) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        // Event row first: a second claim for the same event blocks on the
        // row lock and then sees it is no longer open.
        let event_rows = sqlx::query(
            r"UPDATE events
              SET status = 'enroute', ambulance_id = $2, dispatched_at = $3
              WHERE id = $1 AND status = 'open'",
        )
        .bind(claim.event_id.into_inner())
        .bind(claim.unit_id.into_inner())
        .bind(claim.at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if event_rows == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let unit_rows = sqlx::query(
            r"UPDATE ambulances
              SET status = 'enroute', leg = 'outbound', event_id = $2,
                  eta_seconds = $3, path = $4, updated_at = $5
              WHERE id = $1 AND status = 'idle'",
        )
        .bind(claim.unit_id.into_inner())
        .bind(claim.event_id.into_inner())
        .bind(eta_to_db(Some(claim.eta_seconds)))
        .bind(Json(&claim.path))
        .bind(claim.at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if unit_rows == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Return a unit to `idle` if it is still serving `event_id`.
    ///
    /// Returns `true` if the unit was released.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn release(
        &self,
        unit_id: UnitId,
        event_id: EventId,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE ambulances
              SET status = 'idle', leg = NULL, event_id = NULL, eta_seconds = NULL,
                  path = '[]'::JSONB, updated_at = $3
              WHERE id = $1 AND event_id = $2",
        )
        .bind(unit_id.into_inner())
        .bind(event_id.into_inner())
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `ambulances` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitRow {
    /// Unit ID.
    pub id: Uuid,
    /// Current latitude.
    pub lat: f64,
    /// Current longitude.
    pub lng: f64,
    /// Status as stored text.
    pub status: String,
    /// Leg as stored text.
    pub leg: Option<String>,
    /// Event being served.
    pub event_id: Option<Uuid>,
    /// Remaining seconds on the current leg.
    pub eta_seconds: Option<i32>,
    /// Remaining waypoints.
    pub path: Json<Vec<Waypoint>>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UnitRow> for Unit {
    type Error = DbError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        let eta_seconds = row
            .eta_seconds
            .map(|eta| {
                u32::try_from(eta).map_err(|e| {
                    DbError::Corrupt(format!("unit {} eta_seconds {eta}: {e}", row.id))
                })
            })
            .transpose()?;

        Ok(Self {
            id: UnitId::from(row.id),
            lat: row.lat,
            lng: row.lng,
            status: row.status.parse()?,
            leg: row.leg.as_deref().map(str::parse).transpose()?,
            event_id: row.event_id.map(Into::into),
            eta_seconds,
            path: row.path.0,
            updated_at: row.updated_at,
        })
    }
}

/// ETAs are stored as `INTEGER`; anything past `i32::MAX` saturates.
fn eta_to_db(eta: Option<u32>) -> Option<i32> {
    eta.map(|s| i32::try_from(s).unwrap_or(i32::MAX))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifeline_types::{Coordinates, Leg, UnitStatus};

    use super::*;

    fn row() -> UnitRow {
        UnitRow {
            id: Uuid::now_v7(),
            lat: 40.0,
            lng: -79.0,
            status: "enroute".to_owned(),
            leg: Some("return".to_owned()),
            event_id: None,
            eta_seconds: Some(3),
            path: Json(vec![Coordinates::new(40.0, -79.0)]),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn converts_row_to_unit() {
        let unit = Unit::try_from(row()).unwrap();
        assert_eq!(unit.status, UnitStatus::Enroute);
        assert_eq!(unit.leg, Some(Leg::Return));
        assert_eq!(unit.eta_seconds, Some(3));
        assert_eq!(unit.path.len(), 1);
    }

    #[test]
    fn negative_eta_is_corrupt() {
        let mut bad = row();
        bad.eta_seconds = Some(-1);
        assert!(matches!(Unit::try_from(bad), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn eta_saturates_on_write() {
        assert_eq!(eta_to_db(Some(u32::MAX)), Some(i32::MAX));
        assert_eq!(eta_to_db(Some(7)), Some(7));
        assert_eq!(eta_to_db(None), None);
    }
}
