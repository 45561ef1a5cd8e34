//! Operations on the `events` table.
//!
//! Events are created on ingestion and only ever move forward through
//! `open -> enroute -> resolved`. The `enroute` transition is written by
//! the unit claim (see [`UnitStore::claim`](crate::unit_store::UnitStore::claim)),
//! so this module only owns insertion, lookup and resolution.

use chrono::{DateTime, Utc};
use lifeline_types::{Event, EventId, EventStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `events` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly ingested event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, event: &Event) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO events (id, severity, title, description, reference_clip_url, lat, lng,
                                  camera_id, ambulance_id, status, created_at, dispatched_at, resolved_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(event.id.into_inner())
        .bind(event.severity.as_str())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.reference_clip_url)
        .bind(event.lat)
        .bind(event.lng)
        .bind(event.camera_id.into_inner())
        .bind(event.ambulance_id.map(lifeline_types::UnitId::into_inner))
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.dispatched_at)
        .bind(event.resolved_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(event_id = %event.id, "Inserted event");
        Ok(())
    }

    /// Fetch one event by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the row is corrupt.
    pub async fn get(&self, id: EventId) -> Result<Option<Event>, DbError> {
        let row = sqlx::query_as::<_, EventRow>(
            r"SELECT id, severity, title, description, reference_clip_url, lat, lng,
                     camera_id, ambulance_id, status, created_at, dispatched_at, resolved_at
              FROM events
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    /// List events in creation order, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a row is corrupt.
    pub async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT id, severity, title, description, reference_clip_url, lat, lng,
                     camera_id, ambulance_id, status, created_at, dispatched_at, resolved_at
              FROM events
              WHERE $1::TEXT IS NULL OR status = $1
              ORDER BY created_at, id",
        )
        .bind(status.map(EventStatus::as_str))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    /// Mark an event resolved unless it already is.
    ///
    /// Returns `true` if this call performed the transition.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_resolved(&self, id: EventId, at: DateTime<Utc>) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE events
              SET status = 'resolved', resolved_at = $2
              WHERE id = $1 AND status <> 'resolved'",
        )
        .bind(id.into_inner())
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event ID.
    pub id: Uuid,
    /// Severity as stored text.
    pub severity: String,
    /// Headline.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Evidence clip URL.
    pub reference_clip_url: String,
    /// Incident latitude.
    pub lat: f64,
    /// Incident longitude.
    pub lng: f64,
    /// Reporting camera.
    pub camera_id: Uuid,
    /// Claimed unit, if any.
    pub ambulance_id: Option<Uuid>,
    /// Status as stored text.
    pub status: String,
    /// Ingestion time.
    pub created_at: DateTime<Utc>,
    /// Claim time.
    pub dispatched_at: Option<DateTime<Utc>>,
    /// Resolution time.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from(row.id),
            severity: row.severity.parse()?,
            title: row.title,
            description: row.description,
            reference_clip_url: row.reference_clip_url,
            lat: row.lat,
            lng: row.lng,
            camera_id: row.camera_id.into(),
            ambulance_id: row.ambulance_id.map(Into::into),
            status: row.status.parse()?,
            created_at: row.created_at,
            dispatched_at: row.dispatched_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifeline_types::Severity;

    use super::*;

    fn row() -> EventRow {
        EventRow {
            id: Uuid::now_v7(),
            severity: "emergency".to_owned(),
            title: "Collision".to_owned(),
            description: String::new(),
            reference_clip_url: String::new(),
            lat: 40.0,
            lng: -79.0,
            camera_id: Uuid::now_v7(),
            ambulance_id: None,
            status: "open".to_owned(),
            created_at: Utc::now(),
            dispatched_at: None,
            resolved_at: None,
        }
    }

    #[test]
    fn converts_row_to_event() {
        let event = Event::try_from(row()).unwrap();
        assert_eq!(event.severity, Severity::Emergency);
        assert_eq!(event.status, EventStatus::Open);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut bad = row();
        bad.status = "closed".to_owned();
        assert!(matches!(Event::try_from(bad), Err(DbError::InvalidEnum(_))));
    }
}
