//! Core entity structs for the Lifeline dispatch backend.
//!
//! Records are flat (`lat`/`lng` live directly on the record) so the JSON
//! pushed to the dashboard matches the persisted layout column for column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EntityKind, EventStatus, Leg, Severity, UnitPhase, UnitStatus};
use crate::ids::{CameraId, EventId, HospitalId, UnitId};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS-84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl Coordinates {
    /// Construct a coordinate pair.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One point of a route. Order within a path is traversal order.
pub type Waypoint = Coordinates;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A detected or reported incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// Whether the incident needs a unit.
    pub severity: Severity,
    /// Short headline shown on the dashboard.
    pub title: String,
    /// Free-form description from the detector or operator.
    pub description: String,
    /// Link to the evidence clip that triggered the event.
    pub reference_clip_url: String,
    /// Incident latitude.
    pub lat: f64,
    /// Incident longitude.
    pub lng: f64,
    /// Camera that reported the incident.
    pub camera_id: CameraId,
    /// Unit claimed for this incident. Kept as history once resolved.
    pub ambulance_id: Option<UnitId>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// When the event was ingested.
    pub created_at: DateTime<Utc>,
    /// When a unit was claimed for it.
    pub dispatched_at: Option<DateTime<Utc>>,
    /// When it was closed.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Create a new `open` event at the given location.
    pub fn open(
        severity: Severity,
        title: String,
        description: String,
        reference_clip_url: String,
        location: Coordinates,
        camera_id: CameraId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            severity,
            title,
            description,
            reference_clip_url,
            lat: location.lat,
            lng: location.lng,
            camera_id,
            ambulance_id: None,
            status: EventStatus::Open,
            created_at,
            dispatched_at: None,
            resolved_at: None,
        }
    }

    /// Incident location.
    pub const fn location(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// Whether the event has been closed.
    pub fn is_resolved(&self) -> bool {
        self.status == EventStatus::Resolved
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// An ambulance and its live dispatch state.
///
/// `path` holds the *remaining* route and shrinks as the unit advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Current latitude.
    pub lat: f64,
    /// Current longitude.
    pub lng: f64,
    /// Stored availability.
    pub status: UnitStatus,
    /// Which half of the round trip an enroute unit is on.
    pub leg: Option<Leg>,
    /// Incident this unit is actively serving.
    pub event_id: Option<EventId>,
    /// Estimated seconds until the end of the current leg.
    pub eta_seconds: Option<u32>,
    /// Remaining waypoints of the current leg.
    pub path: Vec<Waypoint>,
    /// Last time the record was written.
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Provision a new idle unit parked at `location`.
    pub fn idle_at(location: Coordinates, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: UnitId::new(),
            lat: location.lat,
            lng: location.lng,
            status: UnitStatus::Idle,
            leg: None,
            event_id: None,
            eta_seconds: None,
            path: Vec::new(),
            updated_at,
        }
    }

    /// Current position.
    pub const fn location(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// Move the unit to `point`.
    pub const fn set_location(&mut self, point: Coordinates) {
        self.lat = point.lat;
        self.lng = point.lng;
    }

    /// Whether the matcher may claim this unit.
    pub fn is_idle(&self) -> bool {
        self.status == UnitStatus::Idle
    }

    /// Explicit state-machine position derived from `status` and `leg`.
    ///
    /// An enroute unit without a recorded leg is reported as outbound,
    /// since the claim is the only writer that can produce it.
    pub const fn phase(&self) -> UnitPhase {
        match (self.status, self.leg) {
            (UnitStatus::Idle, _) => UnitPhase::Idle,
            (UnitStatus::Unavailable, _) => UnitPhase::Unavailable,
            (UnitStatus::Enroute, Some(Leg::Return)) => UnitPhase::EnrouteReturn,
            (UnitStatus::Enroute, Some(Leg::Outbound) | None) => UnitPhase::EnrouteOutbound,
        }
    }

    /// Return the unit to the idle state, dropping any assignment.
    pub fn release(&mut self, now: DateTime<Utc>) {
        self.status = UnitStatus::Idle;
        self.leg = None;
        self.event_id = None;
        self.eta_seconds = None;
        self.path.clear();
        self.updated_at = now;
    }
}

// ---------------------------------------------------------------------------
// Camera / Hospital
// ---------------------------------------------------------------------------

/// A camera feed that reports incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Camera {
    /// Unique identifier.
    pub id: CameraId,
    /// Human-readable name used by detectors (e.g. `CAM_12`).
    pub name: Option<String>,
    /// Camera latitude.
    pub lat: f64,
    /// Camera longitude.
    pub lng: f64,
    /// URL serving the most recent frame.
    pub latest_frame_url: String,
}

impl Camera {
    /// Camera location.
    pub const fn location(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// A receiving hospital shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Hospital {
    /// Unique identifier.
    pub id: HospitalId,
    /// Display name.
    pub name: String,
    /// Hospital latitude.
    pub lat: f64,
    /// Hospital longitude.
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// Live channel
// ---------------------------------------------------------------------------

/// One snapshot pushed to every live observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LiveMessage {
    /// Which collection `data` contains.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// The full collection at broadcast time.
    pub data: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit() -> Unit {
        Unit::idle_at(Coordinates::new(40.0, -79.0), Utc::now())
    }

    #[test]
    fn phase_follows_status_and_leg() {
        let mut u = unit();
        assert_eq!(u.phase(), UnitPhase::Idle);

        u.status = UnitStatus::Enroute;
        u.leg = Some(Leg::Outbound);
        assert_eq!(u.phase(), UnitPhase::EnrouteOutbound);

        u.leg = Some(Leg::Return);
        assert_eq!(u.phase(), UnitPhase::EnrouteReturn);

        u.status = UnitStatus::Unavailable;
        assert_eq!(u.phase(), UnitPhase::Unavailable);
    }

    #[test]
    fn release_clears_assignment() {
        let mut u = unit();
        u.status = UnitStatus::Enroute;
        u.leg = Some(Leg::Outbound);
        u.event_id = Some(EventId::new());
        u.eta_seconds = Some(42);
        u.path = vec![Coordinates::new(40.1, -79.1)];

        u.release(Utc::now());

        assert!(u.is_idle());
        assert_eq!(u.leg, None);
        assert_eq!(u.event_id, None);
        assert_eq!(u.eta_seconds, None);
        assert!(u.path.is_empty());
    }

    #[test]
    fn live_message_uses_type_key() {
        let msg = LiveMessage {
            kind: EntityKind::Events,
            data: serde_json::json!([]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "events");
        assert!(json["data"].is_array());
    }
}
