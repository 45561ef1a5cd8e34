//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Welcome message |
//! | `POST` | `/process_event` | Ingest a detector report |
//! | `GET` | `/cameras` | List cameras |
//! | `POST` | `/cameras/:id/trigger_emergency` | Operator-raised emergency |
//! | `GET` | `/events` | List events, optionally by status |
//! | `POST` | `/events/:id/resolve` | Close an event and free its unit |
//! | `GET` | `/ambulances` | List ambulances with phase and walk state |
//! | `POST` | `/ambulances/:id/simulate` | Walk an ambulance along its path |
//! | `GET` | `/hospitals` | List hospitals |

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use lifeline_dispatch::{AssignOutcome, IncidentReport, Ingested};
use lifeline_dispatch::service::MANUAL_TRIGGER_TITLE;
use lifeline_types::{
    Camera, CameraId, Event, EventId, EventStatus, Hospital, Severity, Unit, UnitId, UnitPhase,
    Waypoint,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /process_event`.
#[derive(Debug, Deserialize)]
pub struct ProcessEventRequest {
    /// Camera ID or camera name.
    pub camera_id: String,
    /// Reported severity.
    pub severity: Severity,
    /// Headline.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Evidence clip.
    #[serde(default)]
    pub reference_clip_url: String,
}

/// Body of `POST /cameras/{id}/trigger_emergency`.
#[derive(Debug, Default, Deserialize)]
pub struct ManualEmergencyRequest {
    /// Description; a random one is used when absent.
    #[serde(default)]
    pub description: Option<String>,
    /// Evidence clip.
    #[serde(default)]
    pub reference_clip_url: Option<String>,
}

/// Query parameters for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only events in this status.
    pub status: Option<EventStatus>,
}

/// What happened when the dispatcher tried to assign a unit.
#[derive(Debug, Serialize)]
pub struct AssignmentView {
    /// `assigned`, `no_capacity`, `race_lost`, ...
    pub outcome: &'static str,
    /// The claimed unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambulance_id: Option<UnitId>,
    /// Oracle ETA in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u32>,
    /// Route to the incident.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Waypoint>,
    /// Failure detail for `routing_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&AssignOutcome> for AssignmentView {
    fn from(outcome: &AssignOutcome) -> Self {
        let assignment = outcome.assignment();
        let detail = match outcome {
            AssignOutcome::RoutingFailed(e) => Some(e.to_string()),
            AssignOutcome::EventNotOpen(status) => Some(format!("event is {status}")),
            _ => None,
        };
        Self {
            outcome: outcome.label(),
            ambulance_id: assignment.map(|a| a.unit.id),
            eta_seconds: assignment.map(|a| a.eta_seconds),
            path: assignment.map(|a| a.path.clone()).unwrap_or_default(),
            detail,
        }
    }
}

/// Response of the two ingestion endpoints.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Always `true`; failures are error responses.
    pub ok: bool,
    /// The stored event.
    pub event: Event,
    /// Assignment attempt; `null` for informational events.
    pub assignment: Option<AssignmentView>,
    /// Human-readable summary, set for manual triggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IngestResponse {
    fn new(ingested: Ingested, message: Option<String>) -> Self {
        Self {
            ok: true,
            assignment: ingested.assignment.as_ref().map(AssignmentView::from),
            event: ingested.event,
            message,
        }
    }
}

/// An event with its camera's name resolved.
#[derive(Debug, Serialize)]
pub struct EventView {
    /// The event.
    #[serde(flatten)]
    pub event: Event,
    /// Name of the reporting camera, if it has one.
    pub camera_name: Option<String>,
}

/// An ambulance with its derived phase and walk state.
#[derive(Debug, Serialize)]
pub struct UnitView {
    /// The unit as stored.
    #[serde(flatten)]
    pub unit: Unit,
    /// Status and leg folded into one value.
    pub phase: UnitPhase,
    /// Whether a walk is currently driving this unit.
    pub simulating: bool,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Welcome message.
#[allow(clippy::unused_async)]
pub async fn index() -> Json<Value> {
    Json(serde_json::json!({ "message": "Welcome to Lifeline API!" }))
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Ingest a detector report.
///
/// # Route
///
/// `POST /process_event`
pub async fn process_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessEventRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    info!(
        camera = %request.camera_id,
        severity = %request.severity,
        title = %request.title,
        "Event received"
    );
    let report = IncidentReport {
        camera: request.camera_id,
        severity: request.severity,
        title: request.title,
        description: request.description,
        reference_clip_url: request.reference_clip_url,
    };
    let ingested = state.dispatcher.ingest(report).await?;
    Ok(Json(IngestResponse::new(ingested, None)))
}

/// Raise an emergency for a camera on an operator's behalf.
///
/// # Route
///
/// `POST /cameras/{id}/trigger_emergency`
pub async fn trigger_emergency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ManualEmergencyRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let camera_id: CameraId = parse_id(&id)?;
    let ingested = state
        .dispatcher
        .trigger_manual(camera_id, request.description, request.reference_clip_url)
        .await?;
    let message = format!("Emergency triggered: {MANUAL_TRIGGER_TITLE}");
    Ok(Json(IngestResponse::new(ingested, Some(message))))
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Resolve an event and free its unit.
///
/// # Route
///
/// `POST /events/{id}/resolve`
pub async fn resolve_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let event = state.dispatcher.resolve_event(event_id).await?;
    Ok(Json(serde_json::json!({ "ok": true, "event": event })))
}

/// Start walking an ambulance along its stored path.
///
/// # Route
///
/// `POST /ambulances/{id}/simulate`
pub async fn simulate_ambulance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let unit_id: UnitId = parse_id(&id)?;
    let unit = state.dispatcher.simulate_unit(unit_id).await?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "ambulance_id": unit.id,
        "waypoints": unit.path.len(),
    })))
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// List cameras.
///
/// # Route
///
/// `GET /cameras`
pub async fn list_cameras(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Camera>>, ApiError> {
    Ok(Json(state.dispatcher.store().list_cameras().await?))
}

/// List events, oldest first, optionally filtered by `status`.
///
/// # Route
///
/// `GET /events?status=open`
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventView>>, ApiError> {
    let store = state.dispatcher.store();
    let events = store.list_events(query.status).await?;
    let names: HashMap<CameraId, String> = store
        .list_cameras()
        .await?
        .into_iter()
        .filter_map(|c| c.name.map(|name| (c.id, name)))
        .collect();

    let views = events
        .into_iter()
        .map(|event| EventView {
            camera_name: names.get(&event.camera_id).cloned(),
            event,
        })
        .collect();
    Ok(Json(views))
}

/// List ambulances.
///
/// # Route
///
/// `GET /ambulances`
pub async fn list_ambulances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UnitView>>, ApiError> {
    let units = state.dispatcher.store().list_units().await?;
    let registry = state.dispatcher.registry();

    let mut views = Vec::with_capacity(units.len());
    for unit in units {
        views.push(UnitView {
            phase: unit.phase(),
            simulating: registry.is_running(unit.id).await,
            unit,
        });
    }
    Ok(Json(views))
}

/// List hospitals.
///
/// # Route
///
/// `GET /hospitals`
pub async fn list_hospitals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Hospital>>, ApiError> {
    Ok(Json(state.dispatcher.store().list_hospitals().await?))
}

fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::InvalidUuid(format!("{raw}: {e}")))
}
