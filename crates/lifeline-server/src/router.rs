//! Axum router construction for the dispatch API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS enabled for the map dashboard.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// - `GET /` -- welcome message
/// - `POST /process_event` -- detector ingestion
/// - `GET /cameras`, `POST /cameras/{id}/trigger_emergency`
/// - `GET /events?status=`, `POST /events/{id}/resolve`
/// - `GET /ambulances`, `POST /ambulances/{id}/simulate`
/// - `GET /hospitals`
/// - `GET /ws/live`, `GET /ws/live/clients`
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        // Ingestion
        .route("/process_event", post(handlers::process_event))
        // Cameras
        .route("/cameras", get(handlers::list_cameras))
        .route(
            "/cameras/{id}/trigger_emergency",
            post(handlers::trigger_emergency),
        )
        // Events
        .route("/events", get(handlers::list_events))
        .route("/events/{id}/resolve", post(handlers::resolve_event))
        // Ambulances
        .route("/ambulances", get(handlers::list_ambulances))
        .route("/ambulances/{id}/simulate", post(handlers::simulate_ambulance))
        // Hospitals
        .route("/hospitals", get(handlers::list_hospitals))
        // Live channel
        .route("/ws/live", get(ws::ws_live))
        .route("/ws/live/clients", get(ws::live_clients))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
