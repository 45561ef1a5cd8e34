//! API server for the Lifeline dispatch backend.
//!
//! This crate exposes the [`Dispatcher`](lifeline_dispatch::Dispatcher)
//! over HTTP:
//!
//! - **Ingestion** (`POST /process_event`) for detector reports, plus an
//!   operator trigger per camera
//! - **Actions** to resolve events and to replay an ambulance's route
//! - **Collections** (`GET /cameras`, `/events`, `/ambulances`,
//!   `/hospitals`) for the map dashboard
//! - **Live channel** (`/ws/live`) pushing full snapshots after every
//!   state change
//!
//! Handlers are thin: they parse IDs and bodies, call the dispatcher and
//! map [`DispatchError`](lifeline_dispatch::DispatchError) onto HTTP
//! statuses through [`ApiError`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
