//! Geography and routing for the Lifeline dispatch backend.
//!
//! # Modules
//!
//! - [`geo`] -- Haversine distance used to rank candidate units
//! - [`polyline`] -- Decoder for Google encoded polylines
//! - [`google`] -- Google Routes API client
//! - [`straight_line`] -- Offline straight-line oracle
//! - [`oracle`] -- [`RoutingOracle`], the provider-agnostic entry point
//! - [`error`] -- [`RoutingError`]

pub mod error;
pub mod geo;
pub mod google;
pub mod oracle;
pub mod polyline;
pub mod straight_line;

// Re-export primary types for convenience.
pub use error::RoutingError;
pub use geo::distance_km;
pub use google::{GoogleRoutesClient, GoogleRoutesConfig};
pub use oracle::{Route, RoutingOracle};
pub use straight_line::StraightLineOracle;
