//! Routing oracle abstraction.
//!
//! Uses an enum instead of a trait object because async methods are not
//! dyn-compatible. The dispatch matcher only sees [`RoutingOracle::route`]
//! and never cares which provider is behind it.

use lifeline_types::{Coordinates, Waypoint};

use crate::error::RoutingError;
use crate::google::GoogleRoutesClient;
use crate::straight_line::StraightLineOracle;

/// A computed route: an ETA and the waypoints that realise it.
///
/// Always complete. Providers return an error rather than half a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Estimated driving time in seconds.
    pub eta_seconds: u32,
    /// Waypoints from just after the origin up to the destination.
    pub path: Vec<Waypoint>,
}

/// A provider of driving routes between two coordinates.
#[derive(Debug, Clone)]
pub enum RoutingOracle {
    /// Google Routes API.
    Google(GoogleRoutesClient),
    /// Offline straight-line interpolation.
    StraightLine(StraightLineOracle),
}

impl RoutingOracle {
    /// Compute a route from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the provider fails in any way. No
    /// retry is attempted.
    pub async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Route, RoutingError> {
        match self {
            Self::Google(client) => client.route(origin, destination).await,
            Self::StraightLine(oracle) => Ok(oracle.route(origin, destination)),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Google(_) => "google-routes",
            Self::StraightLine(_) => "straight-line",
        }
    }
}
