//! Offline routing oracle that drives in a straight line.
//!
//! Used when no Routes API key is configured (local development, demos,
//! tests). The path is `waypoints` evenly spaced points ending exactly at
//! the destination, and the ETA assumes a constant average speed.

use lifeline_types::{Coordinates, Waypoint};

use crate::error::RoutingError;
use crate::geo;
use crate::oracle::Route;

/// Default number of generated waypoints.
pub const DEFAULT_WAYPOINTS: u32 = 10;

/// Default average speed of an ambulance in city traffic.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Straight-line routing oracle.
#[derive(Debug, Clone)]
pub struct StraightLineOracle {
    waypoints: u32,
    speed_kmh: f64,
}

impl StraightLineOracle {
    /// Create an oracle producing `waypoints` points per route at `speed_kmh`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Config`] if `waypoints` is zero or the speed
    /// is not a positive finite number.
    pub fn new(waypoints: u32, speed_kmh: f64) -> Result<Self, RoutingError> {
        if waypoints == 0 {
            return Err(RoutingError::Config(
                "straight-line waypoint count must be at least 1".to_owned(),
            ));
        }
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            return Err(RoutingError::Config(format!(
                "straight-line speed must be positive, got {speed_kmh}"
            )));
        }
        Ok(Self {
            waypoints,
            speed_kmh,
        })
    }

    /// Interpolate a route from `origin` to `destination`.
    pub fn route(&self, origin: Coordinates, destination: Coordinates) -> Route {
        let steps = f64::from(self.waypoints);
        let path: Vec<Waypoint> = (1..=self.waypoints)
            .map(|i| geo::lerp(origin, destination, f64::from(i) / steps))
            .collect();

        let hours = geo::distance_km(origin, destination) / self.speed_kmh;
        let eta_seconds = seconds_from_hours(hours);

        Route { eta_seconds, path }
    }
}

impl Default for StraightLineOracle {
    fn default() -> Self {
        Self {
            waypoints: DEFAULT_WAYPOINTS,
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

/// Convert a duration in hours to whole seconds, saturating at `u32::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds_from_hours(hours: f64) -> u32 {
    // Clamped to the u32 range first, so the cast is exact after rounding.
    (hours * 3600.0).round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn path_ends_at_destination() {
        let oracle = StraightLineOracle::new(5, 40.0).unwrap();
        let origin = Coordinates::new(40.0, -79.0);
        let dest = Coordinates::new(40.01, -79.0);

        let route = oracle.route(origin, dest);

        assert_eq!(route.path.len(), 5);
        let last = route.path[4];
        assert!((last.lat - dest.lat).abs() < 1e-12);
        assert!((last.lng - dest.lng).abs() < 1e-12);
        assert!(route.path[0].lat > origin.lat);
    }

    #[test]
    fn eta_matches_speed() {
        // ~1.112 km at 40 km/h is about 100 seconds.
        let oracle = StraightLineOracle::new(5, 40.0).unwrap();
        let route = oracle.route(Coordinates::new(40.0, -79.0), Coordinates::new(40.01, -79.0));
        assert!((95..=105).contains(&route.eta_seconds), "got {}", route.eta_seconds);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(StraightLineOracle::new(0, 40.0).is_err());
        assert!(StraightLineOracle::new(3, 0.0).is_err());
        assert!(StraightLineOracle::new(3, f64::NAN).is_err());
    }
}
