//! Dispatch matcher: nearest idle unit, routed, claimed atomically.
//!
//! Selection is a linear scan by haversine distance. The only guard
//! against two dispatchers picking the same unit is the store's
//! conditional claim; the loser gets [`AssignOutcome::RaceLost`] and does
//! not retry with the next-nearest unit. A routing failure aborts before
//! anything is written.

use chrono::Utc;
use lifeline_db::{Store, UnitClaim};
use lifeline_routing::{RoutingError, RoutingOracle, distance_km};
use lifeline_types::{Coordinates, EventId, EventStatus, Unit, Waypoint};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::DispatchError;

/// A successful claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// The claimed unit as persisted after the claim.
    pub unit: Unit,
    /// Oracle ETA for the outbound leg.
    pub eta_seconds: u32,
    /// Oracle route from the unit to the incident.
    pub path: Vec<Waypoint>,
}

/// Result of one assignment attempt.
///
/// Everything except [`AssignOutcome::Assigned`] leaves the store exactly
/// as it was.
#[derive(Debug)]
pub enum AssignOutcome {
    /// A unit was claimed for the event.
    Assigned(Assignment),
    /// No event with that ID.
    EventNotFound,
    /// The event is no longer `open`.
    EventNotOpen(EventStatus),
    /// No unit is idle.
    NoCapacity,
    /// The routing oracle failed for the nearest unit.
    RoutingFailed(RoutingError),
    /// Another dispatcher claimed the unit (or the event) first.
    RaceLost,
}

impl AssignOutcome {
    /// Stable snake-case label for responses and logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Assigned(_) => "assigned",
            Self::EventNotFound => "event_not_found",
            Self::EventNotOpen(_) => "event_not_open",
            Self::NoCapacity => "no_capacity",
            Self::RoutingFailed(_) => "routing_failed",
            Self::RaceLost => "race_lost",
        }
    }

    /// The assignment, if one was made.
    pub const fn assignment(&self) -> Option<&Assignment> {
        match self {
            Self::Assigned(assignment) => Some(assignment),
            _ => None,
        }
    }
}

/// Pick the unit closest to `target`.
///
/// Strictly smaller distance wins, so among equidistant units the first in
/// `units` is chosen. Units whose distance is not finite are skipped.
pub fn nearest_unit(units: &[Unit], target: Coordinates) -> Option<&Unit> {
    let mut best: Option<(&Unit, f64)> = None;
    for unit in units {
        let distance = distance_km(unit.location(), target);
        if !distance.is_finite() {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((unit, distance)),
        }
    }
    best.map(|(unit, _)| unit)
}

/// Assign the nearest idle unit to an open event.
///
/// # Errors
///
/// Returns [`DispatchError::Store`] if a store call fails. No-op outcomes
/// are returned as `Ok`.
pub async fn assign(
    store: &Store,
    oracle: &RoutingOracle,
    event_id: EventId,
) -> Result<AssignOutcome, DispatchError> {
    let Some(event) = store.get_event(event_id).await? else {
        info!(%event_id, "Event not found, nothing to assign");
        return Ok(AssignOutcome::EventNotFound);
    };
    if event.status != EventStatus::Open {
        info!(%event_id, status = %event.status, "Event is not open, skipping assignment");
        return Ok(AssignOutcome::EventNotOpen(event.status));
    }

    let idle = store.list_idle_units().await?;
    let Some(candidate) = nearest_unit(&idle, event.location()) else {
        warn!(%event_id, "No idle units available");
        return Ok(AssignOutcome::NoCapacity);
    };

    let route = match oracle.route(candidate.location(), event.location()).await {
        Ok(route) => route,
        Err(e) => {
            warn!(
                %event_id,
                unit_id = %candidate.id,
                oracle = oracle.name(),
                error = %e,
                "Routing failed, event left open"
            );
            return Ok(AssignOutcome::RoutingFailed(e));
        }
    };

    let claim = UnitClaim {
        unit_id: candidate.id,
        event_id,
        eta_seconds: route.eta_seconds,
        path: route.path,
        at: Utc::now(),
    };
    if !store.claim_unit(&claim).await? {
        info!(%event_id, unit_id = %candidate.id, "Lost claim race");
        return Ok(AssignOutcome::RaceLost);
    }

    let unit = store
        .get_unit(claim.unit_id)
        .await?
        .ok_or(DispatchError::UnitNotFound(claim.unit_id))?;

    info!(
        %event_id,
        unit_id = %unit.id,
        eta_seconds = claim.eta_seconds,
        waypoints = claim.path.len(),
        "Unit assigned"
    );

    Ok(AssignOutcome::Assigned(Assignment {
        unit,
        eta_seconds: claim.eta_seconds,
        path: claim.path,
    }))
}
