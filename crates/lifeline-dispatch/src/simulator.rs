//! Unit motion simulator.
//!
//! Walks one unit along its stored path, one waypoint per step, then (if
//! it was serving an event) waits on scene, resolves the event, and drives
//! the same path back in reverse. Every step persists the unit and
//! broadcasts the `ambulances` collection.
//!
//! The final release is split out into [`park_unit`] so a supervisor can
//! drop its bookkeeping for the walk before the unit becomes claimable.
//!
//! A walk stops early when its [`CancellationToken`] fires (checked at
//! every sleep) or when a store write fails, leaving the last persisted
//! state in place.

use std::time::Duration;

use chrono::Utc;
use lifeline_db::{DbError, Store};
use lifeline_types::{EntityKind, Leg, Unit, UnitId, UnitStatus, Waypoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::live::LiveHub;

/// Step and on-scene timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTiming {
    /// Time between waypoints.
    pub step_interval: Duration,
    /// Time on scene before the event is resolved.
    pub settle_delay: Duration,
}

impl Default for SimulationTiming {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(5),
        }
    }
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Out and back; the unit is idle again.
    Completed,
    /// The token fired part-way.
    Cancelled,
    /// The unit had no path.
    NothingToWalk,
    /// The unit does not exist.
    UnitMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Cancelled,
}

/// Where a drive stopped.
#[derive(Debug)]
pub enum Drive {
    /// Both legs are done. The unit sits at its base, still enroute, until
    /// [`park_unit`] puts it back in service.
    Returned(Box<Unit>),
    /// The walk ended before the return leg finished.
    Stopped(WalkOutcome),
}

/// Drive `unit_id` out along its path and back, without parking it.
///
/// The caller finishes a [`Drive::Returned`] with [`park_unit`] once it
/// has stopped tracking the walk, so nothing can claim the unit while the
/// walk is still registered.
///
/// # Errors
///
/// Returns [`DbError`] if a store call fails; the walk stops there.
pub async fn drive_unit(
    store: &Store,
    hub: &LiveHub,
    unit_id: UnitId,
    timing: SimulationTiming,
    cancel: &CancellationToken,
) -> Result<Drive, DbError> {
    let Some(mut unit) = store.get_unit(unit_id).await? else {
        return Ok(Drive::Stopped(WalkOutcome::UnitMissing));
    };
    if unit.path.is_empty() {
        return Ok(Drive::Stopped(WalkOutcome::NothingToWalk));
    }

    let outbound = unit.path.clone();
    info!(%unit_id, waypoints = outbound.len(), "Unit departing");

    let walker = Walker {
        store,
        hub,
        timing,
        cancel,
    };

    if walker.walk_leg(&mut unit, outbound.clone(), Leg::Outbound).await? == Flow::Cancelled {
        return Ok(Drive::Stopped(WalkOutcome::Cancelled));
    }

    if let Some(event_id) = unit.event_id {
        if walker.pause(timing.settle_delay).await == Flow::Cancelled {
            return Ok(Drive::Stopped(WalkOutcome::Cancelled));
        }
        if store.mark_event_resolved(event_id, Utc::now()).await? {
            info!(%unit_id, %event_id, "Event resolved on scene");
            hub.broadcast_all(EntityKind::Events).await;
        }
    }

    let mut inbound = outbound;
    inbound.reverse();
    if walker.walk_leg(&mut unit, inbound, Leg::Return).await? == Flow::Cancelled {
        return Ok(Drive::Stopped(WalkOutcome::Cancelled));
    }

    Ok(Drive::Returned(Box::new(unit)))
}

/// Put a returned unit back in service and broadcast it.
///
/// # Errors
///
/// Returns [`DbError`] if the save fails.
pub async fn park_unit(
    store: &Store,
    hub: &LiveHub,
    mut unit: Unit,
) -> Result<WalkOutcome, DbError> {
    unit.release(Utc::now());
    store.save_unit(&unit).await?;
    hub.broadcast_all(EntityKind::Units).await;
    info!(unit_id = %unit.id, "Unit back in service");
    Ok(WalkOutcome::Completed)
}

struct Walker<'a> {
    store: &'a Store,
    hub: &'a LiveHub,
    timing: SimulationTiming,
    cancel: &'a CancellationToken,
}

impl Walker<'_> {
    /// Pop waypoints off `path` until it is empty, persisting each step.
    async fn walk_leg(
        &self,
        unit: &mut Unit,
        path: Vec<Waypoint>,
        leg: Leg,
    ) -> Result<Flow, DbError> {
        unit.path = path;
        while !unit.path.is_empty() {
            let next = unit.path.remove(0);
            unit.set_location(next);
            unit.status = UnitStatus::Enroute;
            unit.leg = Some(leg);
            unit.eta_seconds = Some(eta_for(unit.path.len(), self.timing.step_interval));
            unit.updated_at = Utc::now();

            self.store.save_unit(unit).await?;
            self.hub.broadcast_all(EntityKind::Units).await;
            debug!(
                unit_id = %unit.id,
                leg = %leg,
                lat = next.lat,
                lng = next.lng,
                remaining = unit.path.len(),
                "Unit moved"
            );

            if self.pause(self.timing.step_interval).await == Flow::Cancelled {
                return Ok(Flow::Cancelled);
            }
        }
        Ok(Flow::Continue)
    }

    async fn pause(&self, duration: Duration) -> Flow {
        tokio::select! {
            () = self.cancel.cancelled() => Flow::Cancelled,
            () = tokio::time::sleep(duration) => Flow::Continue,
        }
    }
}

/// Seconds left on a leg with `remaining` waypoints to go.
fn eta_for(remaining: usize, step: Duration) -> u32 {
    let steps = u32::try_from(remaining).unwrap_or(u32::MAX);
    u32::try_from(step.saturating_mul(steps).as_secs()).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use lifeline_db::UnitClaim;
    use lifeline_types::{CameraId, Coordinates, Event, EventStatus, Severity};

    use super::*;

    async fn walk_unit(
        store: &Store,
        hub: &LiveHub,
        unit_id: UnitId,
        timing: SimulationTiming,
        cancel: &CancellationToken,
    ) -> Result<WalkOutcome, DbError> {
        match drive_unit(store, hub, unit_id, timing, cancel).await? {
            Drive::Returned(unit) => park_unit(store, hub, *unit).await,
            Drive::Stopped(outcome) => Ok(outcome),
        }
    }

    fn path() -> Vec<Waypoint> {
        (1..=3)
            .map(|i| Coordinates::new(40.0 + f64::from(i) * 0.001, -79.0))
            .collect()
    }

    async fn dispatched_unit(store: &Store) -> (Unit, Event) {
        let unit = Unit::idle_at(Coordinates::new(40.0, -79.0), Utc::now());
        store.insert_unit(&unit).await.unwrap();
        let event = Event::open(
            Severity::Emergency,
            "Collision".to_owned(),
            String::new(),
            String::new(),
            Coordinates::new(40.003, -79.0),
            CameraId::new(),
            Utc::now(),
        );
        store.insert_event(&event).await.unwrap();
        let claim = UnitClaim {
            unit_id: unit.id,
            event_id: event.id,
            eta_seconds: 120,
            path: path(),
            at: Utc::now(),
        };
        assert!(store.claim_unit(&claim).await.unwrap());
        (store.get_unit(unit.id).await.unwrap().unwrap(), event)
    }

    #[test]
    fn eta_counts_remaining_steps() {
        assert_eq!(eta_for(0, Duration::from_secs(1)), 0);
        assert_eq!(eta_for(4, Duration::from_secs(1)), 4);
        assert_eq!(eta_for(4, Duration::from_millis(500)), 2);
        assert_eq!(eta_for(3, Duration::from_millis(500)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn walks_out_resolves_and_returns() {
        let store = Store::memory();
        let hub = LiveHub::new(store.clone());
        let (unit, event) = dispatched_unit(&store).await;
        let mut rx = hub.subscribe();

        let outcome = walk_unit(
            &store,
            &hub,
            unit.id,
            SimulationTiming::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, WalkOutcome::Completed);

        // Every message is a full snapshot; collect the unit's trajectory.
        let mut unit_frames = Vec::new();
        let mut event_frames = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            match msg.kind {
                EntityKind::Units => {
                    let units: Vec<Unit> = serde_json::from_value(msg.data).unwrap();
                    unit_frames.push(units[0].clone());
                }
                EntityKind::Events => {
                    let events: Vec<Event> = serde_json::from_value(msg.data).unwrap();
                    event_frames.push(events[0].clone());
                }
                EntityKind::Cameras => {}
            }
        }

        // 3 outbound + 3 return + final idle.
        assert_eq!(unit_frames.len(), 7);
        let etas: Vec<Option<u32>> = unit_frames[..3].iter().map(|u| u.eta_seconds).collect();
        assert_eq!(etas, vec![Some(2), Some(1), Some(0)]);
        assert!(unit_frames[..3].iter().all(|u| u.leg == Some(Leg::Outbound)));
        assert!(unit_frames[3..6].iter().all(|u| u.leg == Some(Leg::Return)));
        assert_eq!(unit_frames[2].location(), path()[2]);
        assert_eq!(unit_frames[5].location(), path()[0]);

        let last = unit_frames.last().unwrap();
        assert!(last.is_idle());
        assert!(last.path.is_empty());
        assert_eq!(last.event_id, None);
        assert_eq!(last.eta_seconds, None);

        assert_eq!(event_frames.len(), 1);
        assert_eq!(event_frames[0].status, EventStatus::Resolved);

        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Resolved);
        assert!(stored.resolved_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_precedes_resolution() {
        let store = Store::memory();
        let hub = LiveHub::new(store.clone());
        let (unit, event) = dispatched_unit(&store).await;

        let timing = SimulationTiming::default();
        let task = {
            let store = store.clone();
            let hub = hub.clone();
            tokio::spawn(async move {
                walk_unit(&store, &hub, unit.id, timing, &CancellationToken::new()).await
            })
        };

        // Three outbound steps take 3s; the event is still enroute at 3s + 4s.
        tokio::time::sleep(Duration::from_millis(7_000)).await;
        let mid = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(mid.status, EventStatus::Enroute);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let after = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(after.status, EventStatus::Resolved);

        assert_eq!(task.await.unwrap().unwrap(), WalkOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_walk_in_place() {
        let store = Store::memory();
        let hub = LiveHub::new(store.clone());
        let (unit, event) = dispatched_unit(&store).await;
        let token = CancellationToken::new();

        let task = {
            let store = store.clone();
            let hub = hub.clone();
            let token = token.clone();
            tokio::spawn(async move {
                walk_unit(&store, &hub, unit.id, SimulationTiming::default(), &token).await
            })
        };

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        token.cancel();
        assert_eq!(task.await.unwrap().unwrap(), WalkOutcome::Cancelled);

        let stored = store.get_unit(unit.id).await.unwrap().unwrap();
        assert_eq!(stored.status, UnitStatus::Enroute);
        assert_eq!(stored.event_id, Some(event.id));
        assert_eq!(stored.location(), path()[1]);
        assert_eq!(stored.path.len(), 1);
    }

    #[tokio::test]
    async fn empty_path_is_a_no_op() {
        let store = Store::memory();
        let hub = LiveHub::new(store.clone());
        let unit = Unit::idle_at(Coordinates::new(40.0, -79.0), Utc::now());
        store.insert_unit(&unit).await.unwrap();

        let outcome = walk_unit(
            &store,
            &hub,
            unit.id,
            SimulationTiming::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, WalkOutcome::NothingToWalk);

        let missing = walk_unit(
            &store,
            &hub,
            UnitId::new(),
            SimulationTiming::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(missing, WalkOutcome::UnitMissing);
    }
}
