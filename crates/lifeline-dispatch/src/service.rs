//! The dispatch service.
//!
//! [`Dispatcher`] is the one entry point the HTTP layer talks to. It owns
//! the store handle, the routing oracle, the live hub and the simulation
//! registry, and strings them together:
//!
//! ```text
//! report --> Event (open) --> broadcast events
//!              |
//!              +-- emergency --> matcher::assign --> claim
//!                                                      |
//!                                                      +--> broadcast units/events
//!                                                      +--> registry.spawn(drive_unit)
//!                                                             |
//!                                                             +--> lease.release
//!                                                             +--> park_unit (idle)
//! ```

use chrono::Utc;
use lifeline_db::Store;
use lifeline_routing::RoutingOracle;
use lifeline_types::{
    Camera, CameraId, Coordinates, EntityKind, Event, EventId, Severity, Unit, UnitId,
};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::live::LiveHub;
use crate::matcher::{self, AssignOutcome};
use crate::registry::SimulationRegistry;
use crate::simulator::{self, Drive, SimulationTiming, WalkOutcome};

/// Title given to operator-triggered events.
pub const MANUAL_TRIGGER_TITLE: &str = "Manual detection triggered";

/// Descriptions picked at random for manual triggers without one.
const MANUAL_DESCRIPTIONS: &[&str] = &[
    "Person collapsed on the sidewalk",
    "Vehicle collision at the intersection",
    "Cyclist down after a fall",
    "Pedestrian struck by a vehicle",
    "Person in distress near the entrance",
];

/// An incident reported by a detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentReport {
    /// Camera ID or camera name.
    pub camera: String,
    /// Reported severity.
    pub severity: Severity,
    /// Headline.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Evidence clip.
    pub reference_clip_url: String,
}

/// Result of ingesting a report.
#[derive(Debug)]
pub struct Ingested {
    /// The event as stored after any assignment.
    pub event: Event,
    /// Assignment attempt; `None` for informational events.
    pub assignment: Option<AssignOutcome>,
}

/// Knobs for the dispatcher that do not belong to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatcherSettings {
    /// Simulator timing.
    pub timing: SimulationTiming,
    /// Maximum random offset between a camera and its events, in degrees.
    pub location_jitter_degrees: f64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            timing: SimulationTiming::default(),
            location_jitter_degrees: 0.001,
        }
    }
}

/// Dispatch coordinator. Clones share every collaborator.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Store,
    oracle: RoutingOracle,
    hub: LiveHub,
    registry: SimulationRegistry,
    settings: DispatcherSettings,
}

impl Dispatcher {
    /// Build a dispatcher over `store` and `oracle`.
    pub fn new(store: Store, oracle: RoutingOracle, settings: DispatcherSettings) -> Self {
        let hub = LiveHub::new(store.clone());
        Self {
            store,
            oracle,
            hub,
            registry: SimulationRegistry::new(),
            settings,
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// The live hub.
    pub const fn hub(&self) -> &LiveHub {
        &self.hub
    }

    /// The simulation registry.
    pub const fn registry(&self) -> &SimulationRegistry {
        &self.registry
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Ingest a detector report.
    ///
    /// Creates an `open` event near the reporting camera and broadcasts
    /// `events`. Emergencies are then dispatched; on success the unit's
    /// walk starts in the background and this call returns without
    /// waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::CameraNotFound`] if `camera` matches no
    /// camera ID or name, or [`DispatchError::Store`] on a store failure.
    pub async fn ingest(&self, report: IncidentReport) -> Result<Ingested, DispatchError> {
        let camera = self.resolve_camera(&report.camera).await?;
        self.open_event(
            &camera,
            report.severity,
            report.title,
            report.description,
            report.reference_clip_url,
        )
        .await
    }

    /// Raise an emergency from an operator on behalf of a camera.
    ///
    /// A random description is used when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::CameraNotFound`] if the camera does not
    /// exist, or [`DispatchError::Store`] on a store failure.
    pub async fn trigger_manual(
        &self,
        camera_id: CameraId,
        description: Option<String>,
        reference_clip_url: Option<String>,
    ) -> Result<Ingested, DispatchError> {
        let camera = self
            .store
            .get_camera(camera_id)
            .await?
            .ok_or_else(|| DispatchError::CameraNotFound(camera_id.to_string()))?;

        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(random_description);

        info!(%camera_id, "Manual emergency triggered");
        self.open_event(
            &camera,
            Severity::Emergency,
            MANUAL_TRIGGER_TITLE.to_owned(),
            description,
            reference_clip_url.unwrap_or_default(),
        )
        .await
    }

    async fn open_event(
        &self,
        camera: &Camera,
        severity: Severity,
        title: String,
        description: String,
        reference_clip_url: String,
    ) -> Result<Ingested, DispatchError> {
        let location = jitter(camera.location(), self.settings.location_jitter_degrees);
        let event = Event::open(
            severity,
            title,
            description,
            reference_clip_url,
            location,
            camera.id,
            Utc::now(),
        );
        self.store.insert_event(&event).await?;
        self.hub.broadcast_all(EntityKind::Events).await;
        info!(
            event_id = %event.id,
            camera_id = %camera.id,
            severity = %severity,
            title = %event.title,
            "Event created"
        );

        if severity != Severity::Emergency {
            return Ok(Ingested {
                event,
                assignment: None,
            });
        }

        let outcome = self.dispatch_event(event.id).await?;
        let event = self.store.get_event(event.id).await?.unwrap_or(event);
        Ok(Ingested {
            event,
            assignment: Some(outcome),
        })
    }

    /// Camera by UUID, falling back to name.
    async fn resolve_camera(&self, reference: &str) -> Result<Camera, DispatchError> {
        let by_id = match reference.parse::<CameraId>() {
            Ok(id) => self.store.get_camera(id).await?,
            Err(_) => None,
        };
        if let Some(camera) = by_id {
            return Ok(camera);
        }
        self.store
            .find_camera_by_name(reference)
            .await?
            .ok_or_else(|| DispatchError::CameraNotFound(reference.to_owned()))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Assign the nearest idle unit to `event_id` and start its walk.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] on a store failure, or
    /// [`DispatchError::AlreadySimulating`] if the claimed unit's walk
    /// could not be started. Every no-op outcome is `Ok`.
    pub async fn dispatch_event(&self, event_id: EventId) -> Result<AssignOutcome, DispatchError> {
        let outcome = matcher::assign(&self.store, &self.oracle, event_id).await?;

        if let AssignOutcome::Assigned(assignment) = &outcome {
            self.hub.broadcast_all(EntityKind::Units).await;
            self.hub.broadcast_all(EntityKind::Events).await;
            let unit_id = assignment.unit.id;
            match self.start_walk(unit_id).await {
                Err(DispatchError::AlreadySimulating(_)) => {
                    // The unit was idle when claimed, so whatever walk is
                    // still registered for it is left over.
                    warn!(%unit_id, "Stopping a leftover walk for a claimed unit");
                    self.registry.stop(unit_id).await;
                    self.start_walk(unit_id).await?;
                }
                other => other?,
            }
        }

        Ok(outcome)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Close an event.
    ///
    /// If its unit is still serving it, the unit's walk is cancelled and
    /// the unit is returned to idle where it stands. Resolving an already
    /// resolved event is allowed and only re-frees a unit still holding it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EventNotFound`] for an unknown event or
    /// [`DispatchError::Store`] on a store failure.
    pub async fn resolve_event(&self, event_id: EventId) -> Result<Event, DispatchError> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(DispatchError::EventNotFound(event_id))?;

        let now = Utc::now();
        let transitioned = self.store.mark_event_resolved(event_id, now).await?;

        if let Some(unit_id) = event.ambulance_id {
            let serving = self
                .store
                .get_unit(unit_id)
                .await?
                .is_some_and(|u| u.event_id == Some(event_id));
            if serving {
                self.registry.stop(unit_id).await;
                if self.store.release_unit(unit_id, event_id, now).await? {
                    info!(%event_id, %unit_id, "Unit released");
                }
                self.hub.broadcast_all(EntityKind::Units).await;
            }
        }

        self.hub.broadcast_all(EntityKind::Events).await;
        info!(%event_id, transitioned, "Event resolved");

        self.store
            .get_event(event_id)
            .await?
            .ok_or(DispatchError::EventNotFound(event_id))
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Start walking a unit along its stored path.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnitNotFound`], [`DispatchError::NoPath`],
    /// [`DispatchError::AlreadySimulating`] or [`DispatchError::Store`].
    pub async fn simulate_unit(&self, unit_id: UnitId) -> Result<Unit, DispatchError> {
        let unit = self
            .store
            .get_unit(unit_id)
            .await?
            .ok_or(DispatchError::UnitNotFound(unit_id))?;
        if self.registry.is_running(unit_id).await {
            return Err(DispatchError::AlreadySimulating(unit_id));
        }
        if unit.path.is_empty() {
            return Err(DispatchError::NoPath(unit_id));
        }
        self.start_walk(unit_id).await?;
        Ok(unit)
    }

    async fn start_walk(&self, unit_id: UnitId) -> Result<(), DispatchError> {
        let store = self.store.clone();
        let hub = self.hub.clone();
        let timing = self.settings.timing;

        self.registry
            .spawn(unit_id, move |lease| async move {
                let driven =
                    simulator::drive_unit(&store, &hub, unit_id, timing, lease.token()).await;
                let outcome = match driven {
                    // Deregister first: once parked, the unit can be claimed
                    // and needs a fresh walk.
                    Ok(Drive::Returned(unit)) => {
                        lease.release().await;
                        simulator::park_unit(&store, &hub, *unit).await
                    }
                    Ok(Drive::Stopped(outcome)) => Ok(outcome),
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(WalkOutcome::Completed) => {}
                    Ok(outcome) => info!(%unit_id, ?outcome, "Walk ended early"),
                    Err(e) => warn!(%unit_id, error = %e, "Walk aborted by store failure"),
                }
            })
            .await
    }

    /// Cancel every running walk and wait for them to stop.
    pub async fn shutdown(&self) {
        if self.registry.is_empty().await {
            return;
        }
        info!(walks = self.registry.len().await, "Stopping running walks");
        self.registry.shutdown().await;
    }
}

/// Offset `origin` by up to `degrees` on each axis.
fn jitter(origin: Coordinates, degrees: f64) -> Coordinates {
    if !degrees.is_finite() || degrees <= 0.0 {
        return origin;
    }
    let mut rng = rand::rng();
    Coordinates::new(
        origin.lat + rng.random_range(-degrees..=degrees),
        origin.lng + rng.random_range(-degrees..=degrees),
    )
}

fn random_description() -> String {
    MANUAL_DESCRIPTIONS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("Manual emergency report")
        .to_owned()
}
