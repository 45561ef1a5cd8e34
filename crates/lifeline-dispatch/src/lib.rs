//! Dispatch core for the Lifeline emergency-dispatch backend.
//!
//! Matches incoming emergencies to the nearest idle ambulance, walks the
//! ambulance along its route in the background, and fans every state
//! change out to live observers.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`matcher`] -- Nearest-unit selection and the atomic claim
//! - [`simulator`] -- Step-by-step unit motion along a route
//! - [`registry`] -- One supervised simulation per unit
//! - [`live`] -- Full-snapshot broadcast to observers
//! - [`fleet`] -- Provisioning of cameras, hospitals and ambulances
//! - [`service`] -- [`Dispatcher`], the entry point for the HTTP layer
//! - [`error`] -- [`DispatchError`]

pub mod config;
pub mod error;
pub mod fleet;
pub mod live;
pub mod matcher;
pub mod registry;
pub mod service;
pub mod simulator;

// Re-export primary types for convenience.
pub use config::{ConfigError, LifelineConfig};
pub use error::DispatchError;
pub use fleet::{ProvisionReport, provision};
pub use live::LiveHub;
pub use matcher::{AssignOutcome, Assignment};
pub use registry::{SimulationRegistry, WalkLease};
pub use service::{Dispatcher, DispatcherSettings, IncidentReport, Ingested};
pub use simulator::{Drive, SimulationTiming, WalkOutcome};
