//! Registry of running unit simulations.
//!
//! At most one walk per unit. Each entry carries a [`CancellationToken`]
//! and the task's [`JoinHandle`]; a finished task removes its own entry.
//! Entries are tagged with a generation so a task that finishes late never
//! removes the entry of a newer walk for the same unit.
//!
//! A walk may leave the registry before its task ends through
//! [`WalkLease::release`], which lets it deregister before the unit it
//! drives becomes claimable again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use lifeline_types::UnitId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DispatchError;

#[derive(Debug)]
struct Entry {
    generation: u64,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_generation: u64,
    running: HashMap<UnitId, Entry>,
}

/// Handed to each walk: its cancellation token and its registry slot.
#[derive(Debug)]
pub struct WalkLease {
    registry: SimulationRegistry,
    unit_id: UnitId,
    generation: u64,
    token: CancellationToken,
}

impl WalkLease {
    /// Fires when the walk is cancelled.
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Leave the registry now instead of when the task ends.
    ///
    /// No-op if the entry was already cancelled or replaced.
    pub async fn release(self) {
        self.registry.finish(self.unit_id, self.generation).await;
    }
}

/// Supervises background simulations. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct SimulationRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl SimulationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `walk` for `unit_id` unless one is already running.
    ///
    /// `walk` receives a [`WalkLease`] whose token
    /// [`SimulationRegistry::cancel`] fires.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadySimulating`] if the unit already has
    /// a live walk.
    pub async fn spawn<F, Fut>(&self, unit_id: UnitId, walk: F) -> Result<(), DispatchError>
    where
        F: FnOnce(WalkLease) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock().await;
        // A finished handle still registered means the walk panicked
        // before it could deregister.
        let stale = match inner.running.get(&unit_id) {
            Some(entry) if entry.handle.as_ref().is_some_and(JoinHandle::is_finished) => true,
            Some(_) => return Err(DispatchError::AlreadySimulating(unit_id)),
            None => false,
        };
        if stale {
            warn!(%unit_id, "Replacing a walk that ended without deregistering");
        }

        let generation = inner.next_generation;
        inner.next_generation = inner.next_generation.wrapping_add(1);
        let token = CancellationToken::new();

        let job = walk(WalkLease {
            registry: self.clone(),
            unit_id,
            generation,
            token: token.clone(),
        });
        let registry = self.clone();
        // The task cannot deregister before the entry exists: it needs the
        // lock we are holding.
        let handle = tokio::spawn(async move {
            job.await;
            registry.finish(unit_id, generation).await;
        });

        inner.running.insert(
            unit_id,
            Entry {
                generation,
                token,
                handle: Some(handle),
            },
        );
        debug!(%unit_id, generation, "Simulation registered");
        Ok(())
    }

    /// Cancel the walk for `unit_id`, if any.
    ///
    /// Returns the task handle so the caller can wait for the walk to
    /// stop before touching the unit.
    pub async fn cancel(&self, unit_id: UnitId) -> Option<JoinHandle<()>> {
        let entry = self.inner.lock().await.running.remove(&unit_id)?;
        entry.token.cancel();
        debug!(%unit_id, generation = entry.generation, "Simulation cancelled");
        entry.handle
    }

    /// Cancel the walk for `unit_id` and wait for it to stop.
    pub async fn stop(&self, unit_id: UnitId) -> bool {
        match self.cancel(unit_id).await {
            Some(handle) => {
                // A panicked walk is already stopped.
                let _ = handle.await;
                true
            }
            None => false,
        }
    }

    /// Whether `unit_id` has a live walk.
    pub async fn is_running(&self, unit_id: UnitId) -> bool {
        self.inner.lock().await.running.contains_key(&unit_id)
    }

    /// Number of live walks.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.running.len()
    }

    /// Whether no walk is live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cancel every walk and wait for all of them to stop.
    pub async fn shutdown(&self) {
        let entries: Vec<Entry> = self.inner.lock().await.running.drain().map(|(_, e)| e).collect();
        for entry in &entries {
            entry.token.cancel();
        }
        for entry in entries {
            if let Some(handle) = entry.handle {
                let _ = handle.await;
            }
        }
    }

    async fn finish(&self, unit_id: UnitId, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner
            .running
            .get(&unit_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            inner.running.remove(&unit_id);
            debug!(%unit_id, generation, "Simulation finished");
        }
    }
}
