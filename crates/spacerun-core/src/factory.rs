//! Object factory interface.
//!
//! The session hands every spawn decision to an [`ObjectFactory`] together
//! with the configured spawn point. What the factory builds (entities in an
//! engine, sprites, nothing at all) is its own concern; it returns nothing
//! and its failures never reach the session.

use std::sync::{Arc, Mutex, PoisonError};

use spacerun_types::{SpawnDecision, SpawnPoint};

/// Instantiates obstacles and rewards.
///
/// Called with the session locked; implementations must not call back into
/// the session.
pub trait ObjectFactory: Send {
    /// Create the entity for `decision` at `point`.
    fn spawn(&mut self, decision: SpawnDecision, point: SpawnPoint);
}

/// Factory that only records what it was asked to spawn.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    spawned: Arc<Mutex<Vec<SpawnDecision>>>,
}

impl RecordingFactory {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every decision received so far, in order.
    pub fn spawned(&self) -> Vec<SpawnDecision> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of decisions received so far.
    pub fn count(&self) -> usize {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ObjectFactory for RecordingFactory {
    fn spawn(&mut self, decision: SpawnDecision, _point: SpawnPoint) {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(decision);
    }
}
