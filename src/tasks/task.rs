//! # Task: one queued unit of work.
//!
//! A [`Task`] bundles an [`Actor`] with routing metadata:
//! - `daemon`: handle of the owning daemon (stats and failure routing only);
//! - `created_at`: monotonic creation instant, used for queueing latency;
//! - `system`: marks coordinator-internal tasks (not used for scheduling).
//!
//! Tasks are immutable once built: they move into the queue, then into exactly
//! one worker, and are consumed by execution.

use std::time::{Duration, Instant};

use crate::daemons::DaemonId;
use crate::tasks::Actor;

/// Immutable unit of work travelling through the shared queue.
#[derive(Debug)]
pub struct Task {
    actor: Actor,
    daemon: Option<DaemonId>,
    created_at: Instant,
    system: bool,
}

impl Task {
    /// Creates a daemon-issued task.
    pub fn new(daemon: DaemonId, actor: Actor) -> Self {
        Self {
            actor,
            daemon: Some(daemon),
            created_at: Instant::now(),
            system: false,
        }
    }

    /// Creates a coordinator-internal task that belongs to no daemon.
    ///
    /// Its queueing latency is recorded in the system collector only.
    pub fn system(actor: Actor) -> Self {
        Self {
            actor,
            daemon: None,
            created_at: Instant::now(),
            system: true,
        }
    }

    /// Handle of the owning daemon, if any.
    pub fn daemon(&self) -> Option<DaemonId> {
        self.daemon
    }

    /// Instant the task was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns true for coordinator-internal tasks.
    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Time elapsed since creation (never negative).
    pub fn waited(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub(crate) fn into_actor(self) -> Actor {
        self.actor
    }
}
