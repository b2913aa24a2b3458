//! # Master lifecycle state machine.
//!
//! ```text
//! Created ──start_daemons──► Running ──stop_daemons──► Stopping ──► Stopped
//!    │
//!    └─ add_daemon allowed only here
//! ```
//!
//! Transitions are compare-and-swap on an atomic, so a second `start_daemons`
//! or `stop_daemons` is rejected with [`RuntimeError::InvalidState`] instead of
//! double-firing signals.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::RuntimeError;

/// Lifecycle state of a [`Master`](crate::Master).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepting daemon registrations; workers not started.
    Created,
    /// Workers are running.
    Running,
    /// `stop_daemons` is in progress.
    Stopping,
    /// Everything has been shut down.
    Stopped,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LifecycleState::Created,
            1 => LifecycleState::Running,
            2 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LifecycleState::Created => 0,
            LifecycleState::Running => 1,
            LifecycleState::Stopping => 2,
            LifecycleState::Stopped => 3,
        }
    }

    /// Lowercase name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic holder of the current [`LifecycleState`].
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Created.as_u8()),
        }
    }

    pub(crate) fn current(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `from → to`, or reports the state that blocked `action`.
    pub(crate) fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
        action: &'static str,
    ) -> Result<(), RuntimeError> {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| RuntimeError::InvalidState {
                action,
                state: LifecycleState::from_u8(actual),
            })
    }

    /// Fails unless the current state is `expected`.
    pub(crate) fn require(
        &self,
        expected: LifecycleState,
        action: &'static str,
    ) -> Result<(), RuntimeError> {
        let state = self.current();
        if state == expected {
            Ok(())
        } else {
            Err(RuntimeError::InvalidState { action, state })
        }
    }
}
