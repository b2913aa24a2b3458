//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the master runtime.
//!
//! ## Sentinel values
//! - `grace = 0s` → wait forever during shutdown
//! - `workers`, `queue_capacity`, `bus_capacity` → clamped to a minimum of 1

use std::time::Duration;

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 10;

/// Global configuration for the master runtime.
///
/// ## Field semantics
/// - `workers`: number of worker loops started by `start_daemons` (min 1)
/// - `queue_capacity`: task channel capacity (min 1; `1` approximates a hand-off)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `grace`: upper bound for each shutdown wait (`0s` = no bound)
///
/// All fields are public; prefer the accessors to avoid sprinkling sentinel
/// checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of worker loops.
    pub workers: usize,

    /// Capacity of the shared task queue.
    ///
    /// Producers wait in `send` while the queue is full.
    pub queue_capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// The event listener skips older items when it lags more than this.
    pub bus_capacity: usize,

    /// Maximum time `stop_daemons` waits for one daemon's startup task to
    /// finish, and for the worker pool to exit.
    ///
    /// When exceeded, the stuck units are aborted and `stop_daemons` returns
    /// `RuntimeError::GraceExceeded` after completing the remaining steps.
    pub grace: Duration,
}

impl Config {
    /// Worker pool size, at least 1.
    #[inline]
    pub fn workers_clamped(&self) -> usize {
        self.workers.max(1)
    }

    /// Task queue capacity, at least 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Bus capacity, at least 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Shutdown grace as an `Option`.
    ///
    /// - `None` → wait forever
    /// - `Some(d)` → bound each shutdown wait by `d`
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 10`
    /// - `queue_capacity = 1` (hand-off)
    /// - `bus_capacity = 1024`
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: 1,
            bus_capacity: 1024,
            grace: Duration::from_secs(60),
        }
    }
}
