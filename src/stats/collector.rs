//! # Latency sample collector.
//!
//! [`Statistics`] accumulates duration samples from many writers and produces
//! a [`Snapshot`] on demand. One collector lives in the master (queueing latency,
//! written by every worker) and one in each daemon context (execution time of
//! that daemon's tasks).
//!
//! ## Rules
//! - Samples are append-only; nothing is removed or decayed.
//! - `snapshot()` never mutates the sample set.
//! - The lock is held only to push or copy; sorting happens outside it.

use std::time::Duration;

use parking_lot::Mutex;

use super::Snapshot;

/// Thread-safe, append-only collection of duration samples.
#[derive(Debug, Default)]
pub struct Statistics {
    samples: Mutex<Vec<Duration>>,
}

impl Statistics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one sample.
    pub fn add(&self, sample: Duration) {
        self.samples.lock().push(sample);
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Returns true if no sample was recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Computes aggregate statistics over the current sample set.
    pub fn snapshot(&self) -> Snapshot {
        let samples = self.samples.lock().clone();
        Snapshot::from_samples(samples)
    }
}
