//! Latency statistics.
//!
//! - [`Statistics`] thread-safe sample accumulator
//! - [`Snapshot`] aggregate report over the samples recorded so far
//! - [`ShutdownReport`] per-daemon and system snapshots produced by `stop_daemons`

mod collector;
mod snapshot;

pub use collector::Statistics;
pub use snapshot::{ShutdownReport, Snapshot};
