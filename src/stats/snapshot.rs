//! # Aggregate statistics reports.
//!
//! Percentiles use the nearest-rank method over the sorted sample set.
//!
//! ## Output format
//! ```text
//! samples=8 min=12µs mean=48µs max=210µs
//! p50=31µs p90=160µs p95=210µs p99=210µs
//! ```

use std::fmt;
use std::time::Duration;

/// Descriptive statistics computed from a set of duration samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Number of samples.
    pub count: usize,
    /// Smallest sample.
    pub min: Duration,
    /// Largest sample.
    pub max: Duration,
    /// Arithmetic mean.
    pub mean: Duration,
    /// Median.
    pub p50: Duration,
    /// 90th percentile.
    pub p90: Duration,
    /// 95th percentile.
    pub p95: Duration,
    /// 99th percentile.
    pub p99: Duration,
}

impl Snapshot {
    /// Computes a snapshot from an owned sample set (sorted in place).
    pub fn from_samples(mut samples: Vec<Duration>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();

        let count = samples.len();
        let total: u128 = samples.iter().map(Duration::as_nanos).sum();
        let mean_nanos = total / count as u128;
        let mean = Duration::from_nanos(mean_nanos.min(u128::from(u64::MAX)) as u64);

        Self {
            count,
            min: samples[0],
            max: samples[count - 1],
            mean,
            p50: percentile(&samples, 50),
            p90: percentile(&samples, 90),
            p95: percentile(&samples, 95),
            p99: percentile(&samples, 99),
        }
    }

    /// Returns true if the snapshot was computed from no samples.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    let rank = (pct * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "samples=0");
        }
        writeln!(
            f,
            "samples={} min={:?} mean={:?} max={:?}",
            self.count, self.min, self.mean, self.max
        )?;
        write!(
            f,
            "p50={:?} p90={:?} p95={:?} p99={:?}",
            self.p50, self.p90, self.p95, self.p99
        )
    }
}

/// Statistics gathered by `Master::stop_daemons`.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    /// Per-daemon execution-time snapshots, in registration order.
    ///
    /// Each one is taken right after that daemon's `shutdown` hook returns,
    /// while workers are still live. Tasks of the daemon that finish later
    /// (including ones enqueued by the hook itself) are missing here; read
    /// `Master::daemon_stats(id)` after `stop_daemons` for the settled count.
    pub daemons: Vec<(String, Snapshot)>,
    /// System-wide queueing latency snapshot.
    pub latency: Snapshot,
}

impl ShutdownReport {
    /// Returns the snapshot of the first daemon registered under `name`.
    pub fn daemon(&self, name: &str) -> Option<&Snapshot> {
        self.daemons
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, snap)| snap)
    }
}
