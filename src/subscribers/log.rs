//! # LogWriter : events rendered through `tracing`
//!
//! A subscriber that turns every [`Event`] into one `tracing` record under the
//! `daemonic::events` target. Task completions are logged at `debug` level to
//! keep the hot path quiet; failures and shutdown problems at `warn`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO daemonic::events: worker started worker=1
//! DEBUG daemonic::events: task completed daemon="prices" worker=4 latency=38µs elapsed=1.2ms
//! WARN daemonic::events: task failed daemon="prices" worker=2 reason="actor panicked: boom"
//! INFO daemonic::events: daemon stopped daemon="prices"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let daemon = e.daemon.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::WorkerStarted => {
                info!(target: "daemonic::events", worker = ?e.worker, "worker started");
            }
            EventKind::WorkerStopped => {
                info!(target: "daemonic::events", worker = ?e.worker, "worker stopped");
            }
            EventKind::DaemonAdded => {
                info!(target: "daemonic::events", daemon, "daemon added");
            }
            EventKind::DaemonFailed => {
                warn!(target: "daemonic::events", daemon, reason, "daemon failed");
            }
            EventKind::DaemonStopped => {
                info!(target: "daemonic::events", daemon, "daemon stopped");
            }
            EventKind::TaskCompleted => {
                debug!(
                    target: "daemonic::events",
                    daemon,
                    worker = ?e.worker,
                    latency = ?e.latency,
                    elapsed = ?e.elapsed,
                    "task completed"
                );
            }
            EventKind::TaskFailed => {
                warn!(
                    target: "daemonic::events",
                    daemon,
                    worker = ?e.worker,
                    reason,
                    "task failed"
                );
            }
            EventKind::ShutdownRequested => {
                info!(target: "daemonic::events", "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: "daemonic::events", "all stopped within grace");
            }
            EventKind::GraceExceeded => {
                warn!(target: "daemonic::events", reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "daemonic::events", subscriber = daemon, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "daemonic::events", subscriber = daemon, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
