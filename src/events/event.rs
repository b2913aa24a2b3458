//! # Runtime events emitted by the master, workers and subscriber workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker events**: pool lifecycle (started, stopped)
//! - **Daemon events**: registration, hook failures, stop
//! - **Task events**: per-task completion or failure
//! - **Shutdown events**: shutdown requested, finished, grace exceeded
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use daemonic::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_daemon("prices")
//!     .with_worker(3)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.daemon.as_deref(), Some("prices"));
//! assert_eq!(ev.worker, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `daemon` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `daemon` (subscriber name), `reason` ("full" or "closed").
    SubscriberOverflow,

    // === Worker pool ===
    /// Worker loop started. Sets: `worker` (1-based).
    WorkerStarted,

    /// Worker loop exited. Sets: `worker` (1-based).
    WorkerStopped,

    // === Daemon lifecycle ===
    /// Daemon registered and its startup hook launched. Sets: `daemon`.
    DaemonAdded,

    /// A daemon hook returned an error or panicked. Sets: `daemon`, `reason`.
    DaemonFailed,

    /// Daemon shut down; its statistics were reported. Sets: `daemon`.
    DaemonStopped,

    // === Tasks ===
    /// Task executed successfully.
    ///
    /// Sets: `daemon` (if any), `worker`, `latency` (queue wait), `elapsed` (execution).
    TaskCompleted,

    /// Task panicked or returned an error.
    ///
    /// Sets: `daemon` (if any), `worker`, `latency`, `reason`.
    TaskFailed,

    // === Shutdown ===
    /// `stop_daemons` began.
    ShutdownRequested,

    /// Every daemon and worker stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; stuck units were aborted. Sets: `reason`.
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Daemon (or subscriber) name, if applicable.
    pub daemon: Option<Arc<str>>,
    /// Worker number (1-based), if applicable.
    pub worker: Option<usize>,
    /// Time the task spent queued.
    pub latency: Option<Duration>,
    /// Time the actor took to run.
    pub elapsed: Option<Duration>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            daemon: None,
            worker: None,
            latency: None,
            elapsed: None,
            reason: None,
        }
    }

    /// Attaches a daemon name.
    #[inline]
    pub fn with_daemon(mut self, daemon: impl Into<Arc<str>>) -> Self {
        self.daemon = Some(daemon.into());
        self
    }

    /// Attaches a worker number.
    #[inline]
    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches the queueing latency.
    #[inline]
    pub fn with_latency(mut self, d: Duration) -> Self {
        self.latency = Some(d);
        self
    }

    /// Attaches the execution time.
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_daemon(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_daemon(subscriber)
            .with_reason(info)
    }
}
