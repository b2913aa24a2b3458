//! # Runtime event bus.
//!
//! Every runtime event (worker lifecycle, daemon lifecycle, task outcomes,
//! shutdown progress) goes through one [`Bus`]. The master's event listener
//! is its only long-lived receiver and forwards to the `SubscriberSet`.
//!
//! ```text
//!   Workers  ─ worker(kind, n) ─┐
//!   Master   ─ daemon(kind, d) ─┼──► Bus ──► event listener ──► SubscriberSet
//!   Startups ─ daemon_failed ───┘
//! ```
//!
//! Publishing never waits: events are dropped when nobody listens, and a
//! receiver that falls more than `capacity` events behind sees
//! `RecvError::Lagged` and skips the oldest ones.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::events::{Event, EventKind};

/// Broadcast channel carrying runtime events. Clones share the channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus buffering up to `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a prebuilt event.
    pub fn publish(&self, ev: Event) {
        // No receivers is not an error: events are fire-and-forget.
        let _ = self.tx.send(ev);
    }

    /// Publishes a lifecycle event of daemon `name`.
    pub fn daemon(&self, kind: EventKind, name: Arc<str>) {
        self.publish(Event::new(kind).with_daemon(name));
    }

    /// Publishes `DaemonFailed` for daemon `name` with the failure text.
    pub fn daemon_failed(&self, name: Arc<str>, reason: impl Into<Arc<str>>) {
        self.publish(
            Event::new(EventKind::DaemonFailed)
                .with_daemon(name)
                .with_reason(reason),
        );
    }

    /// Publishes a lifecycle event of worker number `worker`.
    pub fn worker(&self, kind: EventKind, worker: usize) {
        self.publish(Event::new(kind).with_worker(worker));
    }

    /// Opens a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
