//! # Subscriber extension point.
//!
//! Implement [`Subscribe`] to observe the master's runtime events, e.g. to
//! count failed tasks per daemon or to ship worker lifecycle to a dashboard.
//!
//! The master attaches subscribers through
//! [`MasterBuilder::with_subscribers`](crate::MasterBuilder::with_subscribers).
//! A subscriber owns a bounded queue sized by [`Subscribe::queue_capacity`] and
//! a worker of its own; a panic in `on_event` is reported as
//! `EventKind::SubscriberPanicked` and the worker moves on.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use daemonic::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct FailedTasks(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for FailedTasks {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskFailed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failed-tasks" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// `on_event` runs on the subscriber's own worker, so a slow subscriber only
/// delays itself. Events beyond its queue capacity are dropped for it alone.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Calls arrive in publication order.
    async fn on_event(&self, event: &Event);

    /// Name used when reporting overflow or panics of this subscriber.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this subscriber (values below 1 are raised to 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
