//! # Injected daemon state.
//!
//! [`DaemonContext`] is what the master hands to a daemon on registration:
//!
//! | Field        | Owner        | Purpose                                          |
//! |--------------|--------------|--------------------------------------------------|
//! | `id`, `name` | daemon       | identity in logs, events and task routing        |
//! | `queue`      | master       | shared task queue (producer handle only)         |
//! | `shutdown`   | daemon       | private cancellation token, fired once by master |
//! | `stats`      | daemon       | execution time of this daemon's tasks            |
//! | `subscribe`  | master       | optional [`SubscribeFn`] collaborator            |
//! | `publisher`  | master       | optional shared [`Publisher`] collaborator       |
//!
//! The context is cheap to clone; clones share everything.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::TaskSender;
use crate::daemons::DaemonId;
use crate::error::{RuntimeError, TransportError};
use crate::stats::Statistics;
use crate::tasks::{Actor, Task};
use crate::transport::{Publisher, Streamer, SubscribeFn};

struct Inner {
    id: DaemonId,
    name: Arc<str>,
    queue: TaskSender,
    shutdown: CancellationToken,
    stats: Arc<Statistics>,
    subscribe: Option<SubscribeFn>,
    publisher: Option<Arc<dyn Publisher>>,
}

/// Shared state the master injects into a daemon.
#[derive(Clone)]
pub struct DaemonContext {
    inner: Arc<Inner>,
}

impl DaemonContext {
    pub(crate) fn new(
        id: DaemonId,
        name: Arc<str>,
        queue: TaskSender,
        subscribe: Option<SubscribeFn>,
        publisher: Option<Arc<dyn Publisher>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                name,
                queue,
                shutdown: CancellationToken::new(),
                stats: Arc::new(Statistics::new()),
                subscribe,
                publisher,
            }),
        }
    }

    /// Handle of this daemon in the master's registry.
    pub fn id(&self) -> DaemonId {
        self.inner.id
    }

    /// Daemon name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.inner.name)
    }

    /// Execution-time statistics of this daemon's tasks.
    pub fn stats(&self) -> &Arc<Statistics> {
        &self.inner.stats
    }

    /// Private shutdown token of this daemon.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Returns true once the master asked this daemon to stop.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Resolves when the master asks this daemon to stop.
    pub async fn shutdown_requested(&self) {
        self.inner.shutdown.cancelled().await
    }

    pub(crate) fn request_shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Enqueues `actor` as a task owned by this daemon.
    ///
    /// Waits while the queue is full; fails with [`RuntimeError::QueueClosed`]
    /// once the master closed the queue.
    pub async fn process(&self, actor: Actor) -> Result<(), RuntimeError> {
        self.inner.queue.send(Task::new(self.inner.id, actor)).await
    }

    /// Enqueues a prebuilt task.
    pub async fn enqueue(&self, task: Task) -> Result<(), RuntimeError> {
        self.inner.queue.send(task).await
    }

    /// Producer handle of the shared queue.
    pub fn queue(&self) -> &TaskSender {
        &self.inner.queue
    }

    /// Subscribes to `topic` as a member of `group`.
    pub fn subscribe(&self, group: &str, topic: &str) -> Result<Box<dyn Streamer>, TransportError> {
        match &self.inner.subscribe {
            Some(f) => f(group, topic),
            None => Err(TransportError::NotConfigured {
                what: "subscribe function",
            }),
        }
    }

    /// Shared publisher injected by the master.
    pub fn publisher(&self) -> Result<&Arc<dyn Publisher>, TransportError> {
        self.inner
            .publisher
            .as_ref()
            .ok_or(TransportError::NotConfigured { what: "publisher" })
    }
}

impl fmt::Debug for DaemonContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonContext")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
