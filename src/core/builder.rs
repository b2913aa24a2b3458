use std::sync::Arc;

use crate::{
    core::{Config, Master},
    subscribers::Subscribe,
    transport::{Publisher, SubscribeFn},
};

/// Builder for constructing a [`Master`] with optional collaborators.
pub struct MasterBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    subscribe_fn: Option<SubscribeFn>,
    publisher: Option<Arc<dyn Publisher>>,
}

impl MasterBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            subscribe_fn: None,
            publisher: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers start receiving events when `start_daemons` is called;
    /// events published earlier are buffered on the bus.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the subscribe function injected into every daemon.
    pub fn with_subscribe_fn(mut self, subscribe_fn: SubscribeFn) -> Self {
        self.subscribe_fn = Some(subscribe_fn);
        self
    }

    /// Sets the publisher injected into every daemon.
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Builds the master. Allocation only: nothing is spawned until
    /// `add_daemon` / `start_daemons`.
    pub fn build(self) -> Master {
        Master::new_internal(self.cfg, self.subscribers, self.subscribe_fn, self.publisher)
    }
}
