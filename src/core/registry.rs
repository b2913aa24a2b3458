//! # Daemon registry.
//!
//! Ordered list of registered daemons. A [`DaemonId`] is the index of the
//! daemon in this list, which makes task → daemon routing a bounds-checked
//! lookup instead of a reference held by the task.
//!
//! ## Rules
//! - Insertion order is the shutdown and report order.
//! - Entries are never removed; a stopped daemon keeps its statistics.
//! - Each entry owns the join handle of its daemon's startup task.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::daemons::{Daemon, DaemonContext, DaemonId};

/// One registered daemon.
pub(crate) struct Entry {
    pub(crate) daemon: Arc<dyn Daemon>,
    pub(crate) ctx: DaemonContext,
    startup: Mutex<Option<JoinHandle<()>>>,
}

impl Entry {
    pub(crate) fn set_startup(&self, handle: JoinHandle<()>) {
        *self.startup.lock() = Some(handle);
    }

    /// Takes the startup join handle; `None` if it was already taken.
    pub(crate) fn take_startup(&self) -> Option<JoinHandle<()>> {
        self.startup.lock().take()
    }
}

/// Ordered registry of daemons.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<Vec<Arc<Entry>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a daemon; `make_ctx` receives the id assigned to it.
    pub(crate) fn register(
        &self,
        daemon: Arc<dyn Daemon>,
        make_ctx: impl FnOnce(DaemonId, Arc<str>) -> DaemonContext,
    ) -> Arc<Entry> {
        let mut entries = self.entries.write();
        let id = DaemonId::new(entries.len());
        let name: Arc<str> = Arc::from(daemon.name());
        let entry = Arc::new(Entry {
            ctx: make_ctx(id, name),
            daemon,
            startup: Mutex::new(None),
        });
        entries.push(Arc::clone(&entry));
        entry
    }

    /// Looks up a daemon by handle.
    pub(crate) fn get(&self, id: DaemonId) -> Option<Arc<Entry>> {
        self.entries.read().get(id.index()).cloned()
    }

    /// All entries, in registration order.
    pub(crate) fn entries(&self) -> Vec<Arc<Entry>> {
        self.entries.read().clone()
    }

    /// Daemon names, in registration order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.ctx.name().to_string())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
