//! # Master: owns daemons, the task queue and the worker pool.
//!
//! ## High-level architecture
//! ```text
//! add_daemon(d):
//!   Registry.register(d) ──► DaemonContext { id, queue, token, stats, transports }
//!        └──► spawn d.startup(ctx)                         (fire-and-forget)
//!
//! start_daemons():
//!   Created ─► Running
//!   spawn event listener: Bus ─► SubscriberSet::emit
//!   spawn N × Worker::run(runtime_token)
//!
//!   Daemon ── ctx.process(actor) ──► [task queue] ──► Worker k ──► run_task()
//!                                                       │             │
//!                                         latency stats ┘   daemon stats
//!
//! stop_daemons():
//!   Running ─► Stopping
//!   for each daemon (registration order):
//!       cancel daemon token ─► d.shutdown(&ctx) ─► join startup (≤ grace) ─► log stats
//!   cancel runtime_token ─► join workers (≤ grace) ─► close queue ─► log latency
//!   Stopping ─► Stopped
//! ```
//!
//! Daemons stop before workers, so tasks enqueued while a daemon shuts down are
//! still executed.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use daemonic::{Actor, Daemon, DaemonContext, DaemonError, Master};
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Daemon for Greeter {
//!     fn name(&self) -> &str { "greeter" }
//!
//!     async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
//!         ctx.process(Actor::new(|| println!("hello"))).await?;
//!         ctx.shutdown_requested().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let master = Master::summon();
//!     master.add_daemon(Greeter)?;
//!     master.start_daemons()?;
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     let report = master.stop_daemons().await?;
//!     assert_eq!(report.daemons.len(), 1);
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::{
    Config, LifecycleState, MasterBuilder,
    lifecycle::Lifecycle,
    queue::{self, TaskReceiver, TaskSender},
    registry::{Entry, Registry},
    worker::{Worker, WorkerPool},
};
use crate::daemons::{Daemon, DaemonContext, DaemonId};
use crate::error::{RuntimeError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::stats::{ShutdownReport, Statistics};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::transport::{Publisher, SubscribeFn};

/// Coordinates daemons, the shared task queue and the worker pool.
pub struct Master {
    cfg: Config,
    bus: Bus,
    lifecycle: Lifecycle,
    registry: Arc<Registry>,
    sender: TaskSender,
    receiver: TaskReceiver,
    /// System-wide shutdown signal observed by the workers.
    runtime_token: CancellationToken,
    /// Queueing latency of every executed task.
    latency: Arc<Statistics>,
    workers: Mutex<Option<WorkerPool>>,
    active_workers: Arc<AtomicUsize>,
    subscribe_fn: Option<SubscribeFn>,
    publisher: Option<Arc<dyn Publisher>>,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    /// Bus receiver taken by the event listener; `None` without subscribers.
    events: Mutex<Option<broadcast::Receiver<Event>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    listener_token: CancellationToken,
}

impl Master {
    /// Creates a master with the default configuration and no collaborators.
    pub fn summon() -> Self {
        Self::builder(Config::default()).build()
    }

    /// Returns a builder for a master with custom configuration and collaborators.
    pub fn builder(cfg: Config) -> MasterBuilder {
        MasterBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        subscribers: Vec<Arc<dyn Subscribe>>,
        subscribe_fn: Option<SubscribeFn>,
        publisher: Option<Arc<dyn Publisher>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let (sender, receiver) = queue::channel(cfg.queue_capacity_clamped());
        let events = (!subscribers.is_empty()).then(|| bus.subscribe());

        Self {
            cfg,
            bus,
            lifecycle: Lifecycle::new(),
            registry: Arc::new(Registry::new()),
            sender,
            receiver,
            runtime_token: CancellationToken::new(),
            latency: Arc::new(Statistics::new()),
            workers: Mutex::new(None),
            active_workers: Arc::new(AtomicUsize::new(0)),
            subscribe_fn,
            publisher,
            subscribers: Mutex::new(subscribers),
            events: Mutex::new(events),
            listener: Mutex::new(None),
            listener_token: CancellationToken::new(),
        }
    }

    /// Registers a daemon and launches its `startup` hook concurrently.
    ///
    /// Allowed only before [`start_daemons`](Self::start_daemons). Outside a
    /// Tokio runtime it fails with [`RuntimeError::NoAsyncRuntime`].
    pub fn add_daemon<D: Daemon>(&self, daemon: D) -> Result<DaemonId, RuntimeError> {
        self.add_daemon_arc(Arc::new(daemon))
    }

    /// Same as [`add_daemon`](Self::add_daemon) for an already shared daemon.
    pub fn add_daemon_arc(&self, daemon: Arc<dyn Daemon>) -> Result<DaemonId, RuntimeError> {
        self.lifecycle.require(LifecycleState::Created, "add daemon")?;
        let runtime = current_runtime("add daemon")?;

        let entry = self.registry.register(daemon, |id, name| {
            DaemonContext::new(
                id,
                name,
                self.sender.clone(),
                self.subscribe_fn.clone(),
                self.publisher.clone(),
            )
        });
        let id = entry.ctx.id();
        info!(daemon = entry.ctx.name(), id = %id, "daemon added");
        self.bus.daemon(EventKind::DaemonAdded, entry.ctx.name_arc());

        let handle = spawn_startup(&runtime, Arc::clone(&entry), self.bus.clone());
        entry.set_startup(handle);
        Ok(id)
    }

    /// Starts the worker pool and the event listener. Returns immediately.
    pub fn start_daemons(&self) -> Result<(), RuntimeError> {
        current_runtime("start daemons")?;
        self.lifecycle.transition(
            LifecycleState::Created,
            LifecycleState::Running,
            "start daemons",
        )?;
        self.spawn_event_listener();

        let mut pool = WorkerPool::new(Arc::clone(&self.active_workers));
        for number in 1..=self.cfg.workers_clamped() {
            let worker = Worker::new(
                number,
                self.receiver.clone(),
                Arc::clone(&self.registry),
                Arc::clone(&self.latency),
                self.bus.clone(),
            );
            pool.spawn(worker, self.runtime_token.clone());
        }
        *self.workers.lock() = Some(pool);
        info!(
            workers = self.cfg.workers_clamped(),
            daemons = self.registry.len(),
            "daemons started"
        );
        Ok(())
    }

    /// Stops every daemon in registration order, then the worker pool.
    ///
    /// Returns the per-daemon and system statistics that were logged. If a
    /// daemon's startup task or a worker outlives the grace period it is
    /// aborted, shutdown still completes, and
    /// [`RuntimeError::GraceExceeded`] is returned.
    pub async fn stop_daemons(&self) -> Result<ShutdownReport, RuntimeError> {
        self.lifecycle.transition(
            LifecycleState::Running,
            LifecycleState::Stopping,
            "stop daemons",
        )?;
        info!("stopping daemons");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        let grace = self.cfg.grace_limit();
        let mut stuck = Vec::new();
        let mut report = ShutdownReport::default();

        for entry in self.registry.entries() {
            let name = entry.ctx.name().to_string();
            if !self.stop_daemon(&entry, grace).await {
                stuck.push(name.clone());
            }

            let snapshot = entry.ctx.stats().snapshot();
            info!(daemon = %name, "{name} daemon performance statistics:\n{snapshot}");
            self.bus.daemon(EventKind::DaemonStopped, entry.ctx.name_arc());
            report.daemons.push((name, snapshot));
        }

        self.runtime_token.cancel();
        let pool = self.workers.lock().take();
        if let Some(pool) = pool {
            stuck.extend(pool.join(grace).await);
        }

        let dropped = self.receiver.close().await;
        if dropped > 0 {
            warn!(dropped, "tasks dropped unexecuted when closing the queue");
        }

        report.latency = self.latency.snapshot();
        info!("task processing latency statistics:\n{}", report.latency);

        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
        } else {
            self.bus.publish(
                Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")),
            );
        }

        self.lifecycle.transition(
            LifecycleState::Stopping,
            LifecycleState::Stopped,
            "finish stopping",
        )?;
        self.finish_event_listener().await;

        if stuck.is_empty() {
            Ok(report)
        } else {
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.current()
    }

    /// Configuration this master was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Names of registered daemons, in registration order.
    pub fn daemons(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Execution-time statistics of one daemon.
    pub fn daemon_stats(&self, id: DaemonId) -> Option<Arc<Statistics>> {
        self.registry.get(id).map(|e| Arc::clone(e.ctx.stats()))
    }

    /// System-wide queueing latency statistics.
    pub fn latency(&self) -> &Arc<Statistics> {
        &self.latency
    }

    /// Number of worker loops currently running.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    /// Producer handle of the shared queue, for coordinator-internal tasks.
    pub fn queue(&self) -> TaskSender {
        self.sender.clone()
    }

    /// Fires the daemon token, runs its shutdown hook and joins its startup task.
    ///
    /// Returns `false` if the startup task had to be aborted.
    async fn stop_daemon(&self, entry: &Entry, grace: Option<Duration>) -> bool {
        let name = entry.ctx.name();
        entry.ctx.request_shutdown();

        let hook = AssertUnwindSafe(entry.daemon.shutdown(&entry.ctx))
            .catch_unwind()
            .await;
        let failure = match hook {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("shutdown panicked: {}", panic_message(payload))),
        };
        if let Some(reason) = failure {
            error!(daemon = name, reason = %reason, "daemon shutdown failed");
            self.bus.daemon_failed(entry.ctx.name_arc(), reason);
        }

        let Some(mut handle) = entry.take_startup() else {
            return true;
        };
        let joined = match grace {
            None => (&mut handle).await,
            Some(g) => match tokio::time::timeout(g, &mut handle).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(daemon = name, grace = ?g, "daemon startup did not finish in time; aborting");
                    handle.abort();
                    return false;
                }
            },
        };
        if let Err(je) = joined {
            error!(daemon = name, error = %je, "daemon startup task terminated abnormally");
        }
        true
    }

    fn spawn_event_listener(&self) {
        let Some(rx) = self.events.lock().take() else {
            return;
        };
        let subs = std::mem::take(&mut *self.subscribers.lock());
        let set = SubscriberSet::new(subs, self.bus.clone());
        let handle = tokio::spawn(event_listener(rx, set, self.listener_token.clone()));
        *self.listener.lock() = Some(handle);
    }

    async fn finish_event_listener(&self) {
        self.listener_token.cancel();
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for Master {
    fn drop(&mut self) {
        // Abandoned without stop_daemons: let spawned loops wind down.
        for entry in self.registry.entries() {
            entry.ctx.request_shutdown();
        }
        self.runtime_token.cancel();
        self.listener_token.cancel();
    }
}

/// Runs `startup` on its own task, reporting errors and panics.
fn spawn_startup(runtime: &Handle, entry: Arc<Entry>, bus: Bus) -> JoinHandle<()> {
    runtime.spawn(async move {
        let ctx = entry.ctx.clone();
        let res = AssertUnwindSafe(entry.daemon.startup(ctx))
            .catch_unwind()
            .await;
        let reason = match res {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("startup panicked: {}", panic_message(payload)),
        };
        error!(daemon = entry.ctx.name(), reason = %reason, "daemon startup failed");
        bus.daemon_failed(entry.ctx.name_arc(), reason);
    })
}

/// Handle of the ambient Tokio runtime, or an error naming `action`.
fn current_runtime(action: &'static str) -> Result<Handle, RuntimeError> {
    Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime { action })
}

/// Forwards bus events to subscribers until `token` fires, then flushes.
async fn event_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => set.emit(ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            },
            _ = token.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => set.emit(ev),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    set.shutdown().await;
}
