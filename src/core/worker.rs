//! # Worker pool.
//!
//! A fixed number of worker loops share the task queue:
//!
//! ```text
//! loop {
//!   ├─► queue.next(token)      (sleeps until a task is ready or the token fires)
//!   │       ├─ Some(task) ─► latency = now − created_at ─► system stats
//!   │       │                └─► run_task() (panic-isolated)
//!   │       └─ None       ─► exit
//! }
//! ```
//!
//! ## Rules
//! - Dequeue order is the queue order; which worker gets a task is a race.
//! - Queueing latency is recorded before execution, so failed tasks count too.
//! - The active-worker gauge drops only when a loop actually exits.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::queue::TaskReceiver;
use crate::core::registry::Registry;
use crate::core::runner::{Outcome, run_task};
use crate::events::{Bus, EventKind};
use crate::stats::Statistics;

/// Keeps the active-worker gauge accurate even if a loop unwinds.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(gauge: Arc<AtomicUsize>) -> Self {
        gauge.fetch_add(1, Ordering::AcqRel);
        Self(gauge)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One worker loop.
pub(crate) struct Worker {
    /// 1-based worker number, used in logs and events.
    number: usize,
    queue: TaskReceiver,
    registry: Arc<Registry>,
    latency: Arc<Statistics>,
    bus: Bus,
}

impl Worker {
    pub(crate) fn new(
        number: usize,
        queue: TaskReceiver,
        registry: Arc<Registry>,
        latency: Arc<Statistics>,
        bus: Bus,
    ) -> Self {
        Self {
            number,
            queue,
            registry,
            latency,
            bus,
        }
    }

    /// Drains the queue until `token` fires and nothing is left; returns the worker number.
    async fn run(self, token: CancellationToken, _active: ActiveGuard) -> usize {
        info!(worker = self.number, "starting worker");
        self.bus.worker(EventKind::WorkerStarted, self.number);

        let (mut completed, mut failed) = (0u64, 0u64);
        while let Some(task) = self.queue.next(&token).await {
            let latency = task.waited();
            self.latency.add(latency);

            match run_task(task, self.number, latency, &self.registry, &self.bus).await {
                Outcome::Completed => completed += 1,
                Outcome::Failed => failed += 1,
            }
        }

        info!(worker = self.number, completed, failed, "worker has stopped");
        self.bus.worker(EventKind::WorkerStopped, self.number);
        self.number
    }
}

/// Join set of worker loops plus the numbers still running.
pub(crate) struct WorkerPool {
    set: JoinSet<usize>,
    running: BTreeSet<usize>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub(crate) fn new(active: Arc<AtomicUsize>) -> Self {
        Self {
            set: JoinSet::new(),
            running: BTreeSet::new(),
            active,
        }
    }

    /// Spawns `worker` on the current runtime.
    pub(crate) fn spawn(&mut self, worker: Worker, token: CancellationToken) {
        self.running.insert(worker.number);
        let guard = ActiveGuard::new(Arc::clone(&self.active));
        self.set.spawn(worker.run(token, guard));
    }

    /// Waits for every loop to exit, up to `grace`.
    ///
    /// Loops still running after `grace` are aborted and returned as `worker #N`.
    pub(crate) async fn join(mut self, grace: Option<Duration>) -> Vec<String> {
        let drain = async {
            while let Some(res) = self.set.join_next().await {
                match res {
                    Ok(number) => {
                        self.running.remove(&number);
                    }
                    Err(je) => error!(error = %je, "worker loop terminated abnormally"),
                }
            }
        };

        match grace {
            None => drain.await,
            Some(g) => {
                if tokio::time::timeout(g, drain).await.is_err() {
                    warn!(grace = ?g, stuck = self.running.len(), "workers did not stop in time; aborting");
                    self.set.abort_all();
                    while self.set.join_next().await.is_some() {}
                }
            }
        }

        self.running
            .iter()
            .map(|n| format!("worker #{n}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue;
    use crate::tasks::{Actor, Task};

    fn pool_with(
        workers: usize,
    ) -> (
        WorkerPool,
        crate::core::TaskSender,
        Arc<Statistics>,
        Arc<AtomicUsize>,
        CancellationToken,
    ) {
        let (tx, rx) = queue::channel(4);
        let registry = Arc::new(Registry::new());
        let latency = Arc::new(Statistics::new());
        let active = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let bus = Bus::new(64);

        let mut pool = WorkerPool::new(Arc::clone(&active));
        for n in 1..=workers {
            let w = Worker::new(
                n,
                rx.clone(),
                Arc::clone(&registry),
                Arc::clone(&latency),
                bus.clone(),
            );
            pool.spawn(w, token.clone());
        }
        (pool, tx, latency, active, token)
    }

    #[tokio::test]
    async fn drains_queue_then_exits() {
        let (pool, tx, latency, active, token) = pool_with(3);
        assert_eq!(active.load(Ordering::Acquire), 3);

        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let done = Arc::clone(&done);
            tx.send(Task::system(Actor::new(move || {
                done.fetch_add(1, Ordering::SeqCst);
            })))
            .await
            .unwrap();
        }

        token.cancel();
        let stuck = pool.join(Some(Duration::from_secs(5))).await;
        assert!(stuck.is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 20);
        assert_eq!(latency.len(), 20);
        assert_eq!(active.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn panicking_task_keeps_worker_alive() {
        let (pool, tx, latency, active, token) = pool_with(1);

        tx.send(Task::system(Actor::new(|| panic!("first")))).await.unwrap();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        tx.send(Task::system(Actor::new(move || {
            let _ = done_tx.send(());
        })))
        .await
        .unwrap();

        done_rx.await.unwrap();
        assert_eq!(active.load(Ordering::Acquire), 1);
        assert_eq!(latency.len(), 2);

        token.cancel();
        assert!(pool.join(None).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_worker_is_aborted_after_grace() {
        let (pool, tx, _latency, active, token) = pool_with(1);
        tx.send(Task::system(Actor::from_future(std::future::pending())))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        token.cancel();
        let stuck = pool.join(Some(Duration::from_millis(100))).await;
        assert_eq!(stuck, vec!["worker #1".to_string()]);
        assert_eq!(active.load(Ordering::Acquire), 0);
    }
}
