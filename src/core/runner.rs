//! # Execute one dequeued task.
//!
//! ```text
//! Success:
//!   actor.invoke() → Ok(())  → daemon stats += elapsed → publish TaskCompleted
//!
//! Failure (panic or explicit error):
//!   actor.invoke() → Err(e)  → log with daemon identity → publish TaskFailed
//! ```
//!
//! ## Rules
//! - Failures never escape: the worker continues with the next task.
//! - No retry, no re-queue.
//! - A failed task adds **nothing** to the daemon's execution-time statistics;
//!   only its queueing latency (recorded by the worker before execution) counts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::error;

use crate::core::registry::Registry;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::Task;

/// How a single execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed,
    Failed,
}

/// Runs `task` on worker `worker`, routing stats and failures to its daemon.
pub(crate) async fn run_task(
    task: Task,
    worker: usize,
    latency: Duration,
    registry: &Registry,
    bus: &Bus,
) -> Outcome {
    let entry = task.daemon().and_then(|id| registry.get(id));
    let daemon: Option<Arc<str>> = entry.as_ref().map(|e| e.ctx.name_arc());
    let system = task.is_system();

    let started = Instant::now();
    let res = task.into_actor().invoke().await;
    let elapsed = started.elapsed();

    let (outcome, mut ev) = match res {
        Ok(()) => {
            if let Some(e) = &entry {
                e.ctx.stats().add(elapsed);
            }
            (
                Outcome::Completed,
                Event::new(EventKind::TaskCompleted).with_elapsed(elapsed),
            )
        }
        Err(err) => {
            error!(
                daemon = daemon.as_deref().unwrap_or("-"),
                worker,
                system,
                label = err.as_label(),
                error = %err,
                "task failed"
            );
            (
                Outcome::Failed,
                Event::new(EventKind::TaskFailed).with_reason(err.to_string()),
            )
        }
    };

    ev = ev.with_worker(worker).with_latency(latency);
    if let Some(name) = daemon {
        ev = ev.with_daemon(name);
    }
    bus.publish(ev);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue;
    use crate::daemons::{Daemon, DaemonContext, DaemonId};
    use crate::error::{DaemonError, TaskError};
    use crate::tasks::Actor;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Daemon for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        async fn startup(&self, _ctx: DaemonContext) -> Result<(), DaemonError> {
            Ok(())
        }
    }

    fn registry_with_one() -> (Registry, DaemonContext) {
        let reg = Registry::new();
        let (tx, _rx) = queue::channel(1);
        let entry = reg.register(Arc::new(Noop), |id, name| {
            DaemonContext::new(id, name, tx, None, None)
        });
        let ctx = entry.ctx.clone();
        (reg, ctx)
    }

    #[tokio::test]
    async fn success_records_daemon_duration() {
        let (reg, ctx) = registry_with_one();
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let task = Task::new(ctx.id(), Actor::new(|| {}));
        let outcome = run_task(task, 1, Duration::from_micros(5), &reg, &bus).await;

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(ctx.stats().len(), 1);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskCompleted);
        assert_eq!(ev.daemon.as_deref(), Some("noop"));
        assert_eq!(ev.worker, Some(1));
        assert_eq!(ev.latency, Some(Duration::from_micros(5)));
        assert!(ev.elapsed.is_some());
    }

    #[tokio::test]
    async fn failure_records_nothing_and_is_published() {
        let (reg, ctx) = registry_with_one();
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let panicking = Task::new(ctx.id(), Actor::new(|| panic!("boom")));
        let failing = Task::new(
            ctx.id(),
            Actor::try_from_future(async { Err(TaskError::fail("nope")) }),
        );
        assert_eq!(run_task(panicking, 2, Duration::ZERO, &reg, &bus).await, Outcome::Failed);
        assert_eq!(run_task(failing, 2, Duration::ZERO, &reg, &bus).await, Outcome::Failed);

        assert!(ctx.stats().is_empty());
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskFailed);
        assert_eq!(ev.reason.as_deref(), Some("actor panicked: boom"));
    }

    #[tokio::test]
    async fn unknown_daemon_still_runs() {
        let (reg, _ctx) = registry_with_one();
        let bus = Bus::new(8);
        let task = Task::new(DaemonId::new(42), Actor::new(|| {}));
        assert_eq!(
            run_task(task, 1, Duration::ZERO, &reg, &bus).await,
            Outcome::Completed
        );
        let system = Task::system(Actor::new(|| {}));
        assert_eq!(
            run_task(system, 1, Duration::ZERO, &reg, &bus).await,
            Outcome::Completed
        );
    }
}
