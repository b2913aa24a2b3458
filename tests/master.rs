//! End-to-end scenarios driving the public `Master` API with test daemons.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use daemonic::{
    Actor, Config, Daemon, DaemonContext, DaemonError, Event, EventKind, LifecycleState, Master,
    MemoryBroker, Publisher, RuntimeError, Subscribe, Task, TaskError,
};
use futures::StreamExt;
use parking_lot::Mutex;

/// Polls `cond` until it holds or five seconds pass.
async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Enqueues `count` counting tasks, then idles until asked to stop.
struct Burst {
    name: &'static str,
    count: usize,
    done: Arc<AtomicUsize>,
}

impl Burst {
    fn new(name: &'static str, count: usize) -> Self {
        Self {
            name,
            count,
            done: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Daemon for Burst {
    fn name(&self) -> &str {
        self.name
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        for _ in 0..self.count {
            let done = Arc::clone(&self.done);
            ctx.process(Actor::new(move || {
                done.fetch_add(1, Ordering::SeqCst);
            }))
            .await?;
        }
        ctx.shutdown_requested().await;
        Ok(())
    }
}

/// Enqueues tasks that always panic or fail.
struct AlwaysFailing {
    count: usize,
}

#[async_trait]
impl Daemon for AlwaysFailing {
    fn name(&self) -> &str {
        "always_failing"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        for i in 0..self.count {
            let actor = if i % 2 == 0 {
                Actor::new(move || panic!("task {i} exploded"))
            } else {
                Actor::try_from_future(async move { Err(TaskError::fail(format!("task {i}"))) })
            };
            ctx.process(actor).await?;
        }
        ctx.shutdown_requested().await;
        Ok(())
    }
}

/// Records the order in which shutdown hooks run.
struct Ordered {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Daemon for Ordered {
    fn name(&self) -> &str {
        self.name
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        ctx.shutdown_requested().await;
        Ok(())
    }

    async fn shutdown(&self, _ctx: &DaemonContext) -> Result<(), DaemonError> {
        self.log.lock().push(self.name.to_string());
        Ok(())
    }
}

/// Keeps its context so the test can use it after shutdown.
struct Keeper {
    ctx: Arc<Mutex<Option<DaemonContext>>>,
}

#[async_trait]
impl Daemon for Keeper {
    fn name(&self) -> &str {
        "keeper"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        *self.ctx.lock() = Some(ctx.clone());
        ctx.shutdown_requested().await;
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Event>>,
}

impl Recorder {
    fn count(&self, kind: EventKind) -> usize {
        self.seen.lock().iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.seen.lock().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn statistics_are_routed_per_daemon() {
    let master = Master::summon();
    let d1 = Burst::new("d1", 5);
    let d2 = Burst::new("d2", 3);
    let (done1, done2) = (Arc::clone(&d1.done), Arc::clone(&d2.done));

    let id1 = master.add_daemon(d1).unwrap();
    let id2 = master.add_daemon(d2).unwrap();
    master.start_daemons().unwrap();

    let (s1, s2) = (
        master.daemon_stats(id1).unwrap(),
        master.daemon_stats(id2).unwrap(),
    );
    wait_until(|| s1.len() == 5 && s2.len() == 3).await;
    assert_eq!(done1.load(Ordering::SeqCst), 5);
    assert_eq!(done2.load(Ordering::SeqCst), 3);

    let report = master.stop_daemons().await.unwrap();
    assert_eq!(report.latency.count, 8);
    assert_eq!(report.daemon("d1").map(|s| s.count), Some(5));
    assert_eq!(report.daemon("d2").map(|s| s.count), Some(3));
    assert_eq!(master.latency().len(), 8);
}

#[tokio::test]
async fn failing_tasks_never_kill_workers() {
    let master = Master::summon();
    let id = master.add_daemon(AlwaysFailing { count: 10 }).unwrap();
    master.start_daemons().unwrap();
    assert_eq!(master.active_workers(), 10);

    let latency = Arc::clone(master.latency());
    wait_until(|| latency.len() == 10).await;
    // Give the last tasks time to unwind before sampling the gauge.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(master.active_workers(), 10);

    let report = master.stop_daemons().await.unwrap();
    assert_eq!(report.latency.count, 10);
    assert!(master.daemon_stats(id).unwrap().is_empty());
    assert_eq!(report.daemon("always_failing").map(|s| s.count), Some(0));
    assert_eq!(master.active_workers(), 0);
}

#[tokio::test]
async fn daemons_stop_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let master = Master::summon();
    for name in ["first", "second", "third"] {
        master
            .add_daemon(Ordered {
                name,
                log: Arc::clone(&log),
            })
            .unwrap();
    }
    assert_eq!(master.daemons(), vec!["first", "second", "third"]);

    master.start_daemons().unwrap();
    let report = master.stop_daemons().await.unwrap();

    assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    let names: Vec<_> = report.daemons.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert_eq!(master.state(), LifecycleState::Stopped);
}

/// Fans out to several concurrent producers sharing one context.
struct Flood {
    producers: usize,
    per_producer: usize,
    done: Arc<AtomicUsize>,
}

#[async_trait]
impl Daemon for Flood {
    fn name(&self) -> &str {
        "flood"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        let mut producers = tokio::task::JoinSet::new();
        for _ in 0..self.producers {
            let ctx = ctx.clone();
            let done = Arc::clone(&self.done);
            let n = self.per_producer;
            producers.spawn(async move {
                for _ in 0..n {
                    let done = Arc::clone(&done);
                    ctx.process(Actor::from_future(async move {
                        tokio::task::yield_now().await;
                        done.fetch_add(1, Ordering::SeqCst);
                    }))
                    .await?;
                }
                Ok::<_, RuntimeError>(())
            });
        }
        while let Some(res) = producers.join_next().await {
            res.map_err(DaemonError::fail)??;
        }
        ctx.shutdown_requested().await;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_run_each_task_once() {
    let done = Arc::new(AtomicUsize::new(0));
    let master = Master::summon();
    let id = master
        .add_daemon(Flood {
            producers: 8,
            per_producer: 250,
            done: Arc::clone(&done),
        })
        .unwrap();
    master.start_daemons().unwrap();

    let stats = master.daemon_stats(id).unwrap();
    wait_until(|| stats.len() == 2000).await;

    master.stop_daemons().await.unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 2000);
    assert_eq!(master.latency().len(), 2000);
}

#[tokio::test]
async fn lifecycle_misuse_is_rejected() {
    let master = Master::summon();

    let err = master.stop_daemons().await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InvalidState {
            state: LifecycleState::Created,
            ..
        }
    ));

    master.start_daemons().unwrap();
    assert!(matches!(
        master.start_daemons(),
        Err(RuntimeError::InvalidState {
            state: LifecycleState::Running,
            ..
        })
    ));
    assert!(matches!(
        master.add_daemon(Burst::new("late", 1)),
        Err(RuntimeError::InvalidState { .. })
    ));

    master.stop_daemons().await.unwrap();
    assert!(matches!(
        master.stop_daemons().await,
        Err(RuntimeError::InvalidState {
            state: LifecycleState::Stopped,
            ..
        })
    ));
}

#[tokio::test]
async fn enqueue_after_stop_fails() {
    let slot = Arc::new(Mutex::new(None));
    let master = Master::summon();
    master
        .add_daemon(Keeper {
            ctx: Arc::clone(&slot),
        })
        .unwrap();
    master.start_daemons().unwrap();
    wait_until(|| slot.lock().is_some()).await;

    master.stop_daemons().await.unwrap();

    let ctx = slot.lock().clone().unwrap();
    assert!(ctx.is_shutting_down());
    assert!(matches!(
        ctx.process(Actor::new(|| {})).await,
        Err(RuntimeError::QueueClosed)
    ));
    assert!(master.queue().is_closed());
    assert!(matches!(
        master.queue().send(Task::system(Actor::new(|| {}))).await,
        Err(RuntimeError::QueueClosed)
    ));
}

#[tokio::test]
async fn system_tasks_count_only_toward_latency() {
    let master = Master::summon();
    master.start_daemons().unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        let ran = Arc::clone(&ran);
        master
            .queue()
            .send(Task::system(Actor::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })))
            .await
            .unwrap();
    }

    let report = master.stop_daemons().await.unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 4);
    assert_eq!(report.latency.count, 4);
    assert!(report.daemons.is_empty());
}

/// Startup returns immediately with an error.
struct BrokenStartup;

#[async_trait]
impl Daemon for BrokenStartup {
    fn name(&self) -> &str {
        "broken"
    }

    async fn startup(&self, _ctx: DaemonContext) -> Result<(), DaemonError> {
        Err(DaemonError::fail("cannot connect"))
    }
}

#[tokio::test]
async fn subscribers_observe_the_whole_run() {
    let rec = Arc::new(Recorder::default());
    let cfg = Config {
        workers: 2,
        ..Config::default()
    };
    let master = Master::builder(cfg)
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();

    master.add_daemon(Burst::new("burst", 3)).unwrap();
    master.add_daemon(BrokenStartup).unwrap();
    master.start_daemons().unwrap();
    assert_eq!(master.active_workers(), 2);

    let latency = Arc::clone(master.latency());
    wait_until(|| latency.len() == 3).await;
    master.stop_daemons().await.unwrap();

    assert_eq!(rec.count(EventKind::DaemonAdded), 2);
    assert_eq!(rec.count(EventKind::WorkerStarted), 2);
    assert_eq!(rec.count(EventKind::WorkerStopped), 2);
    assert_eq!(rec.count(EventKind::TaskCompleted), 3);
    assert_eq!(rec.count(EventKind::DaemonStopped), 2);
    assert_eq!(rec.count(EventKind::AllStoppedWithin), 1);

    let seen = rec.seen.lock();
    let failed = seen
        .iter()
        .find(|e| e.kind == EventKind::DaemonFailed)
        .expect("startup failure published");
    assert_eq!(failed.daemon.as_deref(), Some("broken"));
    assert!(failed.reason.as_deref().unwrap_or("").contains("cannot connect"));
}

/// Ignores its shutdown token.
struct Stubborn;

#[async_trait]
impl Daemon for Stubborn {
    fn name(&self) -> &str {
        "stubborn"
    }

    async fn startup(&self, _ctx: DaemonContext) -> Result<(), DaemonError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn stuck_startup_is_aborted_after_grace() {
    let cfg = Config {
        grace: Duration::from_millis(100),
        ..Config::default()
    };
    let master = Master::builder(cfg).build();
    master.add_daemon(Stubborn).unwrap();
    master.add_daemon(Burst::new("polite", 0)).unwrap();
    master.start_daemons().unwrap();

    match master.stop_daemons().await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec!["stubborn".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
    assert_eq!(master.state(), LifecycleState::Stopped);
    assert_eq!(master.active_workers(), 0);
}

/// Turns every received price into a task.
struct PriceConsumer {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Daemon for PriceConsumer {
    fn name(&self) -> &str {
        "price_consumer"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        let mut streamer = ctx.subscribe("tests", "prices")?;
        {
            let mut messages = streamer.messages();
            loop {
                let msg = tokio::select! {
                    _ = ctx.shutdown_requested() => break,
                    msg = messages.next() => msg,
                };
                let Some(payload) = msg else { break };
                let price = String::from_utf8_lossy(&payload?).into_owned();
                let seen = Arc::clone(&self.seen);
                ctx.process(Actor::new(move || seen.lock().push(price)))
                    .await?;
            }
        }
        streamer.close().await?;
        Ok(())
    }
}

#[tokio::test]
async fn streamed_messages_become_tasks() {
    let broker = MemoryBroker::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cfg = Config {
        workers: 1,
        ..Config::default()
    };
    let master = Master::builder(cfg)
        .with_subscribe_fn(broker.subscribe_fn())
        .with_publisher(Arc::new(broker.publisher("prices")))
        .build();
    let id = master
        .add_daemon(PriceConsumer {
            seen: Arc::clone(&seen),
        })
        .unwrap();
    master.start_daemons().unwrap();

    // The subscription is created inside startup; ping until it is live.
    let publisher = broker.publisher("prices");
    let stats = master.daemon_stats(id).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while stats.is_empty() {
            publisher.publish(b"ping").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    for p in ["101.5", "102.0", "99.75"] {
        publisher.publish(p.as_bytes()).await.unwrap();
    }
    wait_until(|| seen.lock().iter().any(|p| p == "99.75")).await;
    master.stop_daemons().await.unwrap();

    let prices: Vec<String> = seen
        .lock()
        .iter()
        .filter(|p| p.as_str() != "ping")
        .cloned()
        .collect();
    assert_eq!(prices, vec!["101.5", "102.0", "99.75"]);
}

#[tokio::test]
async fn missing_transport_is_reported_to_the_daemon() {
    let rec = Arc::new(Recorder::default());
    let master = Master::builder(Config::default())
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();
    master
        .add_daemon(PriceConsumer {
            seen: Arc::new(Mutex::new(Vec::new())),
        })
        .unwrap();
    master.start_daemons().unwrap();
    master.stop_daemons().await.unwrap();

    let seen = rec.seen.lock();
    let failed = seen
        .iter()
        .find(|e| e.kind == EventKind::DaemonFailed)
        .expect("transport failure published");
    assert!(
        failed
            .reason
            .as_deref()
            .unwrap_or("")
            .contains("subscribe function")
    );
}

/// Sleeps on a blocking closure per task.
struct Sleepy {
    count: usize,
    nap: Duration,
}

#[async_trait]
impl Daemon for Sleepy {
    fn name(&self) -> &str {
        "sleepy"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        for _ in 0..self.count {
            let nap = self.nap;
            ctx.process(Actor::new(move || std::thread::sleep(nap)))
                .await?;
        }
        ctx.shutdown_requested().await;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_actors_use_the_whole_pool() {
    let master = Master::summon();
    let id = master
        .add_daemon(Sleepy {
            count: 10,
            nap: Duration::from_millis(100),
        })
        .unwrap();

    let started = std::time::Instant::now();
    master.start_daemons().unwrap();
    let stats = master.daemon_stats(id).unwrap();
    wait_until(|| stats.len() == 10).await;
    let took = started.elapsed();

    master.stop_daemons().await.unwrap();
    // One at a time would need at least a second.
    assert!(took < Duration::from_millis(500), "took {took:?}");
}

/// Enqueues its final tasks from the shutdown hook.
struct Farewell {
    count: usize,
}

#[async_trait]
impl Daemon for Farewell {
    fn name(&self) -> &str {
        "farewell"
    }

    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
        ctx.shutdown_requested().await;
        Ok(())
    }

    async fn shutdown(&self, ctx: &DaemonContext) -> Result<(), DaemonError> {
        for _ in 0..self.count {
            ctx.process(Actor::new(|| {})).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn tasks_from_shutdown_hook_still_run() {
    let master = Master::summon();
    let id = master.add_daemon(Farewell { count: 3 }).unwrap();
    master.start_daemons().unwrap();

    let report = master.stop_daemons().await.unwrap();
    assert_eq!(report.latency.count, 3);
    assert_eq!(master.daemon_stats(id).unwrap().len(), 3);
    // The report is taken before the workers settle.
    assert!(report.daemon("farewell").unwrap().count <= 3);
}

#[tokio::test]
async fn latency_covers_time_spent_queued() {
    let master = Master::summon();
    master
        .queue()
        .send(Task::system(Actor::new(|| {})))
        .await
        .unwrap();

    let queued = Duration::from_millis(60);
    tokio::time::sleep(queued).await;
    master.start_daemons().unwrap();

    let report = master.stop_daemons().await.unwrap();
    assert_eq!(report.latency.count, 1);
    assert!(report.latency.min >= queued, "min {:?}", report.latency.min);
}

#[test]
fn runtime_operations_need_a_tokio_runtime() {
    let master = Master::summon();
    assert!(matches!(
        master.add_daemon(Burst::new("orphan", 0)),
        Err(RuntimeError::NoAsyncRuntime {
            action: "add daemon"
        })
    ));
    assert!(matches!(
        master.start_daemons(),
        Err(RuntimeError::NoAsyncRuntime { .. })
    ));
    assert_eq!(master.state(), LifecycleState::Created);
    assert!(master.daemons().is_empty());
}
