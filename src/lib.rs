//! # daemonic
//!
//! **Daemonic** is an in-process task-dispatch framework for Rust.
//!
//! Long-lived *daemons* produce short units of work (*actors*) and push them
//! onto one shared FIFO queue. A fixed pool of workers executes them,
//! isolating panics and recording how long each task waited and ran.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Daemon A   │   │   Daemon B   │   │   Daemon C   │
//!     │  startup()   │   │  startup()   │   │  startup()   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ ctx.process(actor)                  │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                  Task queue (bounded FIFO, shared)                │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Worker #1   │   │  Worker #2   │   │  Worker #10  │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ latency ──► Master statistics       │
//!      │ duration ──► owning daemon's statistics
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          event listener (Master)
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  sub #2   sub #N
//! ```
//!
//! ### Lifecycle
//! ```text
//! Master::summon() ──► Created
//!   add_daemon(d)*     registers d, spawns d.startup(ctx)
//! start_daemons()  ──► Running      spawns the worker pool
//! stop_daemons()   ──► Stopping
//!   for d in registration order:
//!     token(d).cancel() ─► d.shutdown(ctx) ─► join startup ─► log stats(d)
//!   cancel workers ─► drain queue ─► join pool ─► log latency
//!                  ──► Stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                        |
//! |-------------------|-----------------------------------------------------------|-------------------------------------------|
//! | **Coordination**  | Register daemons, start and stop the worker pool.         | [`Master`], [`MasterBuilder`], [`Config`] |
//! | **Daemons**       | Lifecycle hooks and injected context.                     | [`Daemon`], [`DaemonContext`]             |
//! | **Tasks**         | Zero-argument units of work, blocking or async.           | [`Actor`], [`Task`]                       |
//! | **Statistics**    | Queueing latency and per-daemon execution time.           | [`Statistics`], [`Snapshot`]              |
//! | **Events**        | Runtime events and subscriber fan-out.                    | [`Event`], [`Subscribe`], [`LogWriter`]   |
//! | **Transport**     | Injected message streams and publisher.                   | [`Streamer`], [`Publisher`]               |
//! | **Errors**        | Typed errors for lifecycle, tasks, daemons and transport. | [`RuntimeError`], [`TaskError`]           |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use daemonic::{Actor, Config, Daemon, DaemonContext, DaemonError, LogWriter, Master, Subscribe};
//!
//! struct Ticker;
//!
//! #[async_trait]
//! impl Daemon for Ticker {
//!     fn name(&self) -> &str { "ticker" }
//!
//!     async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
//!         let mut n = 0u64;
//!         while !ctx.is_shutting_down() {
//!             n += 1;
//!             ctx.process(Actor::new(move || println!("tick {n}"))).await?;
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let master = Master::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     master.add_daemon(Ticker)?;
//!     master.start_daemons()?;
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!
//!     let report = master.stop_daemons().await?;
//!     println!("{}", report.latency);
//!     Ok(())
//! }
//! ```

mod core;
mod daemons;
mod error;
mod events;
mod stats;
mod subscribers;
mod tasks;
mod transport;

// ---- Public re-exports ----

pub use core::{
    Config, DEFAULT_WORKERS, LifecycleState, Master, MasterBuilder, TaskSender,
    wait_for_shutdown_signal,
};
pub use daemons::{Daemon, DaemonContext, DaemonId};
pub use error::{DaemonError, RuntimeError, TaskError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use stats::{ShutdownReport, Snapshot, Statistics};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Actor, Task};
pub use transport::{
    MemoryBroker, MemoryPublisher, MemoryStreamer, MessageStream, Publisher, Streamer,
    SubscribeFn,
};
