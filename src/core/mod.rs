//! Runtime core: master, worker pool and lifecycle.
//!
//! The public entry point is [`Master`], built directly with
//! [`Master::summon`] or through [`MasterBuilder`].
//!
//! Internal modules:
//! - `queue`: bounded FIFO shared by all workers;
//! - `worker`: worker loops and the pool that joins them;
//! - `runner`: executes one task and routes its statistics;
//! - `registry`: ordered daemon list indexed by [`DaemonId`](crate::DaemonId);
//! - `lifecycle`: `Created → Running → Stopping → Stopped` state machine;
//! - `shutdown`: cross-platform termination signal handling.

mod builder;
mod config;
mod lifecycle;
mod master;
pub(crate) mod queue;
mod registry;
mod runner;
mod shutdown;
mod worker;

pub use builder::MasterBuilder;
pub use config::{Config, DEFAULT_WORKERS};
pub use lifecycle::LifecycleState;
pub use master::Master;
pub use queue::TaskSender;
pub use shutdown::wait_for_shutdown_signal;

pub(crate) use queue::TaskReceiver;
