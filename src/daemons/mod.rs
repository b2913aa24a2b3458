//! # Daemons: long-lived task producers.
//!
//! - [`Daemon`] - lifecycle hooks implemented by concrete daemons
//! - [`DaemonContext`] - state injected by the master (queue, token, stats, transports)
//! - [`DaemonId`] - registry handle carried by tasks

mod context;
mod daemon;

pub use context::DaemonContext;
pub use daemon::{Daemon, DaemonId};
