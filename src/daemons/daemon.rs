//! # Daemon abstraction.
//!
//! A [`Daemon`] is a long-lived producer of tasks. The master drives it through
//! two hooks:
//!
//! ```text
//! add_daemon(d) ──► spawn d.startup(ctx)          (fire-and-forget, runs concurrently)
//!                        │
//!                        └─► ctx.process(actor) ... until ctx.shutdown_requested()
//!
//! stop_daemons() ─► cancel ctx token ─► d.shutdown(&ctx).await ─► join startup ─► log stats
//! ```
//!
//! `startup` may return right away after spawning its own work, or keep running
//! until the shutdown token fires. Either way the master waits for it to finish
//! before reporting the daemon's statistics.

use std::fmt;

use async_trait::async_trait;

use crate::daemons::DaemonContext;
use crate::error::DaemonError;

/// Lightweight handle of a registered daemon (its index in the master's registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DaemonId(usize);

impl DaemonId {
    /// Builds a handle from a registry index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Registry index of this daemon.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DaemonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Long-lived unit producing tasks, with start/stop lifecycle hooks.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use daemonic::{Actor, Daemon, DaemonContext, DaemonError};
///
/// struct Hello;
///
/// #[async_trait]
/// impl Daemon for Hello {
///     fn name(&self) -> &str { "hello" }
///
///     async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError> {
///         ctx.process(Actor::new(|| println!("hello"))).await?;
///         ctx.shutdown_requested().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Daemon: Send + Sync + 'static {
    /// Returns a stable, human-readable daemon name used in logs and reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Begins background production of tasks.
    ///
    /// Runs on its own Tokio task. Implementations must stop producing once
    /// `ctx.shutdown_requested()` resolves.
    async fn startup(&self, ctx: DaemonContext) -> Result<(), DaemonError>;

    /// Stops producing tasks and releases resources.
    ///
    /// Called after the daemon's shutdown token fired; should return only once
    /// daemon-side in-flight work is settled.
    async fn shutdown(&self, _ctx: &DaemonContext) -> Result<(), DaemonError> {
        Ok(())
    }
}
