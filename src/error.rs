//! Error types used by the daemonic runtime, tasks, daemons and transports.
//!
//! This module defines four error enums:
//!
//! - [`RuntimeError`] - errors raised by the orchestration runtime itself.
//! - [`TaskError`] - failures of a single task execution.
//! - [`DaemonError`] - errors returned from daemon lifecycle hooks.
//! - [`TransportError`] - errors returned by streamer/publisher collaborators.
//!
//! All of them provide `as_label` for logs/metrics.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::core::LifecycleState;

/// # Errors produced by the daemonic runtime.
///
/// Lifecycle misuse (double start, double stop, registration after start)
/// is reported here instead of being left undefined.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An operation was attempted in a lifecycle state that does not allow it.
    #[error("cannot {action} while master is {state}")]
    InvalidState {
        /// Operation that was rejected (e.g. "start daemons").
        action: &'static str,
        /// State the master was in.
        state: LifecycleState,
    },

    /// A runtime operation was called outside a Tokio runtime.
    #[error("cannot {action} outside a Tokio runtime")]
    NoAsyncRuntime {
        /// Operation that was rejected.
        action: &'static str,
    },

    /// The shared task queue is closed; no more tasks are accepted.
    #[error("task queue is closed")]
    QueueClosed,

    /// Shutdown grace period was exceeded; the listed units were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Daemons and workers that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use daemonic::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::QueueClosed.as_label(), "runtime_queue_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidState { .. } => "runtime_invalid_state",
            RuntimeError::NoAsyncRuntime { .. } => "runtime_no_async_runtime",
            RuntimeError::QueueClosed => "runtime_queue_closed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Failure of a single task execution.
///
/// Task failures are contained by the worker that ran the task:
/// they are logged and published as events, never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The actor panicked.
    #[error("actor panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },

    /// The actor returned an explicit failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Fail { .. } => "task_failed",
        }
    }

    /// Builds a [`TaskError::Fail`] from anything displayable.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }
}

/// # Errors returned from daemon lifecycle hooks.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Daemon-specific failure.
    #[error("daemon failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A transport collaborator failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The runtime rejected an operation (e.g. the queue is closed).
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl DaemonError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DaemonError::Fail { .. } => "daemon_failed",
            DaemonError::Transport(e) => e.as_label(),
            DaemonError::Runtime(e) => e.as_label(),
        }
    }

    /// Builds a [`DaemonError::Fail`] from anything displayable.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        DaemonError::Fail {
            error: error.to_string(),
        }
    }
}

/// # Errors produced by message transport collaborators.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The master was built without this collaborator.
    #[error("{what} is not configured")]
    NotConfigured {
        /// Which collaborator is missing ("subscribe function", "publisher").
        what: &'static str,
    },

    /// The streamer or publisher was already closed.
    #[error("transport is closed")]
    Closed,

    /// A slow consumer skipped messages.
    #[error("consumer lagged behind; {skipped} messages skipped")]
    Lagged {
        /// Number of skipped messages.
        skipped: u64,
    },

    /// Transport-specific failure.
    #[error("transport failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::NotConfigured { .. } => "transport_not_configured",
            TransportError::Closed => "transport_closed",
            TransportError::Lagged { .. } => "transport_lagged",
            TransportError::Fail { .. } => "transport_failed",
        }
    }
}

/// Renders a panic payload caught by `catch_unwind` as text.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
