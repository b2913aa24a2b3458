//! # Shared task queue.
//!
//! A bounded `tokio::sync::mpsc` channel with many producers (daemons and the
//! master) and many consumers (workers). The single receiver is shared behind
//! an async mutex, so each task is handed to exactly one worker.
//!
//! ## Worker wait
//! ```text
//! next(token):
//!   lock receiver
//!   select! (biased)
//!     ├─ recv()            → Some(task) / None when every sender is gone
//!     └─ token.cancelled() → try_recv(): take an already-queued task, else None
//! ```
//! Workers therefore sleep while idle, keep draining after the token fired,
//! and exit as soon as the queue is empty.
//!
//! ## Rules
//! - Capacity is clamped to ≥ 1; capacity 1 is the closest to a hand-off channel.
//! - `close()` happens once, after all workers exited; later sends fail with
//!   [`RuntimeError::QueueClosed`].

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::tasks::Task;

/// Creates a queue with the given capacity.
pub(crate) fn channel(capacity: usize) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TaskSender { tx },
        TaskReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle of the shared task queue.
#[derive(Clone, Debug)]
pub struct TaskSender {
    tx: mpsc::Sender<Task>,
}

impl TaskSender {
    /// Sends a task, waiting for room in the queue.
    pub async fn send(&self, task: Task) -> Result<(), RuntimeError> {
        self.tx
            .send(task)
            .await
            .map_err(|_| RuntimeError::QueueClosed)
    }

    /// Returns true once the queue was closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle shared by all workers.
#[derive(Clone)]
pub(crate) struct TaskReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Task>>>,
}

impl TaskReceiver {
    /// Waits for the next task, or `None` once `token` fired and nothing is ready.
    pub(crate) async fn next(&self, token: &CancellationToken) -> Option<Task> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            task = rx.recv() => task,
            _ = token.cancelled() => rx.try_recv().ok(),
        }
    }

    /// Closes the queue and drops whatever is still buffered.
    ///
    /// Returns the number of tasks dropped unexecuted.
    pub(crate) async fn close(&self) -> usize {
        let mut rx = self.rx.lock().await;
        rx.close();
        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
