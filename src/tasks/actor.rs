//! # Actor: the executable part of a task.
//!
//! An [`Actor`] is a zero-argument unit of work. It comes in two shapes:
//! - **blocking**: a `FnOnce()` closure, run on tokio's blocking thread pool
//!   while the worker awaits it;
//! - **future**: an async block, awaited on the worker.
//!
//! Panics are isolated (`catch_unwind` for futures, the blocking task's
//! `JoinError` for closures) and converted into [`TaskError::Panicked`], so a
//! failing actor never takes its worker down.
//!
//! ## Example
//! ```rust
//! use daemonic::{Actor, TaskError};
//!
//! let blocking = Actor::new(|| println!("hello"));
//! let future = Actor::from_future(async { println!("hello from async") });
//! let fallible = Actor::try_from_future(async { Err(TaskError::fail("nope")) });
//! # let _ = (blocking, future, fallible);
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{TaskError, panic_message};

enum Body {
    Blocking(Box<dyn FnOnce() + Send + 'static>),
    Future(BoxFuture<'static, Result<(), TaskError>>),
}

/// Zero-argument unit of executable logic captured inside a task.
pub struct Actor {
    body: Body,
}

impl Actor {
    /// Wraps a blocking closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            body: Body::Blocking(Box::new(f)),
        }
    }

    /// Wraps an infallible future.
    pub fn from_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            body: Body::Future(Box::pin(fut.map(Ok))),
        }
    }

    /// Wraps a future that may report failure explicitly.
    pub fn try_from_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            body: Body::Future(Box::pin(fut)),
        }
    }

    /// Runs the actor to completion, catching panics.
    ///
    /// Blocking closures go through `spawn_blocking`, so a long closure holds
    /// its worker slot without stalling the runtime's async threads.
    pub(crate) async fn invoke(self) -> Result<(), TaskError> {
        match self.body {
            Body::Blocking(f) => match tokio::task::spawn_blocking(f).await {
                Ok(()) => Ok(()),
                Err(je) if je.is_panic() => Err(TaskError::Panicked {
                    reason: panic_message(je.into_panic()),
                }),
                Err(je) => Err(TaskError::fail(je)),
            },
            Body::Future(fut) => match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(TaskError::Panicked {
                    reason: panic_message(payload),
                }),
            },
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            Body::Blocking(_) => "blocking",
            Body::Future(_) => "future",
        };
        f.debug_struct("Actor").field("kind", &kind).finish()
    }
}
