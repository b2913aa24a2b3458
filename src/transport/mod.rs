//! # Message transport collaborators.
//!
//! The core never talks to a broker itself. Daemons receive two injected
//! collaborators through their [`DaemonContext`](crate::DaemonContext):
//! - a [`SubscribeFn`] producing a [`Streamer`] per `(consumer group, topic)`,
//! - a shared [`Publisher`].
//!
//! Every operation returns a `Result`; the daemon decides whether a
//! [`TransportError`](crate::TransportError) ends it or is skipped.
//!
//! [`MemoryBroker`] is an in-process implementation for demos and tests.

mod memory;
mod streamer;

pub use memory::{MemoryBroker, MemoryPublisher, MemoryStreamer};
pub use streamer::{MessageStream, Publisher, Streamer, SubscribeFn};
