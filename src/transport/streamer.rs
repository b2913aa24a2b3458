//! Streamer / Publisher capabilities.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::TransportError;

/// Lazy, unbounded sequence of byte payloads.
///
/// Ends when the underlying subscription is closed.
pub type MessageStream<'a> = BoxStream<'a, Result<Vec<u8>, TransportError>>;

/// Creates a [`Streamer`] for `(consumer_group, topic)`.
pub type SubscribeFn =
    Arc<dyn Fn(&str, &str) -> Result<Box<dyn Streamer>, TransportError> + Send + Sync>;

/// Consumer side of a message transport.
#[async_trait]
pub trait Streamer: Send + Sync {
    /// Returns the message sequence of this subscription.
    ///
    /// A closed streamer yields an empty sequence; re-subscribe to restart.
    fn messages(&mut self) -> MessageStream<'_>;

    /// Releases the subscription.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Producer side of a message transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one payload.
    async fn publish(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Releases the publisher; later `publish` calls fail with `Closed`.
    async fn close(&self) -> Result<(), TransportError>;
}
