//! # In-process message broker.
//!
//! [`MemoryBroker`] keeps one `tokio::sync::broadcast` channel per topic.
//! Every subscription receives every message published after it subscribed;
//! the consumer group is kept for identification only, messages are not
//! partitioned between members of a group.
//!
//! ## Example
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), daemonic::TransportError> {
//! use futures::StreamExt;
//! use daemonic::{MemoryBroker, Publisher, Streamer};
//!
//! let broker = MemoryBroker::default();
//! let mut prices = broker.subscribe("pricing", "prices");
//! broker.publisher("prices").publish(b"42.0").await?;
//!
//! let msg = prices.messages().next().await.unwrap()?;
//! assert_eq!(msg, b"42.0");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::TransportError;
use crate::transport::{MessageStream, Publisher, Streamer, SubscribeFn};

/// Default per-topic ring size.
const DEFAULT_TOPIC_CAPACITY: usize = 1024;

/// Topic registry backed by broadcast channels.
#[derive(Clone, Debug)]
pub struct MemoryBroker {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
    capacity: usize,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl MemoryBroker {
    /// Creates a broker whose topics buffer up to `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        let mut topics = self.topics.lock();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribes to `topic` on behalf of `group`.
    pub fn subscribe(&self, group: &str, topic: &str) -> MemoryStreamer {
        MemoryStreamer {
            group: group.to_string(),
            topic: topic.to_string(),
            rx: Some(self.sender(topic).subscribe()),
        }
    }

    /// Returns a subscribe function suitable for `MasterBuilder::with_subscribe_fn`.
    pub fn subscribe_fn(&self) -> SubscribeFn {
        let broker = self.clone();
        Arc::new(move |group: &str, topic: &str| {
            Ok(Box::new(broker.subscribe(group, topic)) as Box<dyn Streamer>)
        })
    }

    /// Creates a publisher bound to `topic`.
    pub fn publisher(&self, topic: &str) -> MemoryPublisher {
        MemoryPublisher {
            topic: topic.to_string(),
            tx: self.sender(topic),
            closed: AtomicBool::new(false),
        }
    }
}

/// Subscription to one topic of a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryStreamer {
    group: String,
    topic: String,
    rx: Option<broadcast::Receiver<Vec<u8>>>,
}

impl MemoryStreamer {
    /// Consumer group this subscription was made for.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Subscribed topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Streamer for MemoryStreamer {
    fn messages(&mut self) -> MessageStream<'_> {
        let Some(rx) = self.rx.as_mut() else {
            return Box::pin(stream::empty());
        };
        Box::pin(stream::unfold(rx, |rx| async move {
            match rx.recv().await {
                Ok(msg) => Some((Ok(msg), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    Some((Err(TransportError::Lagged { skipped }), rx))
                }
                Err(RecvError::Closed) => None,
            }
        }))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.rx.take() {
            Some(_) => Ok(()),
            None => Err(TransportError::Closed),
        }
    }
}

/// Publisher bound to one topic of a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryPublisher {
    topic: String,
    tx: broadcast::Sender<Vec<u8>>,
    closed: AtomicBool,
}

impl MemoryPublisher {
    /// Topic this publisher writes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        // No subscribers means the message is dropped, as on a real topic with no consumers.
        let _ = self.tx.send(payload.to_vec());
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}
