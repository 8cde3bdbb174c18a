//! Typed, string-keyed publish/subscribe bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  Each topic name gets its own channel, created lazily on the
//! first subscription.
//!
//! The bridge uses two instances:
//!
//! | Bus | Payload | Models |
//! |---|---|---|
//! | simulation | [`SimEnvelope`] | the simulator's transport |
//! | middleware | [`NavSatFix`][gpsbridge_types::NavSatFix] | the robotics middleware |

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use gpsbridge_types::{BridgeError, MessageInfo, SimNavSat};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered messages before old ones are
/// dropped for slow subscribers).
pub const DEFAULT_CAPACITY: usize = 256;

/// A simulator message together with its delivery metadata.
#[derive(Debug, Clone)]
pub struct SimEnvelope {
    pub msg: SimNavSat,
    pub info: MessageInfo,
}

/// Shared topic bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Debug)]
pub struct TopicBus<T> {
    capacity: usize,
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<T>>>>,
}

impl<T> Clone for TopicBus<T> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            topics: Arc::clone(&self.topics),
        }
    }
}

impl<T: Clone + Send + 'static> TopicBus<T> {
    /// Create a new bus with the given per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish `msg` on `topic`.
    ///
    /// Returns the number of active receivers that were handed the message,
    /// or [`BridgeError::NoSubscribers`] when nobody listens on the topic.
    pub fn publish(&self, topic: &str, msg: T) -> Result<usize, BridgeError> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let sender = topics
            .get(topic)
            .ok_or_else(|| BridgeError::NoSubscribers(topic.to_string()))?;
        sender
            .send(msg)
            .map_err(|broadcast::error::SendError(_)| BridgeError::NoSubscribers(topic.to_string()))
    }

    /// Subscribe to `topic`.
    ///
    /// Only messages published after this call are delivered.
    pub fn subscribe(&self, topic: &str) -> TopicReceiver<T> {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let sender = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        TopicReceiver {
            topic: topic.to_string(),
            receiver: sender.subscribe(),
        }
    }

    /// Number of live receivers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl<T: Clone + Send + 'static> Default for TopicBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single topic.
///
/// Obtained via [`TopicBus::subscribe`].
pub struct TopicReceiver<T> {
    topic: String,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> TopicReceiver<T> {
    /// Wait for the next message on this topic.
    ///
    /// Returns:
    /// * `Ok(msg)` – a successfully received message.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<T, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`][Self::recv].
    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Result<T, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The topic this receiver is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}
