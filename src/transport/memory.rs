//! # In-process broker.
//!
//! [`MemoryBroker`] keeps, per channel, the senders of every open
//! [`MemoryStream`]. Publishing fans a cloned [`Message`] out to each of them.
//!
//! ```text
//! publish("game-results", payload)
//!     │
//!     ├──► [unbounded queue] ──► MemoryStream #1 ──► listener task
//!     └──► [unbounded queue] ──► MemoryStream #2 ──► listener task
//! ```
//!
//! ## Rules
//! - Queues are unbounded: no backpressure, no persistence.
//! - Streams closed or dropped by their owner are pruned on the next publish.
//! - `disconnect(channel)` ends every stream of that channel (receivers observe `None`).
//! - `shutdown()` ends all streams; later `subscribe`/`publish` fail with
//!   [`TransportError::Closed`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use super::{Message, Transport, TransportStream};
use crate::error::TransportError;

#[derive(Default)]
struct Inner {
    closed: bool,
    channels: HashMap<String, Vec<mpsc::UnboundedSender<Message>>>,
}

/// In-memory pub/sub broker.
#[derive(Default)]
pub struct MemoryBroker {
    inner: RwLock<Inner>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty broker wrapped in `Arc`.
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Ends every open stream of `channel`; returns how many were ended.
    pub async fn disconnect(&self, channel: &str) -> usize {
        let mut inner = self.inner.write().await;
        let ended = inner
            .channels
            .remove(channel)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0);
        debug!(channel, ended, "memory broker disconnected channel");
        ended
    }

    /// Ends all streams and rejects further operations.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        inner.closed = true;
        inner.channels.clear();
    }

    /// Number of open streams on `channel`.
    pub async fn stream_count(&self, channel: &str) -> usize {
        let inner = self.inner.read().await;
        inner
            .channels
            .get(channel)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MemoryBroker {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn TransportStream>, TransportError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(TransportError::Closed);
        }
        if channel.is_empty() {
            return Err(TransportError::Rejected {
                reason: "empty channel name".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        inner
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        debug!(channel, "memory broker subscription confirmed");

        Ok(Box::new(MemoryStream { rx, closed: false }))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, TransportError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(TransportError::Closed);
        }

        let Some(senders) = inner.channels.get_mut(channel) else {
            debug!(channel, "no subscribers for channel");
            return Ok(0);
        };

        senders.retain(|tx| !tx.is_closed());
        let delivered = senders
            .iter()
            .filter(|tx| tx.send(Message::new(channel, payload)).is_ok())
            .count();

        if senders.is_empty() {
            inner.channels.remove(channel);
        }
        Ok(delivered)
    }
}

/// Stream side of a [`MemoryBroker`] subscription.
pub struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Message>,
    closed: bool,
}

#[async_trait]
impl TransportStream for MemoryStream {
    async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Close {
                reason: "already closed".to_string(),
            });
        }
        self.closed = true;
        self.rx.close();
        Ok(())
    }
}
