//! # Pub/sub transport abstraction.
//!
//! The subscriber manager consumes the broker through two narrow traits:
//! - [`Transport`] - `subscribe(channel)` and `publish(channel, payload)`
//! - [`TransportStream`] - one confirmed server-side subscription: `recv()` and `close()`
//!
//! Two implementations ship with the crate:
//! - [`MemoryBroker`]: in-process broker used by tests and local runs
//! - `RedisTransport` (feature `redis`): Redis pub/sub, used by the service binary
//!
//! ## Contract
//! - `subscribe` returns only after the subscription is confirmed; a failure here
//!   is reported to the manager's caller as `SubscriptionFailed`.
//! - `recv` yields messages lazily and returns `None` once the stream is closed
//!   (disconnect or administrative close). It is never polled again after that.
//! - `close` is called exactly once by the manager, after the listener task exited.
//! - Delivery is at-most-once: no acknowledgment, no replay.

mod memory;
#[cfg(feature = "redis")]
mod redis_broker;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;

pub use memory::{MemoryBroker, MemoryStream};
#[cfg(feature = "redis")]
pub use redis_broker::{RedisOptions, RedisStream, RedisTransport};

/// Shared reference to a transport (`Arc<dyn Transport>`).
pub type TransportRef = Arc<dyn Transport>;

/// Inbound message delivered on a subscription stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published to.
    pub channel: String,
    /// Raw payload as published.
    pub payload: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// # Publish/subscribe broker client.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establishes a confirmed subscription to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn TransportStream>, TransportError>;

    /// Publishes `payload` to `channel`, returning the number of streams that received it.
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, TransportError>;
}

/// # One server-side subscription.
///
/// Owned exclusively by a single listener task while it runs.
#[async_trait]
pub trait TransportStream: Send + 'static {
    /// Waits for the next message; `None` means the stream is closed.
    async fn recv(&mut self) -> Option<Message>;

    /// Releases the server-side subscription.
    async fn close(&mut self) -> Result<(), TransportError>;
}
