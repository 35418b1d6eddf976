//! # Redis broker.
//!
//! [`RedisTransport`] publishes over one multiplexed connection and opens a
//! dedicated pub/sub connection per subscription.
//!
//! ```text
//! connect(opts) ──► Client ──► multiplexed conn ──► PING
//!
//! subscribe(channel)
//!   └─► get_async_pubsub() ──► SUBSCRIBE channel (awaits the server ack)
//!         └─► RedisStream { pubsub }
//!
//! RedisStream::recv()  ──► next pub/sub message (None once the connection drops)
//! RedisStream::close() ──► UNSUBSCRIBE channel, connection dropped
//! ```
//!
//! Messages whose payload is not valid UTF-8 are skipped with a warning.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{MultiplexedConnection, PubSub};
use redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError,
};
use tracing::{debug, info, warn};

use super::{Message, Transport, TransportStream};
use crate::error::TransportError;

/// Connection settings for a Redis server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisOptions {
    pub host: String,
    pub port: u16,
    /// ACL user; empty = none.
    pub username: String,
    /// Password; empty = none.
    pub password: String,
    /// Logical database index.
    pub db: i64,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: String::new(),
            password: String::new(),
            db: 0,
        }
    }
}

impl RedisOptions {
    /// Builds the client connection info. Empty credentials are omitted.
    pub fn connection_info(&self) -> ConnectionInfo {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: non_empty(&self.username),
                password: non_empty(&self.password),
                ..RedisConnectionInfo::default()
            },
        }
    }
}

fn rejected(e: RedisError) -> TransportError {
    TransportError::Rejected {
        reason: e.to_string(),
    }
}

/// Redis-backed transport.
pub struct RedisTransport {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisTransport {
    /// Connects and verifies the server answers `PING`.
    pub async fn connect(opts: &RedisOptions) -> Result<Self, TransportError> {
        let client = Client::open(opts.connection_info()).map_err(rejected)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(rejected)?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(rejected)?;
        info!(
            host = %opts.host,
            port = opts.port,
            db = opts.db,
            reply = %pong,
            "connected to redis"
        );

        Ok(Self { client, conn })
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn TransportStream>, TransportError> {
        if channel.is_empty() {
            return Err(TransportError::Rejected {
                reason: "empty channel name".to_string(),
            });
        }

        let mut pubsub = self.client.get_async_pubsub().await.map_err(rejected)?;
        pubsub.subscribe(channel).await.map_err(rejected)?;
        debug!(channel, "redis subscription confirmed");

        Ok(Box::new(RedisStream {
            channel: channel.to_string(),
            pubsub: Some(pubsub),
        }))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, TransportError> {
        let mut conn = self.conn.clone();
        conn.publish(channel, payload).await.map_err(rejected)
    }
}

/// Stream side of a [`RedisTransport`] subscription.
pub struct RedisStream {
    channel: String,
    /// `None` once closed.
    pubsub: Option<PubSub>,
}

#[async_trait]
impl TransportStream for RedisStream {
    async fn recv(&mut self) -> Option<Message> {
        loop {
            let messages = self.pubsub.as_mut()?.on_message();
            tokio::pin!(messages);
            let msg = messages.next().await?;
            match msg.get_payload::<String>() {
                Ok(payload) => return Some(Message::new(msg.get_channel_name(), payload)),
                Err(e) => {
                    warn!(channel = %self.channel, error = %e, "skipping non-UTF-8 redis payload");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut pubsub) = self.pubsub.take() else {
            return Err(TransportError::Close {
                reason: "already closed".to_string(),
            });
        };
        pubsub
            .unsubscribe(self.channel.as_str())
            .await
            .map_err(|e| TransportError::Close {
                reason: e.to_string(),
            })
    }
}
