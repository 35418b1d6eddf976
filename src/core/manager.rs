//! # Subscriber manager: one listener per channel.
//!
//! [`SubscriberManager`] owns the registry `channel → Handle` and the authority
//! to create and destroy listeners.
//!
//! ## Architecture
//! ```text
//! subscribe(channel, handler)
//!   └─► write lock
//!         ├─► already registered?        → AlreadySubscribed
//!         ├─► transport.subscribe()      → SubscriptionFailed (registry untouched)
//!         ├─► spawn Listener::run(token)
//!         └─► insert Handle { join, cancel }
//!
//! unsubscribe(channel)
//!   └─► write lock
//!         ├─► missing?                   → NotSubscribed
//!         ├─► cancel.cancel()
//!         ├─► join.await                 (drain; optional timeout → abort)
//!         ├─► stream.close()             (failure logged, CloseFailed)
//!         └─► entry gone                 → Unsubscribed
//!
//! unsubscribe_all()
//!   └─► write lock held for the whole sweep
//!         ├─► cancel every listener
//!         └─► join + close each          → AllUnsubscribed
//! ```
//!
//! ## Rules
//! - At most one listener per channel; every registry key has a spawned task.
//! - The registry is only changed under the write lock; queries take the read lock.
//! - Teardown never returns while the handler can still run or the stream is in use.
//! - A stream that closes on its own leaves a stale entry until an explicit
//!   `unsubscribe` (see [`SubscriberManager::is_listening`]).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::config::ManagerConfig;
use crate::core::listener::{Listener, ListenerExit};
use crate::error::SubscribeError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;
use crate::transport::TransportRef;

/// Handle to a running listener.
struct Handle {
    /// Name of the registered handler.
    handler: Arc<str>,
    /// Completion token: resolves once the receive loop has exited.
    join: JoinHandle<ListenerExit>,
    /// Individual cancellation token for this listener.
    cancel: CancellationToken,
}

/// Registry of active subscriptions, keyed by channel name.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use subvisor::{HandlerError, HandlerFn, MemoryBroker, SubscriberManager};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let broker = MemoryBroker::arc();
/// let manager = SubscriberManager::new(broker.clone());
///
/// let handler = HandlerFn::arc("print", |channel: String, payload: String| async move {
///     println!("{channel}: {payload}");
///     Ok::<_, HandlerError>(())
/// });
///
/// manager.subscribe("game-results", handler).await?;
/// assert!(manager.is_subscribed("game-results").await);
///
/// manager.unsubscribe("game-results").await?;
/// assert!(!manager.is_subscribed("game-results").await);
/// # Ok(())
/// # }
/// ```
pub struct SubscriberManager {
    subs: RwLock<HashMap<String, Handle>>,
    transport: TransportRef,
    bus: Bus,
    cfg: ManagerConfig,
}

impl SubscriberManager {
    /// Creates a manager with the default [`ManagerConfig`].
    pub fn new(transport: TransportRef) -> Self {
        Self::with_config(transport, ManagerConfig::default())
    }

    /// Creates a manager with the given configuration.
    pub fn with_config(transport: TransportRef, cfg: ManagerConfig) -> Self {
        Self {
            subs: RwLock::new(HashMap::new()),
            transport,
            bus: Bus::new(cfg.bus_capacity_clamped()),
            cfg,
        }
    }

    /// Subscribes `channel` and starts its listener.
    ///
    /// ### Errors
    /// - [`SubscribeError::AlreadySubscribed`] if the channel already has a listener
    /// - [`SubscribeError::SubscriptionFailed`] if the transport refused or could not confirm
    ///
    /// The registry is left untouched on error.
    pub async fn subscribe(
        &self,
        channel: impl Into<String>,
        handler: HandlerRef,
    ) -> Result<(), SubscribeError> {
        let channel = channel.into();
        let mut subs = self.subs.write().await;

        if subs.contains_key(&channel) {
            return Err(self.rejected(SubscribeError::AlreadySubscribed { channel }));
        }

        let stream = match self.transport.subscribe(&channel).await {
            Ok(stream) => stream,
            Err(e) => {
                return Err(self.rejected(SubscribeError::SubscriptionFailed {
                    channel,
                    reason: e.to_string(),
                }));
            }
        };

        // Spawn and insert under the same write guard: readers never see a
        // running listener without its entry.
        let cancel = CancellationToken::new();
        let listener = Listener::new(&channel, Arc::clone(&handler), stream, self.bus.clone());
        let join = tokio::spawn(listener.run(cancel.clone()));
        subs.insert(
            channel.clone(),
            Handle {
                handler: Arc::from(handler.name()),
                join,
                cancel,
            },
        );
        drop(subs);

        info!(channel = %channel, handler = handler.name(), "successfully subscribed to channel");
        self.bus.publish(
            Event::new(EventKind::Subscribed)
                .with_channel(channel.as_str())
                .with_reason(handler.name()),
        );
        Ok(())
    }

    /// Cancels the listener of `channel`, waits for it to drain, closes its stream
    /// and removes the entry.
    ///
    /// A second call for the same channel fails with [`SubscribeError::NotSubscribed`].
    pub async fn unsubscribe(&self, channel: &str) -> Result<(), SubscribeError> {
        let mut subs = self.subs.write().await;

        // The write guard is held until teardown completes.
        let Some(handle) = subs.remove(channel) else {
            warn!(channel, "unsubscribe requested for unknown channel");
            return Err(SubscribeError::NotSubscribed {
                channel: channel.to_string(),
            });
        };

        self.teardown(channel, handle).await;
        drop(subs);

        info!(channel, "successfully unsubscribed from channel");
        self.bus
            .publish(Event::new(EventKind::Unsubscribed).with_channel(channel));
        Ok(())
    }

    /// Tears down every listener and empties the registry.
    ///
    /// All listeners are cancelled first, then drained and closed one by one in
    /// channel order. Close failures are logged, never propagated.
    pub async fn unsubscribe_all(&self) {
        let mut subs = self.subs.write().await;

        let mut handles: Vec<(String, Handle)> = subs.drain().collect();
        handles.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        for (_, h) in &handles {
            h.cancel.cancel();
        }

        let count = handles.len();
        for (channel, h) in handles {
            self.teardown(&channel, h).await;
            self.bus
                .publish(Event::new(EventKind::Unsubscribed).with_channel(channel.as_str()));
        }
        drop(subs);

        info!(count, "all subscribers have been unsubscribed");
        self.bus.publish(Event::new(EventKind::AllUnsubscribed));
    }

    /// Returns true if `channel` has a registry entry.
    pub async fn is_subscribed(&self, channel: &str) -> bool {
        self.subs.read().await.contains_key(channel)
    }

    /// Returns a snapshot of the subscribed channel names.
    pub async fn subscribed_channels(&self) -> BTreeSet<String> {
        self.subs.read().await.keys().cloned().collect()
    }

    /// Returns whether the listener of `channel` is still running.
    ///
    /// - `None` → not subscribed
    /// - `Some(false)` → stale entry: the transport stream closed on its own and
    ///   the channel awaits an explicit [`unsubscribe`](Self::unsubscribe)
    pub async fn is_listening(&self, channel: &str) -> Option<bool> {
        self.subs
            .read()
            .await
            .get(channel)
            .map(|h| !h.join.is_finished())
    }

    /// Returns the name of the handler registered for `channel`.
    pub async fn handler_name(&self, channel: &str) -> Option<String> {
        self.subs
            .read()
            .await
            .get(channel)
            .map(|h| h.handler.to_string())
    }

    /// Number of registered channels.
    pub async fn len(&self) -> usize {
        self.subs.read().await.len()
    }

    /// Returns true if no channel is registered.
    pub async fn is_empty(&self) -> bool {
        self.subs.read().await.is_empty()
    }

    /// Creates a receiver of lifecycle events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Event bus shared with the listeners.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    /// Logs and publishes a refused subscribe, handing the error back.
    fn rejected(&self, err: SubscribeError) -> SubscribeError {
        error!(
            channel = err.channel(),
            kind = err.as_label(),
            error = %err.as_message(),
            "subscribe rejected"
        );
        self.bus.publish(
            Event::new(EventKind::SubscribeRejected)
                .with_channel(err.channel())
                .with_reason(err.as_label()),
        );
        err
    }

    /// cancel → drain → close. The handle is already out of the registry.
    async fn teardown(&self, channel: &str, handle: Handle) {
        handle.cancel.cancel();

        let Some(mut exit) = self.drain(channel, handle.join).await else {
            return;
        };
        debug!(channel, reason = exit.reason.as_label(), "listener drained");

        if let Err(e) = exit.stream.close().await {
            error!(
                channel,
                kind = e.as_label(),
                error = %e.as_message(),
                "error closing subscription stream"
            );
            self.bus.publish(
                Event::new(EventKind::CloseFailed)
                    .with_channel(channel)
                    .with_reason(e.to_string()),
            );
        }
    }

    /// Awaits the listener task, bounded by the configured drain timeout.
    ///
    /// On timeout the task is aborted and still awaited: abort only takes effect
    /// at the task's next yield, and the handler may be mid-poll on another
    /// worker until then. Returns `None` if the task was aborted or panicked;
    /// its stream is dropped with it.
    async fn drain(
        &self,
        channel: &str,
        mut join: JoinHandle<ListenerExit>,
    ) -> Option<ListenerExit> {
        let res = match self.cfg.drain_limit() {
            None => join.await,
            Some(limit) => match time::timeout(limit, &mut join).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    join.abort();
                    let res = join.await;
                    warn!(channel, timeout = ?limit, "listener did not drain in time; aborted");
                    self.bus.publish(
                        Event::new(EventKind::DrainTimedOut)
                            .with_channel(channel)
                            .with_timeout(limit),
                    );
                    res
                }
            },
        };

        match res {
            Ok(exit) => Some(exit),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                error!(channel, error = %e, "listener task ended abnormally");
                None
            }
        }
    }
}

impl Drop for SubscriberManager {
    fn drop(&mut self) {
        // No async teardown here: stop the loops, streams go with their tasks.
        for h in self.subs.get_mut().values() {
            h.cancel.cancel();
        }
    }
}
