//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] shared by the
//! manager and every listener task.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Receivers (any number):
//!   SubscriberManager ──┐
//!   Listener #1 ────────┼──────► Bus ──────► manager.events() (tests, metrics, service)
//!   Listener #N ────────┘  (broadcast chan)
//! ```
//!
//! ## Rules
//! - `publish()` is synchronous and never waits on receivers.
//! - One ring buffer of `ManagerConfig::bus_capacity` events is shared by all receivers.
//! - A receiver that falls behind observes `RecvError::Lagged(n)` and loses the `n` oldest events.
//! - Events published while nobody listens are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// A receiver only gets events **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
