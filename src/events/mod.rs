//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/observe lifecycle events emitted by the subscriber manager and the
//! per-channel listener tasks.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `SubscriberManager` (registry and teardown events),
//!   listener tasks (handler failures, transport closure, loop exit),
//!   the service binary (`ShutdownRequested`).
//! - **Consumers**: anything holding `SubscriberManager::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
