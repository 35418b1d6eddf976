//! # Lifecycle events emitted by the subscriber manager and its listeners.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Registry events**: a channel was subscribed, rejected or unsubscribed
//! - **Listener events**: per-message failures and receive-loop exits
//! - **Teardown events**: close failures, drain timeouts, bulk shutdown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! channel name, a reason string and the drain timeout.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are observed from several receivers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use subvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DrainTimedOut)
//!     .with_channel("game-results")
//!     .with_reason("handler still running")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::DrainTimedOut);
//! assert_eq!(ev.channel.as_deref(), Some("game-results"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A listener was spawned and registered for a channel.
    ///
    /// Sets:
    /// - `channel`: channel name
    /// - `reason`: handler name
    Subscribed,

    /// A subscribe call was refused (already subscribed or transport failure).
    ///
    /// Sets:
    /// - `channel`: channel name
    /// - `reason`: error label
    SubscribeRejected,

    /// A channel was drained, closed and removed from the registry.
    ///
    /// Sets:
    /// - `channel`: channel name
    Unsubscribed,

    // === Listener events ===
    /// The handler returned an error (or panicked) for one message.
    ///
    /// Sets:
    /// - `channel`: origin channel of the message
    /// - `reason`: failure message
    HandlerFailed,

    /// The transport stream ended without a cancellation request.
    ///
    /// The registry entry stays in place until an explicit unsubscribe.
    ///
    /// Sets:
    /// - `channel`: channel name
    TransportClosed,

    /// The receive loop exited; the completion token is about to resolve.
    ///
    /// Sets:
    /// - `channel`: channel name
    /// - `reason`: `"cancelled"` or `"transport_closed"`
    ListenerStopped,

    // === Teardown events ===
    /// Closing the transport stream failed during teardown (entry is still removed).
    ///
    /// Sets:
    /// - `channel`: channel name
    /// - `reason`: transport error
    CloseFailed,

    /// A listener did not drain within the configured timeout and was aborted.
    ///
    /// Sets:
    /// - `channel`: channel name
    /// - `timeout_ms`: configured drain timeout (ms)
    DrainTimedOut,

    /// Every listener was drained and the registry is empty.
    AllUnsubscribed,

    /// The hosting service is shutting down.
    ///
    /// Sets:
    /// - `reason`: cause (`SIGTERM`, `http_server_exited`, ...)
    ShutdownRequested,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Subscribed => "subscribed",
            EventKind::SubscribeRejected => "subscribe-rejected",
            EventKind::Unsubscribed => "unsubscribed",
            EventKind::HandlerFailed => "handler-failed",
            EventKind::TransportClosed => "transport-closed",
            EventKind::ListenerStopped => "listener-stopped",
            EventKind::CloseFailed => "close-failed",
            EventKind::DrainTimedOut => "drain-timed-out",
            EventKind::AllUnsubscribed => "all-unsubscribed",
            EventKind::ShutdownRequested => "shutdown-requested",
        }
    }
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Channel the event refers to, if applicable.
    pub channel: Option<Arc<str>>,
    /// Human-readable reason (errors, exit causes, etc.).
    pub reason: Option<Arc<str>>,
    /// Drain timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            channel: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a channel name.
    #[inline]
    pub fn with_channel(mut self, channel: impl Into<Arc<str>>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Returns true if the event refers to `channel`.
    #[inline]
    pub fn is_for(&self, channel: &str) -> bool {
        self.channel.as_deref() == Some(channel)
    }
}
