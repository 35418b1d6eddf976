//! Error types used by the subscriber manager, handlers and transports.
//!
//! This module defines three enums:
//!
//! - [`SubscribeError`] - registry-level failures returned to the caller of the manager.
//! - [`HandlerError`] - per-message failures raised by a [`MessageHandler`](crate::MessageHandler).
//! - [`TransportError`] - failures reported by a [`Transport`](crate::Transport) or its streams.
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics) and
//! `as_message` helpers.

use thiserror::Error;

/// # Errors returned by the subscriber manager.
///
/// Structural errors: they are returned synchronously to the caller and never
/// leave the registry in a partially updated state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscribeError {
    /// The channel already has an active subscription.
    #[error("already subscribed to channel: {channel}")]
    AlreadySubscribed {
        /// Channel the caller tried to subscribe.
        channel: String,
    },

    /// The transport rejected the subscription or could not confirm it.
    #[error("failed to subscribe to channel {channel}: {reason}")]
    SubscriptionFailed {
        /// Channel the caller tried to subscribe.
        channel: String,
        /// Transport-provided failure description.
        reason: String,
    },

    /// The channel has no active subscription.
    #[error("not subscribed to channel: {channel}")]
    NotSubscribed {
        /// Channel the caller tried to unsubscribe.
        channel: String,
    },
}

impl SubscribeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use subvisor::SubscribeError;
    ///
    /// let err = SubscribeError::NotSubscribed { channel: "chat-messages".into() };
    /// assert_eq!(err.as_label(), "not_subscribed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscribeError::AlreadySubscribed { .. } => "already_subscribed",
            SubscribeError::SubscriptionFailed { .. } => "subscription_failed",
            SubscribeError::NotSubscribed { .. } => "not_subscribed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SubscribeError::AlreadySubscribed { channel } => {
                format!("channel={channel} already has a listener")
            }
            SubscribeError::SubscriptionFailed { channel, reason } => {
                format!("channel={channel} transport refused: {reason}")
            }
            SubscribeError::NotSubscribed { channel } => {
                format!("channel={channel} has no listener")
            }
        }
    }

    /// Channel the error refers to.
    pub fn channel(&self) -> &str {
        match self {
            SubscribeError::AlreadySubscribed { channel }
            | SubscribeError::SubscriptionFailed { channel, .. }
            | SubscribeError::NotSubscribed { channel } => channel,
        }
    }
}

/// # Errors produced while handling a single message.
///
/// Handler errors are contained at the listener boundary: they are logged and
/// published as events, never returned to the manager or its caller.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handling failed for any other reason.
    #[error("handling failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
        }
    }
}

/// # Errors reported by the pub/sub transport.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport (or broker connection) is closed.
    #[error("transport closed")]
    Closed,

    /// The broker refused the operation.
    #[error("rejected by broker: {reason}")]
    Rejected {
        /// Broker-provided reason.
        reason: String,
    },

    /// Closing a subscription stream failed.
    #[error("close failed: {reason}")]
    Close {
        /// Failure description.
        reason: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use subvisor::TransportError;
    ///
    /// assert_eq!(TransportError::Closed.as_label(), "transport_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Closed => "transport_closed",
            TransportError::Rejected { .. } => "transport_rejected",
            TransportError::Close { .. } => "transport_close_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TransportError::Closed => "transport closed".to_string(),
            TransportError::Rejected { reason } => format!("rejected: {reason}"),
            TransportError::Close { reason } => format!("close: {reason}"),
        }
    }
}
