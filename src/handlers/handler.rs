//! # Message handler abstraction.
//!
//! A [`MessageHandler`] is the pluggable business logic behind a subscription.
//! The listener invokes it once per inbound message and awaits it before
//! receiving the next one, so a single handler never runs concurrently for the
//! same channel.
//!
//! The common handle type is [`HandlerRef`], an `Arc<dyn MessageHandler>`
//! suitable for sharing between channels.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;

/// Shared reference to a handler (`Arc<dyn MessageHandler>`).
pub type HandlerRef = Arc<dyn MessageHandler>;

/// # Per-message callback.
///
/// Errors are logged by the listener and never stop the subscription.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use subvisor::{HandlerError, MessageHandler};
///
/// struct Echo;
///
/// #[async_trait]
/// impl MessageHandler for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn handle(&self, channel: &str, payload: &str) -> Result<(), HandlerError> {
///         if payload.is_empty() {
///             return Err(HandlerError::fail(format!("empty payload on {channel}")));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Human-readable name (for logs/events).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handles one message published to `channel`.
    async fn handle(&self, channel: &str, payload: &str) -> Result<(), HandlerError>;
}
