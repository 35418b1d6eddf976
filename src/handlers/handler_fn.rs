//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(String, String) -> Fut`, producing a fresh
//! future per message. The closure receives owned copies of the channel and the
//! payload so the future can be `'static`.
//!
//! ## Example
//! ```rust
//! use subvisor::{HandlerError, HandlerFn, HandlerRef, MessageHandler};
//!
//! let h: HandlerRef = HandlerFn::arc("printer", |channel: String, payload: String| async move {
//!     println!("{channel}: {payload}");
//!     Ok::<_, HandlerError>(())
//! });
//!
//! assert_eq!(h.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::handlers::handler::MessageHandler;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for HandlerFn<F>
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, channel: &str, payload: &str) -> Result<(), HandlerError> {
        (self.f)(channel.to_owned(), payload.to_owned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerRef;

    #[tokio::test]
    async fn test_closure_receives_channel_and_payload() {
        let h: HandlerRef = HandlerFn::arc("check", |channel: String, payload: String| async move {
            if channel == "game-results" && payload == "{}" {
                Ok(())
            } else {
                Err(HandlerError::fail("unexpected input"))
            }
        });

        assert!(h.handle("game-results", "{}").await.is_ok());
        assert!(h.handle("chat-messages", "{}").await.is_err());
        assert_eq!(h.name(), "check");
    }
}
