//! # Listener: the receive loop of one subscription.
//!
//! A [`Listener`] owns one [`TransportStream`] and the [`HandlerRef`] registered
//! for its channel. The manager spawns [`Listener::run`] as a task; the task's
//! `JoinHandle` is the completion token.
//!
//! ## States
//! ```text
//! RUNNING ──┬── cancellation observed ──────────────► STOPPED (cancelled)
//!           └── stream.recv() == None ─► warn ──────► STOPPED (transport_closed)
//!
//! while RUNNING:
//!   select! (biased)
//!     ├─► token.cancelled()  → exit
//!     └─► stream.recv()      → handler.handle(channel, payload).await
//!                                 ├─ Ok        → next iteration
//!                                 ├─ Err(e)    → log + HandlerFailed, next iteration
//!                                 └─ panic     → log + HandlerFailed, next iteration
//! ```
//!
//! ## Rules
//! - Cancellation is checked first on every iteration, so after it is requested
//!   at most the message already being handled completes.
//! - Handler failures never stop the loop and never reach the manager.
//! - On exit the stream is handed back through [`ListenerExit`] so the manager
//!   can close it after the loop is gone.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;
use crate::transport::{Message, TransportStream};

/// Why a receive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitReason {
    /// The manager requested cancellation.
    Cancelled,
    /// The transport stream ended on its own.
    TransportClosed,
}

impl ExitReason {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            ExitReason::Cancelled => "cancelled",
            ExitReason::TransportClosed => "transport_closed",
        }
    }
}

/// Output of a finished listener task.
pub(crate) struct ListenerExit {
    pub(crate) stream: Box<dyn TransportStream>,
    pub(crate) reason: ExitReason,
}

enum Step {
    Cancelled,
    Closed,
    Message(Message),
}

/// Receive loop for a single channel.
pub(crate) struct Listener {
    channel: Arc<str>,
    handler: HandlerRef,
    stream: Box<dyn TransportStream>,
    bus: Bus,
}

impl Listener {
    pub(crate) fn new(
        channel: &str,
        handler: HandlerRef,
        stream: Box<dyn TransportStream>,
        bus: Bus,
    ) -> Self {
        Self {
            channel: Arc::from(channel),
            handler,
            stream,
            bus,
        }
    }

    /// Runs until cancellation or transport closure, then returns the stream.
    pub(crate) async fn run(mut self, token: CancellationToken) -> ListenerExit {
        let reason = loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                msg = self.stream.recv() => match msg {
                    Some(msg) => Step::Message(msg),
                    None => Step::Closed,
                },
            };

            match step {
                Step::Cancelled => break ExitReason::Cancelled,
                Step::Closed => {
                    warn!(channel = %self.channel, "transport stream closed for subscriber");
                    self.bus.publish(
                        Event::new(EventKind::TransportClosed).with_channel(self.channel.clone()),
                    );
                    break ExitReason::TransportClosed;
                }
                Step::Message(msg) => dispatch(&self.handler, &self.bus, msg).await,
            }
        };

        info!(channel = %self.channel, reason = reason.as_label(), "stopping subscriber");
        self.bus.publish(
            Event::new(EventKind::ListenerStopped)
                .with_channel(self.channel.clone())
                .with_reason(reason.as_label()),
        );

        ListenerExit {
            stream: self.stream,
            reason,
        }
    }
}

/// Invokes the handler for one message, containing errors and panics.
///
/// Takes the pieces it needs rather than `&Listener`: the stream is `Send` but
/// not `Sync`, and a borrow of it must not be held across the handler await.
async fn dispatch(handler: &HandlerRef, bus: &Bus, msg: Message) {
    debug!(channel = %msg.channel, bytes = msg.payload.len(), "dispatching message");

    let fut = handler.handle(&msg.channel, &msg.payload);
    let (kind, detail, failure) = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => (e.as_label(), e.as_message(), e.to_string()),
        Err(panic_err) => {
            let any = &*panic_err;
            let failure = if let Some(text) = any.downcast_ref::<&'static str>() {
                format!("handler panicked: {text}")
            } else if let Some(text) = any.downcast_ref::<String>() {
                format!("handler panicked: {text}")
            } else {
                "handler panicked".to_string()
            };
            ("handler_panicked", failure.clone(), failure)
        }
    };

    error!(
        channel = %msg.channel,
        handler = handler.name(),
        kind,
        error = %detail,
        "error handling message"
    );
    bus.publish(
        Event::new(EventKind::HandlerFailed)
            .with_channel(msg.channel.as_str())
            .with_reason(failure),
    );
}
