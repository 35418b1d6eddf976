//! # Handler abstractions.
//!
//! - [`MessageHandler`] - trait for per-message callbacks
//! - [`HandlerFn`] - closure-backed implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn MessageHandler>`)

mod handler;
mod handler_fn;

pub use handler::{HandlerRef, MessageHandler};
pub use handler_fn::HandlerFn;
