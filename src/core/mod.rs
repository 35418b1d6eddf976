//! Runtime core: subscription lifecycle.
//!
//! The public entry point is [`SubscriberManager`], which owns one listener task
//! per subscribed channel and tears them down on request.
//!
//! Internal modules:
//! - [`config`]: manager settings (event bus capacity, drain timeout);
//! - [`listener`]: the receive loop of one subscription;
//! - [`manager`]: the channel registry and subscribe/unsubscribe operations;
//! - [`shutdown`]: termination signal handling for hosting processes.

mod config;
mod listener;
mod manager;
mod shutdown;

pub use config::ManagerConfig;
pub use manager::SubscriberManager;
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
