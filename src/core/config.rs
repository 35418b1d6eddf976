//! # Subscriber manager configuration.
//!
//! Provides [`ManagerConfig`], the settings of one [`SubscriberManager`](crate::SubscriberManager).
//!
//! ## Sentinel values
//! - `drain_timeout = 0s` → wait for a listener to drain without bound
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::time::Duration;

/// Configuration for the subscriber manager.
///
/// ## Field semantics
/// - `bus_capacity`: lifecycle event ring buffer size (min 1)
/// - `drain_timeout`: how long `unsubscribe`/`unsubscribe_all` wait for one
///   listener to exit before aborting it (`0s` = no limit)
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Capacity of the lifecycle event broadcast channel.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Upper bound on waiting for a cancelled listener to exit.
    ///
    /// - `Duration::ZERO` = wait indefinitely (a handler that never returns
    ///   stalls that channel's teardown)
    /// - `> 0` = abort the listener task once exceeded and wait for the abort
    ///   to land; its stream is dropped instead of closed and the registry
    ///   entry is still removed
    pub drain_timeout: Duration,
}

impl ManagerConfig {
    /// Returns the drain timeout as an `Option` (`None` = unbounded).
    #[inline]
    pub fn drain_limit(&self) -> Option<Duration> {
        if self.drain_timeout == Duration::ZERO {
            None
        } else {
            Some(self.drain_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ManagerConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `drain_timeout = 0s` (unbounded)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            drain_timeout: Duration::ZERO,
        }
    }
}
