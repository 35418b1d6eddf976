//! # subvisor
//!
//! **Subvisor** manages the lifecycle of pub/sub subscribers.
//!
//! It keeps one listener task per subscribed channel, feeds every inbound
//! message to the handler registered for that channel, and tears listeners
//! down deterministically: after `unsubscribe` returns, the handler of that
//! channel is no longer running and its stream has been closed.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     subscribe("game-results", h1)   subscribe("chat-messages", h2)
//!                 │                               │
//!                 ▼                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SubscriberManager                                                │
//! │  - Registry   RwLock<HashMap<channel, Handle{join, cancel}>>      │
//! │  - Transport  (Arc<dyn Transport>, e.g. MemoryBroker)             │
//! │  - Bus        (broadcast lifecycle events)                        │
//! └──────┬───────────────────────────────────────┬────────────────────┘
//!        ▼                                       ▼
//!   ┌──────────────┐                        ┌──────────────┐
//!   │   Listener   │                        │   Listener   │
//!   │ game-results │                        │chat-messages │
//!   └──────┬───────┘                        └──────┬───────┘
//!          │ stream.recv() → h1.handle()           │ stream.recv() → h2.handle()
//!          │                                       │
//!          │ Publishes: HandlerFailed,             │
//!          │ TransportClosed, ListenerStopped      │
//!          ▼                                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! │              (capacity: ManagerConfig::bus_capacity)              │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! subscribe ──► transport.subscribe() (confirmed) ──► spawn Listener::run()
//!
//! loop {
//!   ├─► cancellation requested?  ─► exit (cancelled)
//!   ├─► stream.recv() == None    ─► TransportClosed, exit (stale entry stays)
//!   └─► handler.handle(channel, payload)
//!          ├─ Ok            ─► continue
//!          └─ Err / panic   ─► HandlerFailed, continue
//! }
//!
//! unsubscribe ──► cancel ──► await join (drain) ──► stream.close() ──► Unsubscribed
//! ```
//!
//! ## Features
//! | Area          | Description                                        | Key types             |
//! |---------------|----------------------------------------------------|-----------------------|
//! | **Manager**   | Subscribe/unsubscribe channels, query the registry | [`SubscriberManager`] |
//! | **Handlers**  | Per-message callbacks as trait objects or closures | [`MessageHandler`]    |
//! | **Transport** | Broker abstraction, in-process and Redis brokers   | [`Transport`]         |
//! | **Events**    | Observe the lifecycle without touching the manager | [`Bus`], [`Event`]    |
//! | **Errors**    | Registry, handler and transport failures           | [`SubscribeError`]    |
//!
//! ## Optional features
//! - `redis` (default): `RedisTransport`, a [`Transport`] over Redis pub/sub.
//! - `service` (default, implies `redis`): the game-result microservice
//!   (`service` module and the `subvisor` binary): env config, domain handlers,
//!   HTTP surface, logging setup.
//!
//! ## Example
//! ```rust
//! use subvisor::{HandlerError, HandlerFn, HandlerRef, MemoryBroker, SubscriberManager, Transport};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = MemoryBroker::arc();
//!     let manager = SubscriberManager::new(broker.clone());
//!
//!     let handler: HandlerRef =
//!         HandlerFn::arc("results", |channel: String, payload: String| async move {
//!             println!("{channel}: {payload}");
//!             Ok::<_, HandlerError>(())
//!         });
//!
//!     manager.subscribe("game-results", handler).await?;
//!     broker.publish("game-results", r#"{"game_id":"g1"}"#).await?;
//!
//!     // Blocks until the handler is idle and the stream is closed.
//!     manager.unsubscribe("game-results").await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod handlers;
mod transport;

#[cfg(feature = "service")]
pub mod service;

// ---- Public re-exports ----

pub use core::{ManagerConfig, ShutdownSignal, SubscriberManager, wait_for_shutdown_signal};
pub use error::{HandlerError, SubscribeError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use handlers::{HandlerFn, HandlerRef, MessageHandler};
pub use transport::{
    MemoryBroker, MemoryStream, Message, Transport, TransportRef, TransportStream,
};

#[cfg(feature = "redis")]
pub use transport::{RedisOptions, RedisStream, RedisTransport};
