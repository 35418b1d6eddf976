//! # Game-result microservice shell.
//!
//! Everything the `subvisor` binary needs around the
//! [`SubscriberManager`](crate::SubscriberManager):
//! - [`config`]: [`ServiceConfig`] loaded from the environment (and `.env`)
//! - [`logging`]: `tracing-subscriber` installation
//! - [`handlers`]: domain handlers for `game-results`, `player-actions`, `chat-messages`
//! - [`setup`]: helpers wiring those handlers into a manager
//! - [`http`]: `axum` routes (`/health`, `/`, `/publish/{channel}`)

pub mod config;
pub mod handlers;
pub mod http;
pub mod logging;
pub mod setup;

pub use config::{BrokerKind, ServiceConfig};
pub use handlers::{ChatMessageHandler, GameResultHandler, PlayerActionHandler};
pub use setup::{
    setup_all_subscribers, setup_channels, setup_chat_message_subscriber,
    setup_game_result_subscriber, setup_player_action_subscriber,
};
