//! # Subscriber wiring.
//!
//! Convenience functions that register the domain handlers on a
//! [`SubscriberManager`]. `setup_all_subscribers` stops at the first failure;
//! earlier subscriptions stay in place and are released by `unsubscribe_all`.

use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::info;

use super::handlers::{
    CHAT_MESSAGES, ChatMessageHandler, GAME_RESULTS, GameResultHandler, PLAYER_ACTIONS,
    PlayerActionHandler, handler_for,
};
use crate::{SubscribeError, SubscriberManager};

/// Subscribes [`GameResultHandler`] to `game-results`.
pub async fn setup_game_result_subscriber(
    manager: &SubscriberManager,
) -> Result<(), SubscribeError> {
    manager.subscribe(GAME_RESULTS, Arc::new(GameResultHandler)).await
}

/// Subscribes [`PlayerActionHandler`] to `player-actions`.
pub async fn setup_player_action_subscriber(
    manager: &SubscriberManager,
) -> Result<(), SubscribeError> {
    manager.subscribe(PLAYER_ACTIONS, Arc::new(PlayerActionHandler)).await
}

/// Subscribes [`ChatMessageHandler`] to `chat-messages`.
pub async fn setup_chat_message_subscriber(
    manager: &SubscriberManager,
) -> Result<(), SubscribeError> {
    manager.subscribe(CHAT_MESSAGES, Arc::new(ChatMessageHandler)).await
}

/// Subscribes all three domain handlers.
pub async fn setup_all_subscribers(manager: &SubscriberManager) -> anyhow::Result<()> {
    setup_game_result_subscriber(manager)
        .await
        .context("failed to set up game result subscriber")?;
    setup_player_action_subscriber(manager)
        .await
        .context("failed to set up player action subscriber")?;
    setup_chat_message_subscriber(manager)
        .await
        .context("failed to set up chat message subscriber")?;

    info!("all subscribers have been set up successfully");
    Ok(())
}

/// Subscribes the handlers of the named channels.
///
/// Every name is checked before anything is subscribed: an unknown channel
/// fails the whole call with the registry untouched.
pub async fn setup_channels<S: AsRef<str>>(
    manager: &SubscriberManager,
    names: &[S],
) -> anyhow::Result<()> {
    let mut plan = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let Some(handler) = handler_for(name) else {
            bail!(
                "unknown channel: {name} (expected one of {GAME_RESULTS}, {PLAYER_ACTIONS}, \
                 {CHAT_MESSAGES})"
            );
        };
        plan.push((name, handler));
    }

    for (name, handler) in plan {
        manager
            .subscribe(name, handler)
            .await
            .with_context(|| format!("failed to set up subscriber for {name}"))?;
    }
    Ok(())
}
