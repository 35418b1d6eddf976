//! # Domain handlers.
//!
//! One handler per known channel. Each logs the raw message, tries to decode
//! it as JSON into its record type and logs the decoded fields. A payload that
//! is not JSON is logged as-is and is still a successful handling.
//!
//! | Channel          | Handler                 | Record           |
//! |------------------|-------------------------|------------------|
//! | `game-results`   | [`GameResultHandler`]   | [`GameResult`]   |
//! | `player-actions` | [`PlayerActionHandler`] | [`PlayerAction`] |
//! | `chat-messages`  | [`ChatMessageHandler`]  | [`ChatMessage`]  |

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::info;

use crate::{HandlerError, HandlerRef, MessageHandler};

pub const GAME_RESULTS: &str = "game-results";
pub const PLAYER_ACTIONS: &str = "player-actions";
pub const CHAT_MESSAGES: &str = "chat-messages";

/// Outcome of a finished game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameResult {
    pub game_id: String,
    pub player_id: String,
    pub result: String,
    pub score: i64,
    pub timestamp: String,
}

/// Something a player did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerAction {
    pub player_id: String,
    pub action: String,
    pub details: String,
    pub timestamp: String,
}

/// A chat line posted in a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub player_id: String,
    pub room_id: String,
    pub message: String,
    pub timestamp: String,
}

/// Decodes a payload, or `None` when it is not a JSON object of that shape.
pub fn decode<T: DeserializeOwned>(payload: &str) -> Option<T> {
    serde_json::from_str(payload).ok()
}

/// Handler for `game-results`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GameResultHandler;

#[async_trait]
impl MessageHandler for GameResultHandler {
    fn name(&self) -> &str {
        "game_result_handler"
    }

    async fn handle(&self, channel: &str, payload: &str) -> Result<(), HandlerError> {
        info!(channel, payload, "received message from channel");

        let Some(r) = decode::<GameResult>(payload) else {
            info!(channel, payload, "raw message (not JSON)");
            return Ok(());
        };
        info!(
            game_id = %r.game_id,
            player_id = %r.player_id,
            result = %r.result,
            score = r.score,
            "processing game result"
        );
        Ok(())
    }
}

/// Handler for `player-actions`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlayerActionHandler;

#[async_trait]
impl MessageHandler for PlayerActionHandler {
    fn name(&self) -> &str {
        "player_action_handler"
    }

    async fn handle(&self, channel: &str, payload: &str) -> Result<(), HandlerError> {
        info!(channel, payload, "received player action from channel");

        let Some(a) = decode::<PlayerAction>(payload) else {
            info!(channel, payload, "raw player action message (not JSON)");
            return Ok(());
        };
        info!(
            player_id = %a.player_id,
            action = %a.action,
            details = %a.details,
            "processing player action"
        );
        Ok(())
    }
}

/// Handler for `chat-messages`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatMessageHandler;

#[async_trait]
impl MessageHandler for ChatMessageHandler {
    fn name(&self) -> &str {
        "chat_message_handler"
    }

    async fn handle(&self, channel: &str, payload: &str) -> Result<(), HandlerError> {
        info!(channel, payload, "received chat message from channel");

        let Some(c) = decode::<ChatMessage>(payload) else {
            info!(channel, payload, "raw chat message (not JSON)");
            return Ok(());
        };
        info!(
            player_id = %c.player_id,
            room_id = %c.room_id,
            text = %c.message,
            "processing chat message"
        );
        Ok(())
    }
}

/// Returns the handler serving a known channel.
pub fn handler_for(channel: &str) -> Option<HandlerRef> {
    let h: HandlerRef = match channel {
        GAME_RESULTS => Arc::new(GameResultHandler),
        PLAYER_ACTIONS => Arc::new(PlayerActionHandler),
        CHAT_MESSAGES => Arc::new(ChatMessageHandler),
        _ => return None,
    };
    Some(h)
}
