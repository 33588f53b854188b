//! Session lifecycle states and the terminal game outcome.
use game_state::{EntityId, Registry};
use serde::{Deserialize, Serialize};

use super::errors::ClientError;

/// Where a session is in its lifecycle.
///
/// `Connecting → Handshaking → AwaitingOrder ⇄ RunningCallback`, then
/// `Ended` once the game is over or a fatal error occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Handshaking,
    AwaitingOrder,
    RunningCallback,
    Ended,
}

/// How the game ended for this player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub won: bool,
    pub reason: String,
    /// Closing message sent by the server, if any.
    pub message: Option<String>,
}

impl GameOutcome {
    /// Reads the verdict from the player's `won`, `reason_won` and
    /// `reason_lost` attributes.
    pub fn from_player(
        registry: &Registry,
        player: Option<&EntityId>,
        message: Option<String>,
    ) -> Self {
        let entity = player.and_then(|id| registry.get(id));
        let won = entity
            .and_then(|player| player.get("won"))
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let reason_key = if won { "reason_won" } else { "reason_lost" };
        let reason = entity
            .and_then(|player| player.get(reason_key))
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_owned();

        Self {
            won,
            reason,
            message,
        }
    }

    /// Outcome reported when the session dies before the game is over.
    pub fn failure(error: &ClientError) -> Self {
        Self {
            won: false,
            reason: error.to_string(),
            message: None,
        }
    }
}
