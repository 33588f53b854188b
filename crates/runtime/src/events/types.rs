//! Event types for different topics.

use game_state::{DeltaSummary, EntityId};
use serde::{Deserialize, Serialize};

use crate::api::{GameOutcome, SessionState};

/// Events related to registry changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateEvent {
    /// A delta was merged into the registry
    DeltaApplied {
        summary: DeltaSummary,
        /// Whether the delta arrived while this player's turn was running
        during_turn: bool,
    },
}

/// Events related to turn progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TurnEvent {
    /// The server ordered this client to play
    Started { order_index: u64 },

    /// A remote action got its reply
    CallResolved {
        target: EntityId,
        action: String,
        accepted: bool,
    },

    /// The turn was reported finished
    Finished {
        order_index: u64,
        /// How many times the turn logic ran before ending the turn
        passes: u32,
    },
}

/// Events related to the session lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },

    /// Joined a game session on the server
    Lobbied { game: String, session: String },

    /// The game started and this client plays `player`
    Started { player: EntityId },

    /// The session is over
    Ended {
        outcome: GameOutcome,
        /// Set when a fatal error ended the session
        error: Option<String>,
    },
}
