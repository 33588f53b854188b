//! Wire format spoken with the game server.
//!
//! Each frame is one JSON object `{"event": ..., "data": ...}`. Outgoing
//! frames are built from [`ClientMessage`], incoming frames decode into
//! [`ServerMessage`], and delta payloads are turned into registry
//! [`Delta`](game_state::Delta)s by [`DeltaDecoder`].

mod delta;
mod json;
mod messages;

use thiserror::Error;

pub use delta::{DeltaConstants, DeltaDecoder};
pub use json::{camel_case, snake_case, value_from_json, value_to_json};
pub use messages::{
    ClientMessage, FinishedNotice, LobbyInfo, OrderRequest, PlayRequest, Reference, RunRequest,
    ServerMessage,
};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    #[error("unexpected `{event}` {context}")]
    Unexpected {
        event: &'static str,
        context: &'static str,
    },

    #[error("unsupported order `{0}`")]
    UnsupportedOrder(String),

    #[error("`{action}` returned {found}, expected {expected}")]
    UnexpectedReturn {
        action: String,
        expected: &'static str,
        found: &'static str,
    },
}
