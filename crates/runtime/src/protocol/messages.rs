//! Typed protocol frames.
use serde::{Deserialize, Serialize};

use super::ProtocolError;
use super::delta::DeltaConstants;

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Resolves a game alias to its canonical name.
    Alias(String),
    /// Asks to join a game session.
    Play(PlayRequest),
    /// Invokes a remote action.
    Run(RunRequest),
    /// Reports that the order with the given index is complete.
    Finished(FinishedNotice),
}

impl ClientMessage {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    pub client_type: String,
    pub game_name: String,
    pub game_settings: String,
    pub password: Option<String>,
    pub player_index: Option<u32>,
    pub player_name: String,
    pub requested_session: String,
    pub spectating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub caller: Reference,
    pub function_name: String,
    /// Named arguments; key order follows the caller's argument order.
    pub args: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedNotice {
    pub order_index: u64,
    pub returned: serde_json::Value,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Canonical game name, in reply to `alias`.
    Named(String),
    /// Joined a session; waiting for other players.
    Lobbied(LobbyInfo),
    /// The game began; this client plays `player_id`.
    Start { player_id: String },
    /// Raw delta payload.
    Delta(serde_json::Value),
    /// The server wants the client to act.
    Order(OrderRequest),
    /// Result of the pending `run`.
    Ran(serde_json::Value),
    /// The pending `run` (or some other request) was refused.
    Invalid { message: String },
    /// The server gave up on this client.
    Fatal { message: String },
    /// The game is over.
    Over { message: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyInfo {
    pub game_name: String,
    pub game_session: String,
    #[serde(default)]
    pub constants: DeltaConstants,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRequest {
    pub name: String,
    pub index: u64,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct StartData {
    #[serde(rename = "playerID")]
    player_id: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct MessageData {
    message: Option<String>,
}

impl ServerMessage {
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let RawFrame { event, data } = serde_json::from_slice(frame)?;
        let message_of = |data: serde_json::Value| -> Result<Option<String>, ProtocolError> {
            if data.is_null() {
                return Ok(None);
            }
            Ok(serde_json::from_value::<MessageData>(data)?.message)
        };

        Ok(match event.as_str() {
            "named" => ServerMessage::Named(serde_json::from_value(data)?),
            "lobbied" => ServerMessage::Lobbied(serde_json::from_value(data)?),
            "start" => {
                let StartData { player_id } = serde_json::from_value(data)?;
                ServerMessage::Start { player_id }
            }
            "delta" => ServerMessage::Delta(data),
            "order" => ServerMessage::Order(serde_json::from_value(data)?),
            "ran" => ServerMessage::Ran(data),
            "invalid" => ServerMessage::Invalid {
                message: message_of(data)?.unwrap_or_default(),
            },
            "fatal" => ServerMessage::Fatal {
                message: message_of(data)?.unwrap_or_default(),
            },
            "over" => ServerMessage::Over {
                message: message_of(data)?,
            },
            _ => return Err(ProtocolError::UnknownEvent(event)),
        })
    }

    /// Event name, for logging and error reports.
    pub fn event(&self) -> &'static str {
        match self {
            ServerMessage::Named(_) => "named",
            ServerMessage::Lobbied(_) => "lobbied",
            ServerMessage::Start { .. } => "start",
            ServerMessage::Delta(_) => "delta",
            ServerMessage::Order(_) => "order",
            ServerMessage::Ran(_) => "ran",
            ServerMessage::Invalid { .. } => "invalid",
            ServerMessage::Fatal { .. } => "fatal",
            ServerMessage::Over { .. } => "over",
        }
    }
}
