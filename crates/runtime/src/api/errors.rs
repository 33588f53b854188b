//! Unified error types surfaced by the client runtime.
//!
//! Every failure a session can hit is a [`ClientError`]. Each variant falls in
//! one [`ErrorCategory`] and has an [`ErrorSeverity`]. Only action rejections
//! are recoverable: the server refused an action and the game goes on.
//! Everything else ends the session.
use std::time::Duration;

use game_state::{EntityId, StateError};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::protocol::ProtocolError;
use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("connection to the game server was lost")]
    ConnectionLost,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("server rejected the handshake: {reason}")]
    HandshakeRejected { reason: String },

    #[error("server reported a fatal error: {message}")]
    ServerFatal { message: String },

    #[error("delta does not fit the game schema")]
    Schema(#[source] StateError),

    #[error("delta would leave the registry inconsistent")]
    Consistency(#[source] StateError),

    #[error("`{action}` was rejected by the server: {message}")]
    ActionRejected { action: String, message: String },

    #[error("`{requested}` was issued while `{pending}` is still awaiting its reply")]
    CallInFlight { pending: String, requested: String },

    #[error("`{action}` was issued outside of a turn")]
    CallOutsideTurn { action: String },

    #[error("`{action}` targets {target}, which is not a live entity")]
    DeadTarget { action: String, target: EntityId },

    #[error("`{action}` got no reply within {timeout:?}")]
    CallTimedOut { action: String, timeout: Duration },

    #[error("session ended before the call completed")]
    SessionEnded,

    #[error("session controller is no longer accepting calls")]
    SessionClosed,

    #[error("reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("turn logic worker stopped unexpectedly")]
    LogicWorkerGone,

    #[error("turn logic worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("turn logic failed: {0}")]
    Logic(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// The connection failed, closed, or stopped answering.
    Transport,
    /// The server refused one action. The session continues.
    ActionRejected,
    /// The turn logic broke the calling contract.
    ContractViolation,
    /// A delta would break the registry invariants.
    Consistency,
    /// The server sent something this client cannot accept.
    Protocol,
    /// Local plumbing or turn logic failed.
    Internal,
}

/// Whether the session survives an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorSeverity {
    Recoverable,
    Fatal,
}

impl ErrorSeverity {
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorSeverity::Recoverable)
    }
}

impl ClientError {
    /// Convenience constructor for turn logic implementations.
    pub fn logic(message: impl Into<String>) -> Self {
        ClientError::Logic(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Transport(_)
            | ClientError::ConnectionLost
            | ClientError::CallTimedOut { .. } => ErrorCategory::Transport,
            ClientError::ActionRejected { .. } => ErrorCategory::ActionRejected,
            ClientError::CallInFlight { .. }
            | ClientError::CallOutsideTurn { .. }
            | ClientError::DeadTarget { .. } => ErrorCategory::ContractViolation,
            ClientError::Consistency(_) => ErrorCategory::Consistency,
            ClientError::Protocol(_)
            | ClientError::HandshakeRejected { .. }
            | ClientError::ServerFatal { .. }
            | ClientError::Schema(_) => ErrorCategory::Protocol,
            ClientError::SessionEnded
            | ClientError::SessionClosed
            | ClientError::ReplyChannelClosed(_)
            | ClientError::LogicWorkerGone
            | ClientError::WorkerJoin(_)
            | ClientError::Logic(_)
            | ClientError::Config(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::ActionRejected => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Fatal,
        }
    }

    /// Whether the error ends the session.
    pub fn is_fatal(&self) -> bool {
        !self.severity().is_recoverable()
    }
}

impl From<StateError> for ClientError {
    fn from(error: StateError) -> Self {
        if error.is_consistency_violation() {
            ClientError::Consistency(error)
        } else {
            ClientError::Schema(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_are_recoverable() {
        let rejected = ClientError::ActionRejected {
            action: "move".into(),
            message: "tile is occupied".into(),
        };
        assert!(!rejected.is_fatal());
        assert_eq!(rejected.severity(), ErrorSeverity::Recoverable);
        assert!(ClientError::ConnectionLost.is_fatal());
        assert!(
            ClientError::CallInFlight {
                pending: "move".into(),
                requested: "attack".into(),
            }
            .is_fatal()
        );
    }

    #[test]
    fn state_errors_split_by_kind() {
        let dangling = StateError::DeletedEntity { id: "7".into() };
        let mismatch = StateError::UnknownType { tag: "Ship".into() };
        assert_eq!(
            ClientError::from(dangling).category(),
            ErrorCategory::Consistency
        );
        assert_eq!(
            ClientError::from(mismatch).category(),
            ErrorCategory::Protocol
        );
    }
}
