//! Client runtime for turn-based game servers.
//!
//! This crate keeps a local mirror of the server's game state in sync through
//! deltas, lets turn logic invoke server-side actions as if they were local
//! calls, and drives the session lifecycle from handshake to game over.
//! Consumers build a [`Session`], plug in a [`TurnLogic`], and read the world
//! through [`World`] while acting through [`ServerHandle`].
//!
//! Modules are organized by responsibility:
//! - [`session`] hosts the orchestrator and builder
//! - [`api`] exposes the types turn logic interacts with
//! - [`events`] provides topic-based event bus for observers
//! - [`protocol`] and [`transport`] implement the wire format
//! - [`rpc`] tracks the single in-flight remote call
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod config;
pub mod events;
pub mod protocol;
pub mod rpc;
pub mod session;
pub mod transport;

mod workers;

pub use api::{
    ClientError, ErrorCategory, ErrorSeverity, GameOutcome, IdleLogic, Result, ServerHandle,
    SessionState, TurnContext, TurnLogic, World,
};
pub use config::{ChannelConfig, ClientConfig};
pub use events::{Event, EventBus, SessionEvent, StateEvent, Topic, TurnEvent};
pub use protocol::{ClientMessage, DeltaConstants, DeltaDecoder, ProtocolError, ServerMessage};
pub use rpc::{CallRequest, Dispatcher, PendingCall};
pub use session::{Session, SessionBuilder};
pub use transport::{MemoryTransport, TcpTransport, Transport, TransportError};
