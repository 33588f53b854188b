//! Public runtime API surface.
//!
//! This module gathers the types exposed to turn logic and embedders so the
//! rest of the crate can stay focused on protocol plumbing and workers.

pub mod errors;
pub mod handle;
pub mod lifecycle;
pub mod logic;
pub mod world;

pub use errors::{ClientError, ErrorCategory, ErrorSeverity, Result};
pub use handle::ServerHandle;
pub use lifecycle::{GameOutcome, SessionState};
pub use logic::{IdleLogic, TurnContext, TurnLogic};
pub use world::World;
