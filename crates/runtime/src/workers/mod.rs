//! Worker tasks that back a session.
//!
//! The controller owns the transport and the registry writes; the logic
//! worker runs the user's turn logic. Exactly one of them is active at a time.

mod controller;
mod logic;

pub(crate) use controller::{SHUTDOWN_GRACE, SessionController};
pub(crate) use logic::{LogicCommand, LogicWorker};
