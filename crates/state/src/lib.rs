//! Client-side object graph mirrored from an authoritative game server.
//!
//! This crate is the synchronous half of the client: it owns every live
//! [`Entity`] inside a [`Registry`], describes per-game attribute shapes with a
//! [`SchemaTable`], and merges server [`Delta`]s atomically via [`apply_delta`].
//! Nothing here performs I/O or knows about the wire format.
//!
//! Modules are organized by responsibility:
//! - [`value`] defines attribute values and entity identifiers
//! - [`schema`] maps type tags to their field shapes
//! - [`registry`] owns entities and enforces the no-dangling-reference rule
//! - [`delta`] describes incoming changes and applies them as a unit
pub mod delta;
pub mod error;
pub mod registry;
pub mod schema;
pub mod value;

pub use delta::{AttributePatch, AttributePatches, Delta, DeltaEntry, DeltaSummary, apply_delta};
pub use error::{Result, StateError};
pub use registry::{DanglingReference, Entity, Registry, UpsertOutcome};
pub use schema::{FieldKind, SchemaTable, TypeSchema};
pub use value::{EntityId, TypeTag, Value};
