//! Errors raised while validating or applying state changes.

use thiserror::Error;

use crate::value::{EntityId, TypeTag};

/// Reasons a delta (or a single upsert) is rejected.
///
/// Any of these aborts the whole delta: the registry is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("unknown type tag `{tag}`")]
    UnknownType { tag: TypeTag },

    #[error("`{tag}` has no attribute `{attribute}`")]
    UnknownAttribute { tag: TypeTag, attribute: String },

    #[error("attribute `{tag}.{attribute}` expects {expected}, got {found}")]
    TypeMismatch {
        tag: TypeTag,
        attribute: String,
        expected: String,
        found: &'static str,
    },

    #[error("entity {id} is a `{existing}` and cannot become a `{requested}`")]
    TypeConflict {
        id: EntityId,
        existing: TypeTag,
        requested: TypeTag,
    },

    #[error("attribute `{tag}.{attribute}` is not a map and cannot be patched key-wise")]
    NotAMap { tag: TypeTag, attribute: String },

    #[error("entity {id} was deleted and cannot be updated again")]
    DeletedEntity { id: EntityId },

    #[error("{from}.{attribute} references deleted entity {target}")]
    DanglingReference {
        from: EntityId,
        attribute: String,
        target: EntityId,
    },
}

impl StateError {
    /// True when applying the change would break the no-dangling-reference rule,
    /// as opposed to a delta that simply does not fit the schema.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            StateError::DeletedEntity { .. } | StateError::DanglingReference { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
