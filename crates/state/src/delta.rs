//! Incoming state changes and the merge engine that applies them.
//!
//! A [`Delta`] is applied as one unit by [`apply_delta`]:
//!
//! 1. Validate every entry against the registry and schema. Nothing is mutated,
//!    so a rejected delta leaves the registry exactly as it was.
//! 2. Apply creations and attribute patches in entry order. References to ids
//!    that are not live yet become placeholders.
//! 3. Apply deletions last, nulling every reference to the removed ids.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{Result, StateError};
use crate::registry::{Registry, UpsertOutcome};
use crate::value::{EntityId, TypeTag, Value};

/// Change to a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributePatch {
    /// Replace the whole value. Lists are always replaced this way.
    Set(Value),
    /// Reset the attribute to its schema default (or drop it if undeclared).
    Remove,
    /// Key-wise overwrite of a map attribute; `None` removes the key.
    /// Values are replaced, never deep-merged.
    MergeEntries(BTreeMap<String, Option<Value>>),
}

impl AttributePatch {
    pub fn for_each_ref(&self, f: &mut impl FnMut(&EntityId)) {
        match self {
            AttributePatch::Set(value) => value.for_each_ref(f),
            AttributePatch::Remove => {}
            AttributePatch::MergeEntries(entries) => {
                entries.values().flatten().for_each(|value| value.for_each_ref(f))
            }
        }
    }
}

/// Attribute name → change.
pub type AttributePatches = BTreeMap<String, AttributePatch>;

#[derive(Clone, Debug, PartialEq)]
pub enum DeltaEntry {
    /// Create the entity if needed, then patch it. `type_tag` is present the
    /// first time the server describes the entity.
    Upsert {
        id: EntityId,
        type_tag: Option<TypeTag>,
        patch: AttributePatches,
    },
    Delete {
        id: EntityId,
    },
}

/// Ordered batch of changes sent by the server.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delta {
    entries: Vec<DeltaEntry>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, id: &str, type_tag: Option<&str>, patch: AttributePatches) -> Self {
        self.entries.push(DeltaEntry::Upsert {
            id: EntityId::new(id),
            type_tag: type_tag.map(TypeTag::new),
            patch,
        });
        self
    }

    pub fn delete(mut self, id: &str) -> Self {
        self.entries.push(DeltaEntry::Delete {
            id: EntityId::new(id),
        });
        self
    }

    pub fn push(&mut self, entry: DeltaEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DeltaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DeltaEntry> for Delta {
    fn from_iter<I: IntoIterator<Item = DeltaEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// What one applied delta changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeltaSummary {
    pub created: Vec<EntityId>,
    pub populated: Vec<EntityId>,
    pub updated: usize,
    pub deleted: Vec<EntityId>,
}

impl DeltaSummary {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.populated.is_empty()
            && self.updated == 0
            && self.deleted.is_empty()
    }
}

/// Applies `delta` to `registry` atomically.
///
/// On error the registry is unchanged.
pub fn apply_delta(registry: &mut Registry, delta: &Delta) -> Result<DeltaSummary> {
    // An entity may be patched before the entry that names its type.
    let mut declared: HashMap<&EntityId, &TypeTag> = HashMap::new();
    for entry in &delta.entries {
        if let DeltaEntry::Upsert {
            id,
            type_tag: Some(tag),
            ..
        } = entry
            && let Some(previous) = declared.insert(id, tag)
            && previous != tag
        {
            return Err(StateError::TypeConflict {
                id: id.clone(),
                existing: previous.clone(),
                requested: tag.clone(),
            });
        }
    }

    let mut resolved_tags = Vec::with_capacity(delta.entries.len());
    for entry in &delta.entries {
        if let DeltaEntry::Upsert { id, patch, .. } = entry {
            let requested = declared.get(id).copied();
            resolved_tags.push(registry.check_upsert(id, requested, patch)?);
        }
    }

    let mut summary = DeltaSummary::default();
    let upserts = delta.entries.iter().filter_map(|entry| match entry {
        DeltaEntry::Upsert { id, patch, .. } => Some((id, patch)),
        DeltaEntry::Delete { .. } => None,
    });
    for ((id, patch), tag) in upserts.zip(resolved_tags) {
        match registry.apply_upsert(id, tag, patch) {
            UpsertOutcome::Created => summary.created.push(id.clone()),
            UpsertOutcome::Populated => summary.populated.push(id.clone()),
            UpsertOutcome::Updated => summary.updated += 1,
        }
    }

    let deletions = delta.entries.iter().filter_map(|entry| match entry {
        DeltaEntry::Delete { id } => Some(id),
        DeltaEntry::Upsert { .. } => None,
    });
    summary.deleted = registry.remove_all(deletions);

    debug_assert!(
        registry.dangling_references().is_empty(),
        "delta left dangling references"
    );
    debug!(
        created = summary.created.len(),
        populated = summary.populated.len(),
        updated = summary.updated,
        deleted = summary.deleted.len(),
        "delta applied"
    );

    Ok(summary)
}
