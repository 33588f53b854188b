//! Exclusive owner of every live entity.
//!
//! References between entities are stored as [`EntityId`]s and resolved on
//! demand, so cycles (tiles pointing at their neighbours and back) need no
//! special handling. The registry keeps one invariant at all times: every
//! reference it holds names a live entity or is `Null`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::delta::{AttributePatch, AttributePatches};
use crate::error::{Result, StateError};
use crate::schema::SchemaTable;
use crate::value::{EntityId, TypeTag, Value};

/// One node of the object graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    type_tag: Option<TypeTag>,
    attributes: BTreeMap<String, Value>,
}

impl Entity {
    fn placeholder(id: EntityId) -> Self {
        Self {
            id,
            type_tag: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// `None` until the server has sent the entity's creation.
    pub fn type_tag(&self) -> Option<&TypeTag> {
        self.type_tag.as_ref()
    }

    /// True for an entity only known as the target of a forward reference.
    pub fn is_placeholder(&self) -> bool {
        self.type_tag.is_none()
    }

    pub fn is_a(&self, tag: &str) -> bool {
        self.type_tag.as_ref().is_some_and(|t| t.as_str() == tag)
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// What an upsert did to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was unknown before.
    Created,
    /// A placeholder received its type tag.
    Populated,
    /// An existing entity was patched.
    Updated,
}

/// A reference whose target is not live. Never present in a consistent registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DanglingReference {
    pub from: EntityId,
    pub attribute: String,
    pub target: EntityId,
}

/// Id-keyed store of all live entities for one game.
#[derive(Clone, Debug)]
pub struct Registry {
    schema: Arc<SchemaTable>,
    entities: HashMap<EntityId, Entity>,
    deleted: HashSet<EntityId>,
}

impl Registry {
    pub fn new(schema: Arc<SchemaTable>) -> Self {
        Self {
            schema,
            entities: HashMap::new(),
            deleted: HashSet::new(),
        }
    }

    pub fn schema(&self) -> &SchemaTable {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Whether `id` was removed by an earlier delta.
    pub fn is_deleted(&self, id: &EntityId) -> bool {
        self.deleted.contains(id)
    }

    /// Pure lookup; never creates.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Every live entity whose type tag is `tag`, in id order.
    pub fn of_type<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        let mut matching: Vec<&Entity> = self.entities.values().filter(|e| e.is_a(tag)).collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        matching.into_iter()
    }

    /// Dereferences a reference value.
    ///
    /// `Null` (and any non-reference value) yields `None`; this is the absent
    /// relation, not an error. So does a reference to an id that is not live.
    pub fn resolve_ref(&self, value: &Value) -> Option<&Entity> {
        let id = value.as_entity()?;
        let entity = self.entities.get(id);
        if entity.is_none() {
            trace!(%id, "reference to an entity that is not live");
        }
        entity
    }

    /// Follows `attribute` of entity `id`.
    pub fn follow(&self, id: &EntityId, attribute: &str) -> Option<&Entity> {
        self.resolve_ref(self.get(id)?.get(attribute)?)
    }

    /// Creates or patches one entity, validating it against the schema first.
    ///
    /// Referenced ids that are not live yet become placeholders.
    pub fn upsert(
        &mut self,
        id: &EntityId,
        type_tag: Option<&TypeTag>,
        patch: &AttributePatches,
    ) -> Result<UpsertOutcome> {
        let tag = self.check_upsert(id, type_tag, patch)?;
        Ok(self.apply_upsert(id, tag, patch))
    }

    /// Removes `id` and nulls every reference to it. Returns false if it was not live.
    pub fn delete(&mut self, id: &EntityId) -> bool {
        !self.remove_all(std::iter::once(id)).is_empty()
    }

    /// Lists references whose target is missing. Empty for a consistent registry.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for entity in self.entities.values() {
            for (attribute, value) in &entity.attributes {
                value.for_each_ref(&mut |target| {
                    if !self.entities.contains_key(target) {
                        dangling.push(DanglingReference {
                            from: entity.id.clone(),
                            attribute: attribute.clone(),
                            target: target.clone(),
                        });
                    }
                });
            }
        }
        dangling
    }

    /// Validates an upsert without touching the registry.
    ///
    /// Returns the type tag the entity will carry afterwards.
    pub(crate) fn check_upsert(
        &self,
        id: &EntityId,
        requested: Option<&TypeTag>,
        patch: &AttributePatches,
    ) -> Result<Option<TypeTag>> {
        if self.deleted.contains(id) {
            return Err(StateError::DeletedEntity { id: id.clone() });
        }

        let existing = self.entities.get(id).and_then(|e| e.type_tag.as_ref());
        if let (Some(existing), Some(requested)) = (existing, requested)
            && existing != requested
        {
            return Err(StateError::TypeConflict {
                id: id.clone(),
                existing: existing.clone(),
                requested: requested.clone(),
            });
        }

        let tag = requested.or(existing);
        if let Some(tag) = tag {
            self.schema.ensure_known(tag)?;
        }

        // A placeholder receiving its type: attributes it picked up while
        // untyped must fit that type too.
        if existing.is_none()
            && let (Some(tag), Some(placeholder)) = (tag, self.entities.get(id))
        {
            for (attribute, value) in &placeholder.attributes {
                let replaced = matches!(
                    patch.get(attribute),
                    Some(AttributePatch::Set(_) | AttributePatch::Remove)
                );
                if !replaced {
                    self.check_value(tag, attribute, value)?;
                }
            }
        }

        for (attribute, change) in patch {
            if let Some(tag) = tag {
                self.check_change(tag, attribute, change)?;
            }

            let mut deleted_target = None;
            change.for_each_ref(&mut |target| {
                if deleted_target.is_none() && self.deleted.contains(target) {
                    deleted_target = Some(target.clone());
                }
            });
            if let Some(target) = deleted_target {
                return Err(StateError::DanglingReference {
                    from: id.clone(),
                    attribute: attribute.clone(),
                    target,
                });
            }
        }

        Ok(tag.cloned())
    }

    fn check_change(&self, tag: &TypeTag, attribute: &str, change: &AttributePatch) -> Result<()> {
        match change {
            AttributePatch::Set(value) => self.check_value(tag, attribute, value),
            AttributePatch::Remove => self.schema.field_kind(tag, attribute).map(|_| ()),
            AttributePatch::MergeEntries(entries) => {
                let kind = self.schema.field_kind(tag, attribute)?;
                let inner = kind.map_values().ok_or_else(|| StateError::NotAMap {
                    tag: tag.clone(),
                    attribute: attribute.to_owned(),
                })?;
                match entries.values().flatten().find(|value| !inner.accepts(value)) {
                    Some(value) => Err(mismatch(tag, attribute, inner.to_string(), value)),
                    None => Ok(()),
                }
            }
        }
    }

    fn check_value(&self, tag: &TypeTag, attribute: &str, value: &Value) -> Result<()> {
        let kind = self.schema.field_kind(tag, attribute)?;
        if kind.accepts(value) {
            Ok(())
        } else {
            Err(mismatch(tag, attribute, kind.to_string(), value))
        }
    }

    /// Applies an upsert that already passed [`Registry::check_upsert`].
    pub(crate) fn apply_upsert(
        &mut self,
        id: &EntityId,
        tag: Option<TypeTag>,
        patch: &AttributePatches,
    ) -> UpsertOutcome {
        let schema = Arc::clone(&self.schema);
        let mut outcome = UpsertOutcome::Updated;

        let entity = self.entities.entry(id.clone()).or_insert_with(|| {
            outcome = UpsertOutcome::Created;
            Entity::placeholder(id.clone())
        });

        if entity.type_tag.is_none()
            && let Some(tag) = tag
        {
            // Keep anything patched while the type was still unknown.
            for (name, value) in schema.defaults(&tag) {
                entity.attributes.entry(name).or_insert(value);
            }
            entity.type_tag = Some(tag);
            if outcome == UpsertOutcome::Updated {
                outcome = UpsertOutcome::Populated;
            }
        }

        let mut targets = Vec::new();
        for (attribute, change) in patch {
            change.for_each_ref(&mut |target| targets.push(target.clone()));
            match change {
                AttributePatch::Set(value) => {
                    entity.attributes.insert(attribute.clone(), value.clone());
                }
                AttributePatch::Remove => {
                    let reset = entity
                        .type_tag
                        .as_ref()
                        .and_then(|tag| schema.get(tag))
                        .and_then(|shape| shape.field_kind(attribute))
                        .map(|kind| kind.default_value());
                    match reset {
                        Some(default) => {
                            entity.attributes.insert(attribute.clone(), default);
                        }
                        None => {
                            entity.attributes.remove(attribute);
                        }
                    }
                }
                AttributePatch::MergeEntries(entries) => {
                    let slot = entity
                        .attributes
                        .entry(attribute.clone())
                        .or_insert_with(|| Value::Map(BTreeMap::new()));
                    if !matches!(slot, Value::Map(_)) {
                        *slot = Value::Map(BTreeMap::new());
                    }
                    if let Value::Map(map) = slot {
                        for (key, value) in entries {
                            match value {
                                Some(value) => {
                                    map.insert(key.clone(), value.clone());
                                }
                                None => {
                                    map.remove(key);
                                }
                            }
                        }
                    }
                }
            }
        }

        for target in targets {
            if !self.entities.contains_key(&target) {
                trace!(%target, referrer = %id, "materializing placeholder");
                self.entities.insert(target.clone(), Entity::placeholder(target));
            }
        }

        outcome
    }

    /// Removes every listed id, then nulls all references to them in one pass.
    ///
    /// Returns the ids that were actually live.
    pub(crate) fn remove_all<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a EntityId>,
    ) -> Vec<EntityId> {
        let mut removed = Vec::new();
        for id in ids {
            if self.entities.remove(id).is_some() {
                removed.push(id.clone());
            } else if self.deleted.contains(id) {
                warn!(%id, "entity deleted twice");
            } else {
                warn!(%id, "deleting an entity that was never seen");
            }
            self.deleted.insert(id.clone());
        }

        if removed.is_empty() {
            return removed;
        }

        let gone: HashSet<EntityId> = removed.iter().cloned().collect();
        let mut scrubbed = 0;
        for entity in self.entities.values_mut() {
            for value in entity.attributes.values_mut() {
                scrubbed += value.scrub_refs(&gone);
            }
        }
        trace!(removed = removed.len(), scrubbed, "entities removed");

        removed
    }
}

fn mismatch(tag: &TypeTag, attribute: &str, expected: String, found: &Value) -> StateError {
    StateError::TypeMismatch {
        tag: tag.clone(),
        attribute: attribute.to_owned(),
        expected,
        found: found.kind_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, TypeSchema};

    fn registry() -> Registry {
        let schema = SchemaTable::new("Test")
            .with(
                TypeSchema::new("Tile")
                    .field("x", FieldKind::Int)
                    .field("y", FieldKind::Int)
                    .field("tile_east", FieldKind::reference("Tile"))
                    .field("unit", FieldKind::reference("Unit")),
            )
            .with(
                TypeSchema::new("Unit")
                    .field("tile", FieldKind::reference("Tile"))
                    .field("path", FieldKind::list_of(FieldKind::reference("Tile")))
                    .field("gold", FieldKind::Int),
            );
        Registry::new(Arc::new(schema))
    }

    fn patch(entries: &[(&str, Value)]) -> AttributePatches {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), AttributePatch::Set(value.clone())))
            .collect()
    }

    #[test]
    fn forward_reference_creates_placeholder() {
        let mut registry = registry();
        let tile = TypeTag::new("Tile");

        let outcome = registry
            .upsert(
                &"t1".into(),
                Some(&tile),
                &patch(&[("x", 0.into()), ("tile_east", EntityId::new("t2").into())]),
            )
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Created);
        let east = registry.follow(&"t1".into(), "tile_east").unwrap();
        assert!(east.is_placeholder());
        assert_eq!(east.attributes().count(), 0);

        let outcome = registry
            .upsert(&"t2".into(), Some(&tile), &patch(&[("x", 1.into())]))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Populated);

        let east = registry.follow(&"t1".into(), "tile_east").unwrap();
        assert!(east.is_a("Tile"));
        assert_eq!(east.get("x"), Some(&Value::Int(1)));
        assert_eq!(east.get("y"), Some(&Value::Int(0)));
    }

    #[test]
    fn delete_scrubs_references_and_keeps_other_attributes() {
        let mut registry = registry();
        let tile = TypeTag::new("Tile");
        let unit = TypeTag::new("Unit");
        registry
            .upsert(&"t1".into(), Some(&tile), &patch(&[("x", 4.into())]))
            .unwrap();
        registry
            .upsert(
                &"u1".into(),
                Some(&unit),
                &patch(&[
                    ("tile", EntityId::new("t1").into()),
                    ("path", vec![EntityId::new("t1")].into()),
                    ("gold", 7.into()),
                ]),
            )
            .unwrap();

        assert!(registry.delete(&"t1".into()));

        let u1 = registry.get(&"u1".into()).unwrap();
        assert_eq!(u1.get("tile"), Some(&Value::Null));
        assert_eq!(u1.get("path"), Some(&Value::List(vec![Value::Null])));
        assert_eq!(u1.get("gold"), Some(&Value::Int(7)));
        assert!(registry.is_deleted(&"t1".into()));
        assert!(registry.dangling_references().is_empty());
    }

    #[test]
    fn schema_mismatch_leaves_registry_untouched() {
        let mut registry = registry();
        let err = registry
            .upsert(
                &"t1".into(),
                Some(&TypeTag::new("Tile")),
                &patch(&[("x", "west".into())]),
            )
            .unwrap_err();

        assert!(matches!(err, StateError::TypeMismatch { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let registry = registry();
        assert!(registry.resolve_ref(&Value::Ref("ghost".into())).is_none());
        assert!(registry.resolve_ref(&Value::Null).is_none());
        assert!(registry.follow(&"ghost".into(), "tile_east").is_none());
    }

    #[test]
    fn placeholder_attributes_are_checked_once_typed() {
        let mut registry = registry();
        let tile = TypeTag::new("Tile");
        registry
            .upsert(
                &"t1".into(),
                Some(&tile),
                &patch(&[("tile_east", EntityId::new("t2").into())]),
            )
            .unwrap();
        registry
            .upsert(&"t2".into(), None, &patch(&[("x", "oops".into())]))
            .unwrap();

        let err = registry
            .upsert(&"t2".into(), Some(&tile), &patch(&[("y", 1.into())]))
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::TypeMismatch { ref attribute, found: "string", .. } if attribute == "x"
        ));
        let t2 = registry.get(&"t2".into()).unwrap();
        assert!(t2.is_placeholder());
        assert_eq!(t2.get("y"), None);

        // Overwriting the stray value in the same upsert is fine.
        let outcome = registry
            .upsert(&"t2".into(), Some(&tile), &patch(&[("x", 3.into())]))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Populated);
    }

    #[test]
    fn undeclared_placeholder_attributes_are_rejected_once_typed() {
        let mut registry = registry();
        registry
            .upsert(&"u1".into(), None, &patch(&[("banner", "red".into())]))
            .unwrap();

        let err = registry
            .upsert(&"u1".into(), Some(&TypeTag::new("Unit")), &patch(&[]))
            .unwrap_err();
        assert!(matches!(err, StateError::UnknownAttribute { .. }));
    }

    #[test]
    fn type_tag_cannot_change() {
        let mut registry = registry();
        registry
            .upsert(&"a".into(), Some(&TypeTag::new("Tile")), &patch(&[]))
            .unwrap();

        let err = registry
            .upsert(&"a".into(), Some(&TypeTag::new("Unit")), &patch(&[]))
            .unwrap_err();
        assert!(matches!(err, StateError::TypeConflict { .. }));
    }

    #[test]
    fn deleted_ids_cannot_come_back_or_be_referenced() {
        let mut registry = registry();
        let tile = TypeTag::new("Tile");
        registry.upsert(&"t1".into(), Some(&tile), &patch(&[])).unwrap();
        registry.delete(&"t1".into());

        let err = registry
            .upsert(&"t1".into(), Some(&tile), &patch(&[]))
            .unwrap_err();
        assert!(err.is_consistency_violation());

        let err = registry
            .upsert(
                &"t2".into(),
                Some(&tile),
                &patch(&[("tile_east", EntityId::new("t1").into())]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            StateError::DanglingReference {
                from: "t2".into(),
                attribute: "tile_east".into(),
                target: "t1".into(),
            }
        );
    }

    #[test]
    fn remove_resets_declared_attributes_to_defaults() {
        let mut registry = registry();
        let unit = TypeTag::new("Unit");
        registry
            .upsert(&"u1".into(), Some(&unit), &patch(&[("gold", 9.into())]))
            .unwrap();

        let remove = AttributePatches::from([("gold".to_owned(), AttributePatch::Remove)]);
        registry.upsert(&"u1".into(), None, &remove).unwrap();

        assert_eq!(
            registry.get(&"u1".into()).unwrap().get("gold"),
            Some(&Value::Int(0))
        );
    }

    #[test]
    fn cyclic_references_resolve_both_ways() {
        let mut registry = registry();
        let tile = TypeTag::new("Tile");
        registry
            .upsert(
                &"a".into(),
                Some(&tile),
                &patch(&[("tile_east", EntityId::new("b").into())]),
            )
            .unwrap();
        registry
            .upsert(
                &"b".into(),
                Some(&tile),
                &patch(&[("tile_east", EntityId::new("a").into())]),
            )
            .unwrap();

        let a = EntityId::new("a");
        let round_trip = registry
            .follow(&a, "tile_east")
            .and_then(|b| registry.follow(b.id(), "tile_east"))
            .unwrap();
        assert_eq!(round_trip.id(), &a);
    }
}
