//! Per-game attribute shapes keyed by type tag.
//!
//! Generated classes differ only in which attributes they expose. Rather than
//! modelling an inheritance chain, each [`TypeSchema`] lists the full set of
//! fields its type carries (base fields included via [`TypeSchema::extends`]),
//! and the [`Registry`](crate::Registry) consults the [`SchemaTable`] when it
//! creates or patches an entity.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{Result, StateError};
use crate::value::{TypeTag, Value};

static ANY_FIELD: FieldKind = FieldKind::Any;

/// Declared type of one attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    String,
    /// Optional reference, with the class it points at when known.
    Ref(Option<TypeTag>),
    List(Box<FieldKind>),
    Map(Box<FieldKind>),
    /// Accepts any value. Used by dynamic tables and untyped fields.
    Any,
}

impl FieldKind {
    pub fn reference(target: &str) -> Self {
        FieldKind::Ref(Some(TypeTag::new(target)))
    }

    pub fn list_of(inner: FieldKind) -> Self {
        FieldKind::List(Box::new(inner))
    }

    pub fn map_of(inner: FieldKind) -> Self {
        FieldKind::Map(Box::new(inner))
    }

    /// Value a freshly created entity holds before the server sets the field.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Int => Value::Int(0),
            FieldKind::Float => Value::Float(0.0),
            FieldKind::String => Value::String(String::new()),
            FieldKind::Ref(_) | FieldKind::Any => Value::Null,
            FieldKind::List(_) => Value::List(Vec::new()),
            FieldKind::Map(_) => Value::Map(BTreeMap::new()),
        }
    }

    /// Whether `value` fits this field. `Null` only fits references.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Any, _) => true,
            (FieldKind::Bool, Value::Bool(_)) => true,
            (FieldKind::Int, Value::Int(_)) => true,
            (FieldKind::Float, Value::Float(_) | Value::Int(_)) => true,
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Ref(_), Value::Ref(_) | Value::Null) => true,
            (FieldKind::List(inner), Value::List(items)) => items.iter().all(|v| inner.accepts(v)),
            (FieldKind::Map(inner), Value::Map(entries)) => {
                entries.values().all(|v| inner.accepts(v))
            }
            _ => false,
        }
    }

    /// Kind of the values stored inside a map field.
    pub fn map_values(&self) -> Option<&FieldKind> {
        match self {
            FieldKind::Map(inner) => Some(inner),
            FieldKind::Any => Some(&ANY_FIELD),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bool => f.write_str("bool"),
            FieldKind::Int => f.write_str("int"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::String => f.write_str("string"),
            FieldKind::Ref(Some(target)) => write!(f, "ref<{target}>"),
            FieldKind::Ref(None) => f.write_str("ref"),
            FieldKind::List(inner) => write!(f, "list<{inner}>"),
            FieldKind::Map(inner) => write!(f, "map<{inner}>"),
            FieldKind::Any => f.write_str("any"),
        }
    }
}

/// Field shape of one generated class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSchema {
    tag: TypeTag,
    fields: BTreeMap<String, FieldKind>,
}

impl TypeSchema {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: TypeTag::new(tag),
            fields: BTreeMap::new(),
        }
    }

    /// Copies every field of `base`, so the new type exposes them too.
    pub fn extends(mut self, base: &TypeSchema) -> Self {
        self.fields
            .extend(base.fields.iter().map(|(name, kind)| (name.clone(), kind.clone())));
        self
    }

    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.insert(name.to_owned(), kind);
        self
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub fn field_kind(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), kind))
    }

    /// Attributes every entity of this type starts with.
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .map(|(name, kind)| (name.clone(), kind.default_value()))
            .collect()
    }
}

/// Type-tag → shape table for one game.
///
/// A strict table rejects unknown tags and attributes. A dynamic table (see
/// [`SchemaTable::dynamic`]) accepts anything, which lets a client connect to a
/// game it has no generated classes for.
#[derive(Clone, Debug, Default)]
pub struct SchemaTable {
    game: String,
    types: HashMap<TypeTag, TypeSchema>,
    dynamic: bool,
}

impl SchemaTable {
    pub fn new(game: &str) -> Self {
        Self {
            game: game.to_owned(),
            types: HashMap::new(),
            dynamic: false,
        }
    }

    pub fn dynamic(game: &str) -> Self {
        Self {
            dynamic: true,
            ..Self::new(game)
        }
    }

    pub fn with(mut self, schema: TypeSchema) -> Self {
        self.types.insert(schema.tag.clone(), schema);
        self
    }

    pub fn game(&self) -> &str {
        &self.game
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn get(&self, tag: &TypeTag) -> Option<&TypeSchema> {
        self.types.get(tag)
    }

    /// Declared kind of `tag.attribute`.
    ///
    /// Dynamic tables report [`FieldKind::Any`] for anything undeclared.
    pub fn field_kind(&self, tag: &TypeTag, attribute: &str) -> Result<&FieldKind> {
        match self.types.get(tag) {
            Some(schema) => match schema.field_kind(attribute) {
                Some(kind) => Ok(kind),
                None if self.dynamic => Ok(&ANY_FIELD),
                None => Err(StateError::UnknownAttribute {
                    tag: tag.clone(),
                    attribute: attribute.to_owned(),
                }),
            },
            None if self.dynamic => Ok(&ANY_FIELD),
            None => Err(StateError::UnknownType { tag: tag.clone() }),
        }
    }

    /// Checks that `tag` names a known class.
    pub fn ensure_known(&self, tag: &TypeTag) -> Result<()> {
        if self.dynamic || self.types.contains_key(tag) {
            Ok(())
        } else {
            Err(StateError::UnknownType { tag: tag.clone() })
        }
    }

    /// Initial attributes for a new entity of `tag`.
    pub fn defaults(&self, tag: &TypeTag) -> BTreeMap<String, Value> {
        self.types
            .get(tag)
            .map(TypeSchema::defaults)
            .unwrap_or_default()
    }
}
