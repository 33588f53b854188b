//! Typed read-only views and the helpers shared by every game module.
//!
//! A view is a `(entity, registry)` pair. Scalar accessors fall back to the
//! field's default when the server has not sent it yet; reference accessors
//! return `None` for the none sentinel and for targets of another class.

use std::iter;

use game_state::{Entity, EntityId, FieldKind, Registry, TypeSchema, Value};
use runtime::{ProtocolError, Result, ServerHandle};

pub trait View<'r>: Sized + Copy {
    /// Type tag this view wraps.
    const TYPE: &'static str;

    fn wrap(entity: &'r Entity, registry: &'r Registry) -> Self;

    fn entity(&self) -> &'r Entity;

    fn registry(&self) -> &'r Registry;

    /// Whether `entity` can be seen through this view.
    fn accepts(entity: &Entity) -> bool {
        entity.is_a(Self::TYPE)
    }

    fn id(&self) -> &'r EntityId {
        self.entity().id()
    }

    fn int(&self, attribute: &str) -> i64 {
        self.entity()
            .get(attribute)
            .and_then(Value::as_int)
            .unwrap_or_default()
    }

    fn float(&self, attribute: &str) -> f64 {
        self.entity()
            .get(attribute)
            .and_then(Value::as_float)
            .unwrap_or_default()
    }

    fn flag(&self, attribute: &str) -> bool {
        self.entity()
            .get(attribute)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }

    fn text(&self, attribute: &str) -> &'r str {
        self.entity()
            .get(attribute)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn texts(&self, attribute: &str) -> Vec<String> {
        self.entity()
            .get(attribute)
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    }

    fn related<V: View<'r>>(&self, attribute: &str) -> Option<V> {
        let target = self.entity().get(attribute)?.as_entity()?;
        cast(self.registry(), target)
    }

    /// Live members of a list of references. Nulled slots are skipped.
    fn related_list<V: View<'r>>(&self, attribute: &str) -> Vec<V> {
        let registry = self.registry();
        self.entity()
            .get(attribute)
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_entity)
            .filter_map(|id| cast(registry, id))
            .collect()
    }
}

/// Looks `id` up and wraps it as `V` if it is live and of the right class.
pub fn cast<'r, V: View<'r>>(registry: &'r Registry, id: &EntityId) -> Option<V> {
    registry
        .get(id)
        .filter(|entity| V::accepts(entity))
        .map(|entity| V::wrap(entity, registry))
}

/// Every live entity visible as `V`.
pub fn all<'r, V: View<'r>>(registry: &'r Registry) -> impl Iterator<Item = V> + 'r {
    registry
        .iter()
        .filter(|entity| V::accepts(entity))
        .map(move |entity| V::wrap(entity, registry))
}

/// Declares a view struct for one type tag.
macro_rules! view {
    ($(#[$meta:meta])* $name:ident => $tag:literal $(, accepts = $accepts:path)?) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name<'r> {
            entity: &'r ::game_state::Entity,
            registry: &'r ::game_state::Registry,
        }

        impl<'r> $crate::view::View<'r> for $name<'r> {
            const TYPE: &'static str = $tag;

            fn wrap(
                entity: &'r ::game_state::Entity,
                registry: &'r ::game_state::Registry,
            ) -> Self {
                Self { entity, registry }
            }

            fn entity(&self) -> &'r ::game_state::Entity {
                self.entity
            }

            fn registry(&self) -> &'r ::game_state::Registry {
                self.registry
            }

            $(
                fn accepts(entity: &::game_state::Entity) -> bool {
                    $accepts(entity)
                }
            )?
        }
    };
}

pub(crate) use view;

/// Fields every generated class inherits.
pub fn game_object_schema() -> TypeSchema {
    TypeSchema::new("GameObject")
        .field("id", FieldKind::String)
        .field("game_object_name", FieldKind::String)
        .field("logs", FieldKind::list_of(FieldKind::String))
}

view!(
    /// Any described entity, whatever its class.
    GameObject => "GameObject", accepts = is_described
);

fn is_described(entity: &Entity) -> bool {
    !entity.is_placeholder()
}

impl<'r> GameObject<'r> {
    pub fn name(&self) -> &'r str {
        self.entity
            .type_tag()
            .map(|tag| tag.as_str())
            .unwrap_or_default()
    }

    pub fn logs(&self) -> Vec<String> {
        self.texts("logs")
    }

    pub fn actions<'s>(&self, server: &'s ServerHandle) -> GameObjectActions<'s> {
        GameObjectActions::new(server, self.id().clone())
    }
}

/// Actions every game object accepts.
#[derive(Clone, Debug)]
pub struct GameObjectActions<'s> {
    server: &'s ServerHandle,
    id: EntityId,
}

impl<'s> GameObjectActions<'s> {
    pub fn new(server: &'s ServerHandle, id: EntityId) -> Self {
        Self { server, id }
    }

    /// Adds `message` to the object's `logs`, visible in the visualizer.
    pub async fn log(&self, message: &str) -> Result<()> {
        let reply = self
            .server
            .call(&self.id, "log", [("message", Value::from(message))])
            .await?;
        returned_nothing("log", reply)
    }
}

pub(crate) fn no_args() -> iter::Empty<(&'static str, Value)> {
    iter::empty()
}

fn unexpected(action: &str, expected: &'static str, found: &Value) -> runtime::ClientError {
    ProtocolError::UnexpectedReturn {
        action: action.to_owned(),
        expected,
        found: found.kind_name(),
    }
    .into()
}

pub(crate) fn returned_bool(action: &str, reply: Value) -> Result<bool> {
    reply
        .as_bool()
        .ok_or_else(|| unexpected(action, "bool", &reply))
}

pub(crate) fn returned_int(action: &str, reply: Value) -> Result<i64> {
    reply
        .as_int()
        .ok_or_else(|| unexpected(action, "int", &reply))
}

pub(crate) fn returned_nothing(action: &str, reply: Value) -> Result<()> {
    if reply.is_null() {
        Ok(())
    } else {
        Err(unexpected(action, "null", &reply))
    }
}
