//! Anarchy: players bribe buildings to burn down the other side's
//! headquarters. Only warehouses are wrapped; every other class is reachable
//! through [`GameObject`](crate::GameObject) or the raw registry.

use game_state::{Entity, EntityId, FieldKind, SchemaTable, TypeSchema, Value};
use runtime::{Result, ServerHandle};

use crate::view::{View, game_object_schema, returned_int, view};

pub const GAME_NAME: &str = "Anarchy";

/// Tags that extend `Building`.
const BUILDING_TAGS: [&str; 5] = [
    "Building",
    "Warehouse",
    "FireDepartment",
    "PoliceDepartment",
    "WeatherStation",
];

/// Declared fields for buildings and warehouses; other classes stay untyped.
pub fn schema() -> SchemaTable {
    let base = game_object_schema();
    let building = || FieldKind::reference("Building");
    let buildings = BUILDING_TAGS.iter().map(|tag| {
        TypeSchema::new(tag)
            .extends(&base)
            .field("bribed", FieldKind::Bool)
            .field("building_east", building())
            .field("building_north", building())
            .field("building_south", building())
            .field("building_west", building())
            .field("fire", FieldKind::Int)
            .field("health", FieldKind::Int)
            .field("is_headquarters", FieldKind::Bool)
            .field("owner", FieldKind::reference("Player"))
            .field("x", FieldKind::Int)
            .field("y", FieldKind::Int)
    });

    buildings.fold(SchemaTable::dynamic(GAME_NAME), |table, schema| {
        let schema = if schema.tag().as_str() == "Warehouse" {
            schema
                .field("exposure", FieldKind::Int)
                .field("fire_added", FieldKind::Int)
        } else {
            schema
        };
        table.with(schema)
    })
}

view!(
    /// Any building, whatever its specialisation.
    Building => "Building", accepts = is_building
);

fn is_building(entity: &Entity) -> bool {
    BUILDING_TAGS.iter().any(|tag| entity.is_a(tag))
}

impl<'r> Building<'r> {
    pub fn fire(&self) -> i64 {
        self.int("fire")
    }

    pub fn health(&self) -> i64 {
        self.int("health")
    }

    pub fn is_headquarters(&self) -> bool {
        self.flag("is_headquarters")
    }

    pub fn owner_id(&self) -> Option<&'r EntityId> {
        self.entity().get("owner")?.as_entity()
    }

    /// Manhattan distance, which is also the exposure an `ignite` costs.
    pub fn distance_to(&self, other: &Building<'_>) -> i64 {
        (self.int("x") - other.int("x")).abs() + (self.int("y") - other.int("y")).abs()
    }
}

view!(
    /// A building that can be bribed to set fires.
    Warehouse => "Warehouse"
);

impl<'r> Warehouse<'r> {
    /// Rises with every ignite and drops each turn it is left alone.
    pub fn exposure(&self) -> i64 {
        self.int("exposure")
    }

    /// Fire added to the target of an ignite.
    pub fn fire_added(&self) -> i64 {
        self.int("fire_added")
    }

    pub fn as_building(&self) -> Building<'r> {
        Building::wrap(self.entity(), self.registry())
    }

    pub fn actions<'s>(&self, server: &'s ServerHandle) -> WarehouseActions<'s> {
        WarehouseActions::new(server, self.id().clone())
    }
}

#[derive(Clone, Debug)]
pub struct WarehouseActions<'s> {
    server: &'s ServerHandle,
    warehouse: EntityId,
}

impl<'s> WarehouseActions<'s> {
    pub fn new(server: &'s ServerHandle, warehouse: EntityId) -> Self {
        Self { server, warehouse }
    }

    /// Bribes the warehouse to set `building` on fire.
    ///
    /// Returns the exposure added to the warehouse, or `-1` when the server
    /// refused the bribe.
    pub async fn ignite(&self, building: &EntityId) -> Result<i64> {
        let reply = self
            .server
            .call(&self.warehouse, "ignite", [("building", Value::from(building))])
            .await?;
        returned_int("ignite", reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use game_state::{AttributePatch, AttributePatches, Delta, Registry, TypeTag, apply_delta};

    use super::*;
    use crate::cast;

    fn patch(fields: Vec<(&str, Value)>) -> AttributePatches {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_owned(), AttributePatch::Set(value)))
            .collect()
    }

    fn registry() -> Registry {
        let mut registry = Registry::new(Arc::new(schema()));
        let delta = Delta::new()
            .upsert(
                "w",
                Some("Warehouse"),
                patch(vec![
                    ("x", Value::from(1)),
                    ("y", Value::from(1)),
                    ("exposure", Value::from(2)),
                    ("fire_added", Value::from(3)),
                    ("owner", Value::Ref("p".into())),
                ]),
            )
            .upsert(
                "hq",
                Some("FireDepartment"),
                patch(vec![
                    ("x", Value::from(4)),
                    ("y", Value::from(3)),
                    ("is_headquarters", Value::from(true)),
                ]),
            )
            .upsert("p", Some("Player"), patch(vec![("name", Value::from("Arsonist"))]));
        apply_delta(&mut registry, &delta).unwrap();
        registry
    }

    #[test]
    fn warehouses_expose_bribe_fields() {
        let registry = registry();
        let warehouse = cast::<Warehouse>(&registry, &EntityId::new("w")).unwrap();
        assert_eq!(warehouse.exposure(), 2);
        assert_eq!(warehouse.fire_added(), 3);
        assert_eq!(warehouse.as_building().owner_id().unwrap().as_str(), "p");
    }

    #[test]
    fn only_warehouses_declare_exposure() {
        let schema = schema();
        assert_eq!(
            schema.field_kind(&TypeTag::new("Warehouse"), "exposure").unwrap(),
            &FieldKind::Int
        );
        assert_eq!(
            schema.field_kind(&TypeTag::new("FireDepartment"), "exposure").unwrap(),
            &FieldKind::Any
        );
    }

    #[test]
    fn building_view_covers_subclasses() {
        let registry = registry();
        let warehouse = cast::<Warehouse>(&registry, &EntityId::new("w")).unwrap();
        let hq = cast::<Building>(&registry, &EntityId::new("hq")).unwrap();
        assert!(hq.is_headquarters());
        assert_eq!(warehouse.as_building().distance_to(&hq), 5);
        assert!(cast::<Building>(&registry, &EntityId::new("p")).is_none());
    }
}
