//! Pirates: crews and ships sail a tile grid, dig for gold and fight over
//! merchant ports.
mod game;
mod player;
mod port;
mod tile;
mod unit;

use game_state::{FieldKind, SchemaTable, TypeSchema};

pub use game::Game;
pub use player::Player;
pub use port::{Port, PortActions, Spawn};
pub use tile::{Direction, Tile};
pub use unit::{AttackTarget, Unit, UnitActions};

use crate::view::game_object_schema;

pub const GAME_NAME: &str = "Pirates";

/// Declared fields for every Pirates class.
///
/// The table stays dynamic so fields added by newer servers are accepted as
/// untyped values instead of ending the session.
pub fn schema() -> SchemaTable {
    let base = game_object_schema();
    let player = || FieldKind::reference("Player");
    let tile = || FieldKind::reference("Tile");

    SchemaTable::dynamic(GAME_NAME)
        .with(base.clone())
        .with(
            TypeSchema::new("Game")
                .field("bury_interest_rate", FieldKind::Float)
                .field("crew_cost", FieldKind::Int)
                .field("crew_damage", FieldKind::Int)
                .field("crew_health", FieldKind::Int)
                .field("crew_moves", FieldKind::Int)
                .field("crew_range", FieldKind::Float)
                .field("current_player", player())
                .field("current_turn", FieldKind::Int)
                .field("heal_factor", FieldKind::Float)
                .field("map_height", FieldKind::Int)
                .field("map_width", FieldKind::Int)
                .field("max_turns", FieldKind::Int)
                .field("merchant_gold_rate", FieldKind::Float)
                .field("merchant_interest_rate", FieldKind::Float)
                .field("min_interest_distance", FieldKind::Float)
                .field("players", FieldKind::list_of(player()))
                .field("ports", FieldKind::list_of(FieldKind::reference("Port")))
                .field("rest_range", FieldKind::Float)
                .field("session", FieldKind::String)
                .field("ship_cost", FieldKind::Int)
                .field("ship_damage", FieldKind::Int)
                .field("ship_health", FieldKind::Int)
                .field("ship_moves", FieldKind::Int)
                .field("ship_range", FieldKind::Float)
                .field("tiles", FieldKind::list_of(tile()))
                .field("time_added_per_turn", FieldKind::Int)
                .field("units", FieldKind::list_of(FieldKind::reference("Unit"))),
        )
        .with(
            TypeSchema::new("Player")
                .extends(&base)
                .field("client_type", FieldKind::String)
                .field("gold", FieldKind::Int)
                .field("infamy", FieldKind::Int)
                .field("lost", FieldKind::Bool)
                .field("name", FieldKind::String)
                .field("opponent", player())
                .field("port", FieldKind::reference("Port"))
                .field("reason_lost", FieldKind::String)
                .field("reason_won", FieldKind::String)
                .field("time_remaining", FieldKind::Float)
                .field("units", FieldKind::list_of(FieldKind::reference("Unit")))
                .field("won", FieldKind::Bool),
        )
        .with(
            TypeSchema::new("Tile")
                .extends(&base)
                .field("decoration", FieldKind::Bool)
                .field("gold", FieldKind::Int)
                .field("port", FieldKind::reference("Port"))
                .field("tile_east", tile())
                .field("tile_north", tile())
                .field("tile_south", tile())
                .field("tile_west", tile())
                .field("type", FieldKind::String)
                .field("unit", FieldKind::reference("Unit"))
                .field("x", FieldKind::Int)
                .field("y", FieldKind::Int),
        )
        .with(
            TypeSchema::new("Unit")
                .extends(&base)
                .field("acted", FieldKind::Bool)
                .field("crew", FieldKind::Int)
                .field("crew_health", FieldKind::Int)
                .field("gold", FieldKind::Int)
                .field("moves", FieldKind::Int)
                .field("owner", player())
                .field("path", FieldKind::list_of(tile()))
                .field("ship_health", FieldKind::Int)
                .field("stun_turns", FieldKind::Int)
                .field("target_port", FieldKind::reference("Port"))
                .field("tile", tile()),
        )
        .with(
            TypeSchema::new("Port")
                .extends(&base)
                .field("gold", FieldKind::Int)
                .field("investment", FieldKind::Int)
                .field("owner", player())
                .field("tile", tile()),
        )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use game_state::{AttributePatch, AttributePatches, Delta, Registry, Value, apply_delta};

    use super::schema;

    fn patch(fields: Vec<(&str, Value)>) -> AttributePatches {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_owned(), AttributePatch::Set(value)))
            .collect()
    }

    fn id(raw: &str) -> Value {
        Value::Ref(raw.into())
    }

    /// A 2x2 map: ship "u1" on tile "t00", merchant port "p1" on tile "t11".
    ///
    /// ```text
    /// t00 t10
    /// t01 t11
    /// ```
    pub fn registry() -> Registry {
        let mut registry = Registry::new(Arc::new(schema()));
        // Neighbours in east, south, west, north order.
        let tile = |x: i64, y: i64, [east, south, west, north]: [Option<&str>; 4]| {
            let link = |target: Option<&str>| target.map_or(Value::Null, id);
            patch(vec![
                ("x", Value::from(x)),
                ("y", Value::from(y)),
                ("type", Value::from("water")),
                ("tile_east", link(east)),
                ("tile_south", link(south)),
                ("tile_west", link(west)),
                ("tile_north", link(north)),
            ])
        };

        let delta = Delta::new()
            .upsert(
                "game",
                Some("Game"),
                patch(vec![
                    ("map_width", Value::from(2)),
                    ("map_height", Value::from(2)),
                    ("current_turn", Value::from(7)),
                    ("current_player", id("0")),
                    ("players", Value::List(vec![id("0"), id("1")])),
                    ("tiles", Value::List(vec![id("t00"), id("t10"), id("t01"), id("t11")])),
                    ("units", Value::List(vec![id("u1")])),
                    ("ports", Value::List(vec![id("p1")])),
                ]),
            )
            .upsert(
                "0",
                Some("Player"),
                patch(vec![
                    ("name", Value::from("Blackbeard")),
                    ("gold", Value::from(600)),
                    ("infamy", Value::from(3)),
                    ("opponent", id("1")),
                    ("units", Value::List(vec![id("u1")])),
                ]),
            )
            .upsert(
                "1",
                Some("Player"),
                patch(vec![("name", Value::from("Anne")), ("opponent", id("0"))]),
            )
            .upsert("t00", Some("Tile"), tile(0, 0, [Some("t10"), Some("t01"), None, None]))
            .upsert("t10", Some("Tile"), tile(1, 0, [None, Some("t11"), Some("t00"), None]))
            .upsert("t01", Some("Tile"), tile(0, 1, [Some("t11"), None, None, Some("t00")]))
            .upsert("t11", Some("Tile"), tile(1, 1, [None, None, Some("t01"), Some("t10")]))
            .upsert(
                "u1",
                Some("Unit"),
                patch(vec![
                    ("owner", id("0")),
                    ("tile", id("t00")),
                    ("crew", Value::from(4)),
                    ("crew_health", Value::from(16)),
                    ("ship_health", Value::from(20)),
                    ("moves", Value::from(3)),
                    ("path", Value::List(vec![id("t10"), id("t11")])),
                ]),
            )
            .upsert(
                "p1",
                Some("Port"),
                patch(vec![
                    ("tile", id("t11")),
                    ("owner", Value::Null),
                    ("investment", Value::from(150)),
                ]),
            )
            .upsert(
                "t00",
                None,
                patch(vec![("unit", id("u1")), ("gold", Value::from(25))]),
            )
            .upsert("t11", None, patch(vec![("port", id("p1"))]));

        apply_delta(&mut registry, &delta).expect("fixture delta should apply");
        registry
    }
}

#[cfg(test)]
mod tests {
    use game_state::{FieldKind, TypeTag};

    use super::*;

    #[test]
    fn declares_inherited_fields() {
        let schema = schema();
        for tag in ["Player", "Tile", "Unit", "Port"] {
            assert_eq!(
                schema.field_kind(&TypeTag::new(tag), "logs").unwrap(),
                &FieldKind::list_of(FieldKind::String)
            );
        }
        assert_eq!(
            schema.field_kind(&TypeTag::new("Unit"), "tile").unwrap(),
            &FieldKind::reference("Tile")
        );
    }

    #[test]
    fn tolerates_fields_it_does_not_know() {
        let schema = schema();
        assert!(schema.is_dynamic());
        assert_eq!(
            schema.field_kind(&TypeTag::new("Unit"), "parrot").unwrap(),
            &FieldKind::Any
        );
    }

    #[test]
    fn fixture_applies_cleanly() {
        let registry = fixtures::registry();
        assert!(registry.dangling_references().is_empty());
    }
}
