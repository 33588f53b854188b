//! Chess: the server owns the board; clients read the FEN and move history.
use game_state::{EntityId, FieldKind, Registry, SchemaTable, TypeSchema};

use crate::view::{View, cast, game_object_schema, view};

pub const GAME_NAME: &str = "Chess";

pub fn schema() -> SchemaTable {
    let base = game_object_schema();
    SchemaTable::dynamic(GAME_NAME)
        .with(base.clone())
        .with(
            TypeSchema::new("Game")
                .field("fen", FieldKind::String)
                .field("history", FieldKind::list_of(FieldKind::String))
                .field("players", FieldKind::list_of(FieldKind::reference("Player")))
                .field("session", FieldKind::String),
        )
        .with(
            TypeSchema::new("Player")
                .extends(&base)
                .field("client_type", FieldKind::String)
                .field("color", FieldKind::String)
                .field("lost", FieldKind::Bool)
                .field("name", FieldKind::String)
                .field("opponent", FieldKind::reference("Player"))
                .field("reason_lost", FieldKind::String)
                .field("reason_won", FieldKind::String)
                .field("time_remaining", FieldKind::Float)
                .field("won", FieldKind::Bool),
        )
}

view!(Game => "Game");

impl<'r> Game<'r> {
    pub fn root(registry: &'r Registry) -> Option<Self> {
        cast(registry, &EntityId::game())
    }

    /// Board in Forsyth-Edwards Notation.
    pub fn fen(&self) -> &'r str {
        self.text("fen")
    }

    /// Moves so far, in standard algebraic notation.
    pub fn history(&self) -> Vec<String> {
        self.texts("history")
    }

    pub fn players(&self) -> Vec<Player<'r>> {
        self.related_list("players")
    }

    pub fn session(&self) -> &'r str {
        self.text("session")
    }

    /// The side to move, read from the FEN's active color field.
    pub fn active_color(&self) -> Option<&'r str> {
        match self.fen().split_whitespace().nth(1)? {
            "w" => Some("white"),
            "b" => Some("black"),
            _ => None,
        }
    }
}

view!(Player => "Player");

impl<'r> Player<'r> {
    pub fn name(&self) -> &'r str {
        self.text("name")
    }

    /// `"white"` or `"black"`.
    pub fn color(&self) -> &'r str {
        self.text("color")
    }

    pub fn opponent(&self) -> Option<Player<'r>> {
        self.related("opponent")
    }

    pub fn won(&self) -> bool {
        self.flag("won")
    }

    pub fn lost(&self) -> bool {
        self.flag("lost")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use game_state::{AttributePatch, Delta, Value, apply_delta};

    use super::*;

    fn registry(history: Vec<&str>) -> Registry {
        let mut registry = Registry::new(Arc::new(schema()));
        let delta = Delta::new()
            .upsert(
                EntityId::GAME,
                Some("Game"),
                [
                    (
                        "fen".to_owned(),
                        AttributePatch::Set(Value::from(
                            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
                        )),
                    ),
                    ("history".to_owned(), AttributePatch::Set(Value::from(history))),
                    (
                        "players".to_owned(),
                        AttributePatch::Set(Value::List(vec![Value::Ref("0".into())])),
                    ),
                ]
                .into_iter()
                .collect(),
            )
            .upsert(
                "0",
                Some("Player"),
                [("color".to_owned(), AttributePatch::Set(Value::from("white")))]
                    .into_iter()
                    .collect(),
            );
        apply_delta(&mut registry, &delta).unwrap();
        registry
    }

    #[test]
    fn reads_history_in_order() {
        let registry = registry(vec!["e4"]);
        let game = Game::root(&registry).unwrap();
        assert_eq!(game.history(), vec!["e4".to_owned()]);
        assert_eq!(game.active_color(), Some("black"));
        assert_eq!(game.players()[0].color(), "white");
    }

    #[test]
    fn empty_history_before_first_move() {
        let registry = registry(Vec::new());
        let game = Game::root(&registry).unwrap();
        assert!(game.history().is_empty());
    }
}
