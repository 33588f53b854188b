//! Classes for the games this client knows about.
//!
//! Each game module exposes a `schema()` table for the
//! [`Session`](runtime::Session) plus typed views over the registry and
//! wrappers around the actions the server accepts:
//! - [`pirates`] covers the full class set (Game, Player, Tile, Unit, Port)
//! - [`anarchy`] covers warehouses and their `ignite` bribe
//! - [`chess`] covers the game record and players
//!
//! Views borrow the [`Registry`](game_state::Registry), so they only live
//! inside [`World::read`](runtime::World::read). Action wrappers own ids and
//! can be awaited from `run_turn`.
pub mod anarchy;
pub mod chess;
pub mod pirates;
pub mod view;

use game_state::SchemaTable;
use strum::{Display, EnumIter, EnumString};

pub use view::{GameObject, GameObjectActions, View, all, cast};

/// Games with bundled classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum GameKind {
    Pirates,
    Anarchy,
    Chess,
}

impl GameKind {
    pub fn schema(self) -> SchemaTable {
        match self {
            GameKind::Pirates => pirates::schema(),
            GameKind::Anarchy => anarchy::schema(),
            GameKind::Chess => chess::schema(),
        }
    }
}

/// Schema table for `game`, matched case-insensitively against the bundled
/// games. `None` means the client should fall back to a dynamic table.
pub fn schema_for(game: &str) -> Option<SchemaTable> {
    game.parse::<GameKind>().ok().map(GameKind::schema)
}
