use game_state::{EntityId, Registry};

use super::{Player, Port, Tile, Unit};
use crate::view::{View, cast, view};

view!(
    /// The root entity: rules constants and the object lists.
    Game => "Game"
);

impl<'r> Game<'r> {
    /// The root game, once the first delta has described it.
    pub fn root(registry: &'r Registry) -> Option<Self> {
        cast(registry, &EntityId::game())
    }

    pub fn current_player(&self) -> Option<Player<'r>> {
        self.related("current_player")
    }

    pub fn current_turn(&self) -> i64 {
        self.int("current_turn")
    }

    pub fn max_turns(&self) -> i64 {
        self.int("max_turns")
    }

    pub fn map_width(&self) -> i64 {
        self.int("map_width")
    }

    pub fn map_height(&self) -> i64 {
        self.int("map_height")
    }

    pub fn players(&self) -> Vec<Player<'r>> {
        self.related_list("players")
    }

    pub fn ports(&self) -> Vec<Port<'r>> {
        self.related_list("ports")
    }

    pub fn tiles(&self) -> Vec<Tile<'r>> {
        self.related_list("tiles")
    }

    pub fn units(&self) -> Vec<Unit<'r>> {
        self.related_list("units")
    }

    pub fn crew_cost(&self) -> i64 {
        self.int("crew_cost")
    }

    pub fn ship_cost(&self) -> i64 {
        self.int("ship_cost")
    }

    pub fn rest_range(&self) -> f64 {
        self.float("rest_range")
    }

    /// Tile at `(x, y)`. Tiles are stored row by row.
    pub fn tile_at(&self, x: i64, y: i64) -> Option<Tile<'r>> {
        let (width, height) = (self.map_width(), self.map_height());
        if !(0..width).contains(&x) || !(0..height).contains(&y) {
            return None;
        }
        let index = usize::try_from(x + y * width).ok()?;
        let target = self
            .entity()
            .get("tiles")?
            .as_list()?
            .get(index)?
            .as_entity()?;
        cast(self.registry(), target)
    }
}
