use strum::{Display, EnumIter, IntoEnumIterator};

use super::{Port, Unit};
use crate::view::{View, view};

view!(
    /// One square of the map.
    Tile => "Tile"
);

/// Neighbour directions, in the order the server lists them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    fn attribute(self) -> &'static str {
        match self {
            Direction::North => "tile_north",
            Direction::East => "tile_east",
            Direction::South => "tile_south",
            Direction::West => "tile_west",
        }
    }
}

impl<'r> Tile<'r> {
    pub fn x(&self) -> i64 {
        self.int("x")
    }

    pub fn y(&self) -> i64 {
        self.int("y")
    }

    /// `"land"` or `"water"`.
    pub fn kind(&self) -> &'r str {
        self.text("type")
    }

    pub fn gold(&self) -> i64 {
        self.int("gold")
    }

    pub fn decoration(&self) -> bool {
        self.flag("decoration")
    }

    pub fn unit(&self) -> Option<Unit<'r>> {
        self.related("unit")
    }

    pub fn port(&self) -> Option<Port<'r>> {
        self.related("port")
    }

    pub fn neighbor(&self, direction: Direction) -> Option<Tile<'r>> {
        self.related(direction.attribute())
    }

    pub fn tile_north(&self) -> Option<Tile<'r>> {
        self.neighbor(Direction::North)
    }

    pub fn tile_east(&self) -> Option<Tile<'r>> {
        self.neighbor(Direction::East)
    }

    pub fn tile_south(&self) -> Option<Tile<'r>> {
        self.neighbor(Direction::South)
    }

    pub fn tile_west(&self) -> Option<Tile<'r>> {
        self.neighbor(Direction::West)
    }

    /// Existing neighbours, north first, clockwise.
    pub fn neighbors(&self) -> Vec<Tile<'r>> {
        Direction::iter()
            .filter_map(|direction| self.neighbor(direction))
            .collect()
    }

    pub fn has_neighbor(&self, other: &Tile<'_>) -> bool {
        self.neighbors()
            .iter()
            .any(|neighbor| neighbor.id() == other.id())
    }

    /// Water tiles without a unit or port can be moved onto.
    pub fn is_pathable(&self) -> bool {
        self.kind() == "water" && self.unit().is_none() && self.port().is_none()
    }
}

#[cfg(test)]
mod tests {
    use game_state::EntityId;

    use super::*;
    use crate::cast;
    use crate::pirates::fixtures;

    fn tile<'r>(registry: &'r game_state::Registry, id: &str) -> Tile<'r> {
        cast(registry, &EntityId::new(id)).unwrap()
    }

    #[test]
    fn walks_neighbors_clockwise() {
        let registry = fixtures::registry();
        let corner = tile(&registry, "t11");
        let ids: Vec<_> = corner
            .neighbors()
            .iter()
            .map(|t| t.id().as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["t10", "t01"]);
        assert_eq!(corner.tile_north().unwrap().y(), 0);
        assert!(corner.tile_east().is_none());
    }

    #[test]
    fn diagonal_tiles_are_not_neighbors() {
        let registry = fixtures::registry();
        let origin = tile(&registry, "t00");
        assert!(origin.has_neighbor(&tile(&registry, "t10")));
        assert!(!origin.has_neighbor(&tile(&registry, "t11")));
    }

    #[test]
    fn occupied_tiles_are_not_pathable() {
        let registry = fixtures::registry();
        assert!(!tile(&registry, "t00").is_pathable());
        assert!(!tile(&registry, "t11").is_pathable());
        assert!(tile(&registry, "t10").is_pathable());
        assert_eq!(tile(&registry, "t00").gold(), 25);
    }
}
