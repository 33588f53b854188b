use super::{Port, Unit};
use crate::view::{View, view};

view!(Player => "Player");

impl<'r> Player<'r> {
    pub fn name(&self) -> &'r str {
        self.text("name")
    }

    pub fn gold(&self) -> i64 {
        self.int("gold")
    }

    pub fn infamy(&self) -> i64 {
        self.int("infamy")
    }

    pub fn opponent(&self) -> Option<Player<'r>> {
        self.related("opponent")
    }

    /// The player's home port, where new units spawn.
    pub fn port(&self) -> Option<Port<'r>> {
        self.related("port")
    }

    pub fn units(&self) -> Vec<Unit<'r>> {
        self.related_list("units")
    }

    pub fn time_remaining(&self) -> f64 {
        self.float("time_remaining")
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
    use game_state::EntityId;

    use super::*;
    use crate::cast;
    use crate::pirates::fixtures;

    #[test]
    fn opponents_point_at_each_other() {
        let registry = fixtures::registry();
        let me = cast::<Player>(&registry, &EntityId::new("0")).unwrap();
        let them = me.opponent().unwrap();
        assert_eq!(them.name(), "Anne");
        assert_eq!(them.opponent().unwrap().id(), me.id());
        assert_eq!(me.gold(), 600);
        assert_eq!(me.infamy(), 3);
        assert!(me.port().is_none());
        assert_eq!(me.units().len(), 1);
    }
}
