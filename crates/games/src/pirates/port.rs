use game_state::{EntityId, Value};
use runtime::{Result, ServerHandle};

use super::{Player, Tile};
use crate::view::{View, returned_bool, view};

view!(
    /// A player home port or a merchant port.
    Port => "Port"
);

impl<'r> Port<'r> {
    /// `None` for merchant ports.
    pub fn owner(&self) -> Option<Player<'r>> {
        self.related("owner")
    }

    pub fn is_merchant(&self) -> bool {
        self.owner().is_none()
    }

    pub fn tile(&self) -> Option<Tile<'r>> {
        self.related("tile")
    }

    pub fn gold(&self) -> i64 {
        self.int("gold")
    }

    /// Gold invested by merchants, spent on new merchant ships.
    pub fn investment(&self) -> i64 {
        self.int("investment")
    }

    pub fn actions<'s>(&self, server: &'s ServerHandle) -> PortActions<'s> {
        PortActions::new(server, self.id().clone())
    }
}

/// Something a port can spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Spawn {
    Crew,
    Ship,
}

#[derive(Clone, Debug)]
pub struct PortActions<'s> {
    server: &'s ServerHandle,
    port: EntityId,
}

impl<'s> PortActions<'s> {
    pub fn new(server: &'s ServerHandle, port: EntityId) -> Self {
        Self { server, port }
    }

    /// Buys a crew member or a ship on the port's tile.
    pub async fn spawn(&self, kind: Spawn) -> Result<bool> {
        let reply = self
            .server
            .call(&self.port, "spawn", [("type", Value::from(kind.as_ref()))])
            .await?;
        returned_bool("spawn", reply)
    }
}

#[cfg(test)]
mod tests {
    use game_state::EntityId;

    use super::*;
    use crate::cast;
    use crate::pirates::fixtures;

    #[test]
    fn merchant_ports_have_no_owner() {
        let registry = fixtures::registry();
        let port = cast::<Port>(&registry, &EntityId::new("p1")).unwrap();
        assert!(port.is_merchant());
        assert_eq!(port.investment(), 150);
        assert_eq!(port.tile().unwrap().port().unwrap().id(), port.id());
    }
}
