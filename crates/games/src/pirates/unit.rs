use game_state::{EntityId, Value};
use runtime::{Result, ServerHandle};
use strum::{AsRefStr, Display};

use super::{Player, Port, Tile};
use crate::view::{View, no_args, returned_bool, view};

view!(
    /// A crew, optionally aboard a ship.
    Unit => "Unit"
);

impl<'r> Unit<'r> {
    pub fn owner(&self) -> Option<Player<'r>> {
        self.related("owner")
    }

    /// `None` once the unit has merged into another one.
    pub fn tile(&self) -> Option<Tile<'r>> {
        self.related("tile")
    }

    pub fn crew(&self) -> i64 {
        self.int("crew")
    }

    pub fn crew_health(&self) -> i64 {
        self.int("crew_health")
    }

    pub fn ship_health(&self) -> i64 {
        self.int("ship_health")
    }

    pub fn has_ship(&self) -> bool {
        self.ship_health() > 0
    }

    pub fn gold(&self) -> i64 {
        self.int("gold")
    }

    pub fn moves(&self) -> i64 {
        self.int("moves")
    }

    pub fn acted(&self) -> bool {
        self.flag("acted")
    }

    pub fn stun_turns(&self) -> i64 {
        self.int("stun_turns")
    }

    /// Merchant route. Empty for player units.
    pub fn path(&self) -> Vec<Tile<'r>> {
        self.related_list("path")
    }

    pub fn target_port(&self) -> Option<Port<'r>> {
        self.related("target_port")
    }

    pub fn actions<'s>(&self, server: &'s ServerHandle) -> UnitActions<'s> {
        UnitActions::new(server, self.id().clone())
    }
}

/// What an attack damages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum AttackTarget {
    Crew,
    Ship,
}

/// Server actions of one unit.
///
/// Every action answers `false` when the server's own checks refuse it
/// without rejecting the call outright.
#[derive(Clone, Debug)]
pub struct UnitActions<'s> {
    server: &'s ServerHandle,
    unit: EntityId,
}

impl<'s> UnitActions<'s> {
    pub fn new(server: &'s ServerHandle, unit: EntityId) -> Self {
        Self { server, unit }
    }

    async fn invoke<'a>(
        &self,
        action: &str,
        args: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<bool> {
        let reply = self.server.call(&self.unit, action, args).await?;
        returned_bool(action, reply)
    }

    /// Moves to an adjacent tile, merging with a friendly unit already there.
    pub async fn move_to(&self, tile: &EntityId) -> Result<bool> {
        self.invoke("move", [("tile", Value::from(tile))]).await
    }

    /// Attacks the crew or ship on a tile in range. Uses up remaining moves.
    pub async fn attack(&self, tile: &EntityId, target: AttackTarget) -> Result<bool> {
        self.invoke(
            "attack",
            [
                ("tile", Value::from(tile)),
                ("target", Value::from(target.as_ref())),
            ],
        )
        .await
    }

    /// Buries gold on the current tile. `amount <= 0` buries everything.
    pub async fn bury(&self, amount: i64) -> Result<bool> {
        self.invoke("bury", [("amount", Value::from(amount))]).await
    }

    /// Hands gold to an adjacent port. `amount <= 0` deposits everything.
    pub async fn deposit(&self, amount: i64) -> Result<bool> {
        self.invoke("deposit", [("amount", Value::from(amount))]).await
    }

    /// Digs up gold on the current tile. `amount <= 0` takes everything.
    pub async fn dig(&self, amount: i64) -> Result<bool> {
        self.invoke("dig", [("amount", Value::from(amount))]).await
    }

    /// Heals the unit. Only valid in range of the owner's port.
    pub async fn rest(&self) -> Result<bool> {
        self.invoke("rest", no_args()).await
    }

    /// Moves `amount` crew (all when `<= 0`) and `gold` (all when `< 0`) onto
    /// `tile`.
    pub async fn split(&self, tile: &EntityId, amount: i64, gold: i64) -> Result<bool> {
        self.invoke(
            "split",
            [
                ("tile", Value::from(tile)),
                ("amount", Value::from(amount)),
                ("gold", Value::from(gold)),
            ],
        )
        .await
    }

    /// Takes gold from the owner's treasury. Only at the owner's port.
    pub async fn withdraw(&self, amount: i64) -> Result<bool> {
        self.invoke("withdraw", [("amount", Value::from(amount))]).await
    }
}
