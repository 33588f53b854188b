//! Asynchronous abstraction for the game-playing logic.
//!
//! Runtime users plug in a [`TurnLogic`] implementation; the session calls it
//! at the lifecycle points of the game and suspends it while its actions are
//! in flight.
use async_trait::async_trait;
use game_state::EntityId;

use super::errors::Result;
use super::handle::ServerHandle;
use super::lifecycle::GameOutcome;
use super::world::World;

/// What turn logic sees while it decides.
#[derive(Clone, Debug)]
pub struct TurnContext {
    world: World,
    server: ServerHandle,
}

impl TurnContext {
    pub(crate) fn new(world: World, server: ServerHandle) -> Self {
        Self { world, server }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn server(&self) -> &ServerHandle {
        &self.server
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.world.player_id()
    }
}

/// Game-playing logic driven by the session.
///
/// Hooks run one at a time on a dedicated task. Only
/// [`run_turn`](TurnLogic::run_turn) may issue calls through
/// [`TurnContext::server`], and only one at a time.
#[async_trait]
pub trait TurnLogic: Send + 'static {
    /// Name announced to the server when no name is configured.
    fn player_name(&self) -> String {
        "Rust Player".to_owned()
    }

    /// The game has started and the player id is known.
    fn start(&mut self, _ctx: &TurnContext) {}

    /// A delta was applied outside of this player's turn.
    fn game_updated(&mut self, _ctx: &TurnContext) {}

    /// Plays (part of) a turn.
    ///
    /// Return `true` to end the turn. `false` runs this hook again before the
    /// turn is reported finished. An error ends the session.
    async fn run_turn(&mut self, ctx: &TurnContext) -> Result<bool>;

    /// The game is over, or the session failed.
    fn end(&mut self, _outcome: &GameOutcome) {}
}

/// Logic that ends every turn immediately.
///
/// Useful as a placeholder player or for connectivity checks.
pub struct IdleLogic;

#[async_trait]
impl TurnLogic for IdleLogic {
    async fn run_turn(&mut self, _ctx: &TurnContext) -> Result<bool> {
        Ok(true)
    }
}
