//! High-level session orchestrator.
//!
//! A [`Session`] owns the session controller and the logic worker, wires up
//! the call/command/event channels, and exposes a builder-based API for
//! embedders to connect and play one game.

use game_state::SchemaTable;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::api::{ClientError, GameOutcome, Result, ServerHandle, TurnContext, TurnLogic, World};
use crate::config::ClientConfig;
use crate::events::{Event, EventBus, Topic};
use crate::transport::Transport;
use crate::workers::{LogicWorker, SHUTDOWN_GRACE, SessionController};

/// One connection to the game server, playing one game.
pub struct Session {
    controller: SessionController,
    logic_worker: LogicWorker,
    world: World,
    event_bus: EventBus,
}

impl Session {
    /// Create a new session builder
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Read access to the registry, shared with the turn logic.
    pub fn world(&self) -> World {
        self.world.clone()
    }

    /// Subscribe to events from a specific topic
    ///
    /// Subscribe before calling [`run`](Session::run) to see every event.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Plays the game to its end.
    ///
    /// Returns the outcome once the server declares the game over, or the
    /// fatal error that ended the session early.
    pub async fn run(self) -> Result<GameOutcome> {
        let Session {
            controller,
            logic_worker,
            ..
        } = self;

        let mut logic_handle = tokio::spawn(logic_worker.run());
        let result = controller.run().await;

        match timeout(SHUTDOWN_GRACE, &mut logic_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(join_error)) => {
                if result.is_ok() {
                    return Err(ClientError::WorkerJoin(join_error));
                }
                debug!(error = %join_error, "logic worker failed after the session ended");
            }
            Err(_) => {
                warn!(
                    grace = ?SHUTDOWN_GRACE,
                    "logic worker still busy after the session ended, aborting it"
                );
                logic_handle.abort();
            }
        }

        result
    }
}

/// Builder for [`Session`] with flexible configuration.
pub struct SessionBuilder {
    config: ClientConfig,
    schema: Option<SchemaTable>,
    logic: Option<Box<dyn TurnLogic>>,
    transport: Option<Box<dyn Transport>>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            schema: None,
            logic: None,
            transport: None,
        }
    }

    /// Override client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Entity shapes of the game. Without one, any shape is accepted.
    pub fn schema(mut self, schema: SchemaTable) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the game-playing logic (required)
    pub fn logic(mut self, logic: impl TurnLogic) -> Self {
        self.logic = Some(Box::new(logic));
        self
    }

    /// Use an already established transport instead of dialing
    /// [`ClientConfig::server`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Assembles the session.
    ///
    /// Dialing [`ClientConfig::server`] and the handshake both happen in
    /// [`Session::run`], so a failed connection still reaches the logic's
    /// `end` hook.
    pub fn build(self) -> Result<Session> {
        let SessionBuilder {
            config,
            schema,
            logic,
            transport,
        } = self;

        config.validate()?;
        let logic = logic.ok_or_else(|| ClientError::Config("no turn logic provided".into()))?;
        let schema = schema.unwrap_or_else(|| {
            debug!(game = %config.game, "no schema provided, accepting any entity shape");
            SchemaTable::dynamic(&config.game)
        });

        let event_bus = EventBus::with_capacity(config.channels.event_buffer);
        let world = World::new(schema);
        let (call_tx, call_rx) = mpsc::channel(config.channels.command_buffer);
        let (logic_tx, logic_rx) = mpsc::channel(config.channels.command_buffer);

        let player_name = config
            .player_name
            .clone()
            .unwrap_or_else(|| logic.player_name());
        let ctx = TurnContext::new(world.clone(), ServerHandle::new(call_tx));
        let logic_worker = LogicWorker::new(logic, ctx, logic_rx);
        let controller = SessionController::new(
            transport,
            config,
            player_name,
            world.clone(),
            event_bus.clone(),
            logic_tx,
            call_rx,
        );

        Ok(Session {
            controller,
            logic_worker,
            world,
            event_bus,
        })
    }
}
