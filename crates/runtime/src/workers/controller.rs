//! Session controller that owns the connection and the registry writes.
//!
//! Runs the handshake, applies deltas, forwards lifecycle hooks to the logic
//! worker and services remote calls while a turn is in progress. Frames are
//! only read while the turn logic is idle or suspended in a call, so the logic
//! never observes the registry changing under it.

use std::time::Duration;

use game_state::{Registry, Value, apply_delta};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, error, info, warn};

use super::logic::LogicCommand;
use crate::api::{ClientError, GameOutcome, Result, SessionState, World};
use crate::config::ClientConfig;
use crate::events::{Event, EventBus, SessionEvent, StateEvent, TurnEvent};
use crate::protocol::{
    ClientMessage, DeltaDecoder, FinishedNotice, PlayRequest, ProtocolError, Reference,
    RunRequest, ServerMessage, camel_case, value_from_json, value_to_json,
};
use crate::rpc::{CallRequest, Dispatcher};
use crate::transport::{TcpTransport, Transport, TransportError};

const RUN_TURN: &str = "runTurn";
const CLIENT_TYPE: &str = "Rust";

/// How long the logic worker gets to acknowledge the end of the game.
pub(crate) const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// What a routed frame asks the controller to do next.
enum Routed {
    Continue,
    Order(u64),
    Replied,
    Over(Option<String>),
}

/// How a serviced call or a turn came to an end.
enum Settled {
    Done,
    GameOver(Option<String>),
}

pub struct SessionController {
    /// `None` until the server is dialled in the `Connecting` state.
    transport: Option<Box<dyn Transport>>,
    config: ClientConfig,
    player_name: String,
    world: World,
    decoder: DeltaDecoder,
    dispatcher: Dispatcher,
    logic_tx: mpsc::Sender<LogicCommand>,
    call_rx: mpsc::Receiver<CallRequest>,
    event_bus: EventBus,
    state: SessionState,
}

impl SessionController {
    pub fn new(
        transport: Option<Box<dyn Transport>>,
        config: ClientConfig,
        player_name: String,
        world: World,
        event_bus: EventBus,
        logic_tx: mpsc::Sender<LogicCommand>,
        call_rx: mpsc::Receiver<CallRequest>,
    ) -> Self {
        Self {
            transport,
            config,
            player_name,
            world,
            decoder: DeltaDecoder::default(),
            dispatcher: Dispatcher::new(),
            logic_tx,
            call_rx,
            event_bus,
            state: SessionState::Connecting,
        }
    }

    /// Drives the session to its end.
    ///
    /// The turn logic's `end` hook runs on every path, with a failure outcome
    /// when a fatal error stopped the session.
    pub async fn run(mut self) -> Result<GameOutcome> {
        let result = self.drive().await;

        self.dispatcher.abort();
        self.refuse_queued_calls();

        let (outcome, error) = match &result {
            Ok(outcome) => {
                info!(won = outcome.won, reason = %outcome.reason, "game over");
                (outcome.clone(), None)
            }
            Err(err) => {
                error!(error = %err, category = %err.category(), "session failed");
                (GameOutcome::failure(err), Some(err.to_string()))
            }
        };

        self.notify_end(outcome.clone()).await;
        if let Some(transport) = self.transport.as_mut() {
            if let Err(err) = transport.close().await {
                debug!(error = %err, "closing transport failed");
            }
        }
        self.transition(SessionState::Ended);
        self.event_bus
            .publish(Event::Session(SessionEvent::Ended { outcome, error }));

        result
    }

    async fn drive(&mut self) -> Result<GameOutcome> {
        self.open().await?;
        self.handshake().await?;
        self.transition(SessionState::AwaitingOrder);

        loop {
            let transport = Self::link(&mut self.transport)?;
            let message = tokio::select! {
                biased;
                Some(request) = self.call_rx.recv() => {
                    return Err(Self::refuse_outside_turn(request));
                }
                frame = transport.receive() => Self::decode(frame)?,
            };

            match self.route(message).await? {
                Routed::Continue | Routed::Replied => {}
                Routed::Order(order_index) => {
                    if let Settled::GameOver(message) = self.run_turn(order_index).await? {
                        return Ok(self.outcome(message));
                    }
                }
                Routed::Over(message) => return Ok(self.outcome(message)),
            }
        }
    }

    /// Dials the configured server unless a transport was supplied. The
    /// session is still `Connecting` here.
    async fn open(&mut self) -> Result<()> {
        if self.transport.is_none() {
            info!(server = %self.config.server, "connecting to game server");
            let transport = TcpTransport::connect(&self.config.server).await?;
            self.transport = Some(Box::new(transport));
        }
        Ok(())
    }

    async fn handshake(&mut self) -> Result<()> {
        self.transition(SessionState::Handshaking);

        self.send(ClientMessage::Alias(self.config.game.clone())).await?;
        let game_name = match self.receive().await? {
            ServerMessage::Named(name) => name,
            other => return Err(Self::rejection(other)),
        };
        debug!(alias = %self.config.game, game = %game_name, "game alias resolved");

        let (schema_game, dynamic) = self.world.read(|registry| {
            let schema = registry.schema();
            (schema.game().to_owned(), schema.is_dynamic())
        });
        if !dynamic && !schema_game.eq_ignore_ascii_case(&game_name) {
            warn!(
                expected = %schema_game,
                game = %game_name,
                "schema was built for a different game"
            );
        }

        self.send(ClientMessage::Play(PlayRequest {
            client_type: CLIENT_TYPE.to_owned(),
            game_name,
            game_settings: self.config.game_settings.clone(),
            password: self.config.password.clone(),
            player_index: self.config.player_index,
            player_name: self.player_name.clone(),
            requested_session: self.config.session.clone(),
            spectating: false,
        }))
        .await?;

        match self.receive().await? {
            ServerMessage::Lobbied(info) => {
                info!(
                    game = %info.game_name,
                    session = %info.game_session,
                    "joined game session, waiting for the game to start"
                );
                self.decoder.set_constants(info.constants);
                self.event_bus.publish(Event::Session(SessionEvent::Lobbied {
                    game: info.game_name,
                    session: info.game_session,
                }));
                Ok(())
            }
            other => Err(Self::rejection(other)),
        }
    }

    /// Handles one server frame outside of the handshake.
    async fn route(&mut self, message: ServerMessage) -> Result<Routed> {
        match message {
            ServerMessage::Delta(payload) => {
                self.apply(&payload)?;
                if self.state == SessionState::AwaitingOrder && self.world.player_id().is_some() {
                    self.hand_off(|reply| LogicCommand::Updated { reply }).await?;
                }
                Ok(Routed::Continue)
            }
            ServerMessage::Start { player_id } => {
                if self.state != SessionState::AwaitingOrder
                    || !self.world.set_player(player_id.as_str().into())
                {
                    return Err(ProtocolError::Unexpected {
                        event: "start",
                        context: "after the game already started",
                    }
                    .into());
                }
                info!(player = %player_id, "game started");
                self.event_bus.publish(Event::Session(SessionEvent::Started {
                    player: player_id.into(),
                }));
                self.hand_off(|reply| LogicCommand::Start { reply }).await?;
                Ok(Routed::Continue)
            }
            ServerMessage::Order(order) => {
                if order.name != RUN_TURN {
                    return Err(ProtocolError::UnsupportedOrder(order.name).into());
                }
                Ok(Routed::Order(order.index))
            }
            ServerMessage::Ran(data) => {
                let value = self.world.read(|registry| {
                    let mut value = value_from_json(&data);
                    null_dead_refs(&mut value, registry);
                    value
                });
                let resolved = self.dispatcher.resolve(Ok(value));
                let (target, action) = resolved.ok_or(ProtocolError::Unexpected {
                    event: "ran",
                    context: "with no call pending",
                })?;
                debug!(%target, %action, "call resolved");
                self.event_bus.publish(Event::Turn(TurnEvent::CallResolved {
                    target,
                    action,
                    accepted: true,
                }));
                Ok(Routed::Replied)
            }
            ServerMessage::Invalid { message } => {
                let Some(action) = self.dispatcher.pending().map(|p| p.action().to_owned()) else {
                    warn!(%message, "server reported an invalid request");
                    return Err(ProtocolError::Unexpected {
                        event: "invalid",
                        context: "with no call pending",
                    }
                    .into());
                };
                warn!(%action, %message, "server rejected action");
                if let Some((target, action)) = self
                    .dispatcher
                    .resolve(Err(ClientError::ActionRejected { action, message }))
                {
                    self.event_bus.publish(Event::Turn(TurnEvent::CallResolved {
                        target,
                        action,
                        accepted: false,
                    }));
                }
                Ok(Routed::Replied)
            }
            ServerMessage::Fatal { message } => Err(ClientError::ServerFatal { message }),
            ServerMessage::Over { message } => Ok(Routed::Over(message)),
            other @ (ServerMessage::Named(_) | ServerMessage::Lobbied(_)) => {
                Err(ProtocolError::Unexpected {
                    event: other.event(),
                    context: "after the handshake",
                }
                .into())
            }
        }
    }

    /// Hands control to the turn logic until it ends the turn.
    async fn run_turn(&mut self, order_index: u64) -> Result<Settled> {
        self.transition(SessionState::RunningCallback);
        self.event_bus.publish(Event::Turn(TurnEvent::Started { order_index }));

        let mut passes = 0u32;
        loop {
            passes += 1;
            let (reply_tx, mut reply_rx) = oneshot::channel();
            self.logic_tx
                .send(LogicCommand::RunTurn { reply: reply_tx })
                .await
                .map_err(|_| ClientError::LogicWorkerGone)?;

            let end_turn = loop {
                tokio::select! {
                    biased;
                    result = &mut reply_rx => {
                        break result.map_err(|_| ClientError::LogicWorkerGone)??;
                    }
                    Some(request) = self.call_rx.recv() => {
                        if let Settled::GameOver(message) = self.service_call(request).await? {
                            return Ok(Settled::GameOver(message));
                        }
                    }
                }
            };

            if end_turn {
                break;
            }
            debug!(order_index, passes, "turn logic kept the turn");
        }

        self.send(ClientMessage::Finished(FinishedNotice {
            order_index,
            returned: serde_json::Value::Bool(true),
        }))
        .await?;
        self.event_bus
            .publish(Event::Turn(TurnEvent::Finished { order_index, passes }));
        self.transition(SessionState::AwaitingOrder);
        Ok(Settled::Done)
    }

    /// Puts one call on the wire and reads frames until its reply arrives.
    ///
    /// Deltas received in the meantime are applied first, so the caller
    /// resumes against the post-action state.
    async fn service_call(&mut self, request: CallRequest) -> Result<Settled> {
        let (target, action, args) = self
            .world
            .read(|registry| self.dispatcher.begin(request, registry))?;
        debug!(%target, %action, "issuing call");

        self.send(ClientMessage::Run(RunRequest {
            caller: Reference {
                id: target.as_str().to_owned(),
            },
            function_name: camel_case(&action),
            args: args
                .iter()
                .map(|(name, value)| (camel_case(name), value_to_json(value)))
                .collect(),
        }))
        .await?;

        let deadline = self.config.call_timeout.map(|limit| Instant::now() + limit);
        loop {
            let transport = Self::link(&mut self.transport)?;
            // A second call always loses to whatever else is ready.
            let message = tokio::select! {
                biased;
                Some(second) = self.call_rx.recv() => {
                    return Err(self.dispatcher.refuse_concurrent(second));
                }
                frame = transport.receive() => Self::decode(frame)?,
                _ = sleep_until_deadline(deadline) => {
                    return Err(ClientError::CallTimedOut {
                        action,
                        timeout: self.config.call_timeout.unwrap_or_default(),
                    });
                }
            };

            match self.route(message).await? {
                Routed::Continue => {}
                Routed::Replied => return Ok(Settled::Done),
                Routed::Over(message) => return Ok(Settled::GameOver(message)),
                Routed::Order(_) => {
                    return Err(ProtocolError::Unexpected {
                        event: "order",
                        context: "while a call is pending",
                    }
                    .into());
                }
            }
        }
    }

    fn apply(&mut self, payload: &serde_json::Value) -> Result<()> {
        let delta = self.decoder.decode(payload)?;
        let summary = self
            .world
            .write(|registry| apply_delta(registry, &delta))?;
        self.event_bus.publish(Event::State(StateEvent::DeltaApplied {
            summary,
            during_turn: self.state == SessionState::RunningCallback,
        }));
        Ok(())
    }

    /// Runs a synchronous hook on the logic worker and waits for it.
    async fn hand_off(
        &mut self,
        command: impl FnOnce(oneshot::Sender<()>) -> LogicCommand,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.logic_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| ClientError::LogicWorkerGone)?;
        reply_rx.await.map_err(|_| ClientError::LogicWorkerGone)
    }

    async fn notify_end(&mut self, outcome: GameOutcome) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = LogicCommand::End {
            outcome,
            reply: reply_tx,
        };
        if self.logic_tx.send(command).await.is_err() {
            warn!("logic worker stopped before the end of the game");
            return;
        }
        match timeout(SHUTDOWN_GRACE, reply_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => warn!("logic worker dropped the end notification"),
            Err(_) => warn!(
                grace = ?SHUTDOWN_GRACE,
                "logic worker did not acknowledge the end of the game"
            ),
        }
    }

    /// Fails calls that were queued but never serviced.
    fn refuse_queued_calls(&mut self) {
        self.call_rx.close();
        while let Ok(request) = self.call_rx.try_recv() {
            request.fail(ClientError::SessionEnded);
        }
    }

    fn outcome(&self, message: Option<String>) -> GameOutcome {
        let player = self.world.player_id();
        self.world
            .read(|registry| GameOutcome::from_player(registry, player.as_ref(), message))
    }

    fn transition(&mut self, to: SessionState) {
        let from = std::mem::replace(&mut self.state, to);
        if from != to {
            debug!(%from, %to, "session state changed");
            self.event_bus
                .publish(Event::Session(SessionEvent::StateChanged { from, to }));
        }
    }

    async fn send(&mut self, message: ClientMessage) -> Result<()> {
        let frame = message.encode()?;
        Self::link(&mut self.transport)?.send(frame).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<ServerMessage> {
        let frame = Self::link(&mut self.transport)?.receive().await;
        Self::decode(frame)
    }

    fn link(transport: &mut Option<Box<dyn Transport>>) -> Result<&mut Box<dyn Transport>> {
        transport
            .as_mut()
            .ok_or(ClientError::Transport(TransportError::Closed))
    }

    fn decode(
        frame: std::result::Result<Option<Vec<u8>>, TransportError>,
    ) -> Result<ServerMessage> {
        let frame = frame?.ok_or(ClientError::ConnectionLost)?;
        let message = ServerMessage::decode(&frame)?;
        debug!(event = message.event(), "received frame");
        Ok(message)
    }

    fn rejection(message: ServerMessage) -> ClientError {
        let reason = match message {
            ServerMessage::Fatal { message } => message,
            other => format!("unexpected `{}` frame", other.event()),
        };
        ClientError::HandshakeRejected { reason }
    }

    fn refuse_outside_turn(request: CallRequest) -> ClientError {
        let action = request.action.clone();
        request.fail(ClientError::CallOutsideTurn {
            action: action.clone(),
        });
        ClientError::CallOutsideTurn { action }
    }
}

/// Replaces references to entities that are no longer live with `Null`.
fn null_dead_refs(value: &mut Value, registry: &Registry) {
    match value {
        Value::Ref(id) if !registry.contains(id) => *value = Value::Null,
        Value::List(items) => items
            .iter_mut()
            .for_each(|item| null_dead_refs(item, registry)),
        Value::Map(entries) => entries
            .values_mut()
            .for_each(|item| null_dead_refs(item, registry)),
        _ => {}
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
