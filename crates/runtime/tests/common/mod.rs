//! Scripted game server and fixtures shared by the session tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use game_state::{FieldKind, SchemaTable, TypeSchema};
use runtime::{ClientConfig, MemoryTransport, Session, Transport, TurnLogic};
use serde_json::{Value, json};
use tokio::time::timeout;

pub const GAME: &str = "Skirmish";

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Server side of an in-memory connection, driven step by step by a test.
pub struct FakeServer {
    transport: MemoryTransport,
}

impl FakeServer {
    pub async fn send(&mut self, event: &str, data: Value) {
        let frame = serde_json::to_vec(&json!({ "event": event, "data": data })).unwrap();
        self.transport
            .send(frame)
            .await
            .expect("client should still be connected");
    }

    /// Reads the next client frame, asserts its event name, returns its data.
    pub async fn expect(&mut self, event: &str) -> Value {
        let frame = timeout(STEP_TIMEOUT, self.transport.receive())
            .await
            .expect("client should send a frame in time")
            .unwrap()
            .unwrap_or_else(|| panic!("client closed the connection while `{event}` was expected"));
        let frame: Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(frame["event"], event, "unexpected frame {frame}");
        frame["data"].clone()
    }

    /// Waits for the client to hang up.
    pub async fn expect_closed(&mut self) {
        let frame = timeout(STEP_TIMEOUT, self.transport.receive())
            .await
            .expect("client should close the connection in time")
            .unwrap();
        if let Some(frame) = frame {
            panic!(
                "expected the connection to close, got {}",
                String::from_utf8_lossy(&frame)
            );
        }
    }

    pub async fn handshake(&mut self) {
        assert_eq!(self.expect("alias").await, json!(GAME));
        self.send("named", json!(GAME)).await;

        let play = self.expect("play").await;
        assert_eq!(play["gameName"], GAME);
        assert_eq!(play["clientType"], "Rust");
        assert_eq!(play["requestedSession"], "*");

        self.send(
            "lobbied",
            json!({
                "gameName": GAME,
                "gameSession": "42",
                "constants": { "DELTA_REMOVED": "&RM", "DELTA_LIST_LENGTH": "&LEN" }
            }),
        )
        .await;
    }

    /// Handshake, the opening delta, then `start` for player "0".
    pub async fn open_game(&mut self) {
        self.handshake().await;
        self.send("delta", opening_delta()).await;
        self.send("start", json!({ "playerID": "0" })).await;
    }

    pub async fn order_turn(&mut self, index: u64) {
        self.send("order", json!({ "name": "runTurn", "index": index, "args": [] }))
            .await;
    }

    pub async fn expect_finished(&mut self, index: u64) {
        assert_eq!(
            self.expect("finished").await,
            json!({ "orderIndex": index, "returned": true })
        );
    }

    /// Declares the game over, with player "0" as the winner.
    pub async fn finish_game(&mut self) {
        self.send(
            "delta",
            json!({ "gameObjects": { "0": { "won": true, "reasonWon": "last unit standing" } } }),
        )
        .await;
        self.send("over", json!({ "message": "thanks for playing" })).await;
    }

    pub fn hang_up(self) {
        drop(self.transport);
    }
}

/// Two players, one unit on tile 3, and tile 4 to the east.
///
/// The unit is described before the tiles it references.
pub fn opening_delta() -> Value {
    json!({
        "gameObjects": {
            "0": {
                "gameObjectName": "Player", "id": "0", "name": "Tester",
                "units": { "&LEN": 1, "0": { "id": "2" } },
                "won": false, "lost": false, "reasonWon": "", "reasonLost": ""
            },
            "1": { "gameObjectName": "Player", "id": "1", "name": "Opponent", "units": [] },
            "2": {
                "gameObjectName": "Unit", "id": "2",
                "owner": { "id": "0" }, "tile": { "id": "3" }, "moves": 3
            },
            "3": {
                "gameObjectName": "Tile", "id": "3", "x": 0, "y": 0,
                "tileEast": { "id": "4" }, "unit": { "id": "2" }
            },
            "4": {
                "gameObjectName": "Tile", "id": "4", "x": 1, "y": 0,
                "tileEast": null, "unit": null
            }
        },
        "players": [{ "id": "0" }, { "id": "1" }],
        "currentPlayer": { "id": "0" },
        "currentTurn": 0
    })
}

pub fn schema() -> SchemaTable {
    let base = TypeSchema::new("GameObject")
        .field("id", FieldKind::String)
        .field("game_object_name", FieldKind::String)
        .field("logs", FieldKind::list_of(FieldKind::String));

    SchemaTable::new(GAME)
        .with(
            TypeSchema::new("Game")
                .field("players", FieldKind::list_of(FieldKind::reference("Player")))
                .field("current_player", FieldKind::reference("Player"))
                .field("current_turn", FieldKind::Int),
        )
        .with(
            TypeSchema::new("Player")
                .extends(&base)
                .field("name", FieldKind::String)
                .field("units", FieldKind::list_of(FieldKind::reference("Unit")))
                .field("won", FieldKind::Bool)
                .field("lost", FieldKind::Bool)
                .field("reason_won", FieldKind::String)
                .field("reason_lost", FieldKind::String),
        )
        .with(
            TypeSchema::new("Unit")
                .extends(&base)
                .field("owner", FieldKind::reference("Player"))
                .field("tile", FieldKind::reference("Tile"))
                .field("moves", FieldKind::Int),
        )
        .with(
            TypeSchema::new("Tile")
                .extends(&base)
                .field("x", FieldKind::Int)
                .field("y", FieldKind::Int)
                .field("tile_east", FieldKind::reference("Tile"))
                .field("unit", FieldKind::reference("Unit")),
        )
}

/// Builds a session over an in-memory transport.
pub async fn connect(logic: impl TurnLogic) -> (Session, FakeServer) {
    connect_with(ClientConfig::for_game(GAME), logic).await
}

pub async fn connect_with(config: ClientConfig, logic: impl TurnLogic) -> (Session, FakeServer) {
    let (client_end, server_end) = MemoryTransport::pair(16);
    let session = Session::builder()
        .config(config)
        .schema(schema())
        .logic(logic)
        .transport(client_end)
        .build()
        .expect("session should assemble");
    (
        session,
        FakeServer {
            transport: server_end,
        },
    )
}

/// Ordered record of what the turn logic observed.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
