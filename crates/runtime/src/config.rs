//! Client configuration structures and loaders.
use std::env;
use std::time::Duration;

use crate::api::{ClientError, Result};

/// Connection and session settings.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// `host:port` of the game server.
    pub server: String,
    /// Game alias sent during the handshake.
    pub game: String,
    /// Overrides the name reported by the turn logic.
    pub player_name: Option<String>,
    pub password: Option<String>,
    /// Session to join; `*` lets the server pick.
    pub session: String,
    pub player_index: Option<u32>,
    /// Opaque `key=value&...` settings forwarded to the server.
    pub game_settings: String,
    /// Gives up on a remote call that receives no reply in time.
    pub call_timeout: Option<Duration>,
    pub channels: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:3000".to_owned(),
            game: String::new(),
            player_name: None,
            password: None,
            session: "*".to_owned(),
            player_index: None,
            game_settings: String::new(),
            call_timeout: None,
            channels: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration for `game`.
    pub fn for_game(game: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            ..Self::default()
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `JOUEUR_SERVER` - Server address (default: 127.0.0.1:3000)
    /// - `JOUEUR_GAME` - Game alias (required before connecting)
    /// - `JOUEUR_PLAYER_NAME` - Player name override
    /// - `JOUEUR_PASSWORD` - Session password
    /// - `JOUEUR_SESSION` - Requested session (default: *)
    /// - `JOUEUR_PLAYER_INDEX` - Requested player slot
    /// - `JOUEUR_GAME_SETTINGS` - Game settings query string
    /// - `JOUEUR_CALL_TIMEOUT_MS` - Remote call timeout (default: none)
    /// - `JOUEUR_COMMAND_BUFFER` - Call and logic queue size (default: 32)
    /// - `JOUEUR_EVENT_BUFFER` - Event bus capacity per topic (default: 100)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(server) = read_env::<String>("JOUEUR_SERVER") {
            config.server = server;
        }
        if let Some(game) = read_env::<String>("JOUEUR_GAME") {
            config.game = game;
        }
        config.player_name = read_env("JOUEUR_PLAYER_NAME");
        config.password = read_env("JOUEUR_PASSWORD");
        if let Some(session) = read_env::<String>("JOUEUR_SESSION") {
            config.session = session;
        }
        config.player_index = read_env("JOUEUR_PLAYER_INDEX");
        if let Some(settings) = read_env::<String>("JOUEUR_GAME_SETTINGS") {
            config.game_settings = settings;
        }
        config.call_timeout = read_env::<u64>("JOUEUR_CALL_TIMEOUT_MS")
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        if let Some(capacity) = read_env::<usize>("JOUEUR_COMMAND_BUFFER") {
            config.channels.command_buffer = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("JOUEUR_EVENT_BUFFER") {
            config.channels.event_buffer = capacity.max(1);
        }

        config
    }

    /// Checks the settings a session cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.game.trim().is_empty() {
            return Err(ClientError::Config("no game alias configured".into()));
        }
        if self.server.trim().is_empty() {
            return Err(ClientError::Config("no server address configured".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer: 32,
            event_buffer: 100,
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    let raw = env::var(key).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.server, "127.0.0.1:3000");
        assert_eq!(config.session, "*");
        assert_eq!(config.channels.command_buffer, 32);
        assert!(config.call_timeout.is_none());
    }

    #[test]
    fn a_game_alias_is_required() {
        assert!(matches!(
            ClientConfig::default().validate(),
            Err(ClientError::Config(_))
        ));
        assert!(ClientConfig::for_game("Chess").validate().is_ok());
    }
}
