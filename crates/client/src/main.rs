//! Game client binary.
//!
//! Composition root: reads [`ClientConfig`] from the environment, picks the
//! schema for the requested game, connects, and plays with the bundled
//! [`IdleLogic`] until the server declares the game over.
//!
//! # Examples
//!
//! ```bash
//! JOUEUR_GAME=Pirates JOUEUR_SERVER=127.0.0.1:3000 cargo run -p joueur-client
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use game_state::SchemaTable;
use runtime::{ClientConfig, IdleLogic, Session};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    setup_logging();

    let config = ClientConfig::from_env();
    let schema = game_classes::schema_for(&config.game).unwrap_or_else(|| {
        tracing::warn!(
            game = %config.game,
            "no bundled classes for this game, accepting any state"
        );
        SchemaTable::dynamic(&config.game)
    });

    let session = Session::builder()
        .config(config.clone())
        .schema(schema)
        .logic(IdleLogic)
        .build()
        .with_context(|| format!("failed to set up a session for `{}`", config.game))?;

    match session.run().await {
        Ok(outcome) => {
            let verdict = if outcome.won { "won" } else { "lost" };
            println!("{verdict}: {}", outcome.reason);
            if let Some(message) = outcome.message {
                println!("server: {message}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(category = %err.category(), "session failed: {err}");
            eprintln!("error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Logs to stderr, filtered by `RUST_LOG` on top of an `info` default.
fn setup_logging() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}
