//! # pulse
//!
//! Terminal client for Pulse. Runs in local-only mode: the SQLite database
//! under the data directory is the source of truth, and the session identity
//! is kept in the same file so the next run signs back in.
//!
//! Commands are read line by line from stdin; `help` lists them.

mod command;
mod render;
mod repl;

use std::sync::Arc;

use pulse_shared::constants::APP_NAME;
use pulse_store::Database;
use pulse_sync::{GeminiReplyGenerator, SyncConfig, SyncContext, SyncEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::Command;
use crate::repl::Flow;

const DEFAULT_LOG_FILTER: &str = "pulse_cli=info,pulse_sync=debug,pulse_store=info,warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = SyncConfig::from_env();
    info!(
        debounce_ms = config.debounce.as_millis() as u64,
        poll_secs = config.poll_interval.map(|p| p.as_secs()),
        assistant = %config.assistant_id,
        generator_configured = config.gemini_api_key.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the local database and wire the engine
    // -----------------------------------------------------------------------
    let db = match &config.data_dir {
        Some(dir) => Database::open_in_dir(dir)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database opened");
    }

    let generator = GeminiReplyGenerator::new(&config)?;
    if !generator.is_configured() {
        warn!("No Gemini API key set, automatic replies will be a notice");
    }

    let engine = SyncEngine::new(SyncContext::local(db, Arc::new(generator), config.clone()));

    if let Some(me) = engine.restore() {
        println!("welcome back, {} ({})", me.display_name, me.id);
        if let Err(e) = engine.refresh().await {
            warn!(error = %e, "Initial refresh failed");
        }
    } else {
        println!("not signed in, use `login <name>`");
    }

    // -----------------------------------------------------------------------
    // 4. Background sync
    // -----------------------------------------------------------------------
    let listener = engine.spawn_change_listener();
    let poller = config.poll_interval.map(|every| engine.spawn_poller(every));

    // -----------------------------------------------------------------------
    // 5. Command loop
    // -----------------------------------------------------------------------
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {e:#}");
                continue;
            }
        };

        match repl::execute(&engine, command).await {
            Ok((flow, output)) => {
                println!("{output}");
                if flow == Flow::Quit {
                    break;
                }
            }
            Err(e) => println!("error: {e:#}"),
        }
    }

    listener.abort();
    if let Some(poller) = poller {
        poller.abort();
    }
    info!("Shutting down");
    Ok(())
}
