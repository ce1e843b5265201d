//! notify-dispatch — send one notification event about a reference object.
//!
//! Loads events from YAML, builds the sender registry from the
//! environment, reads the reference object as JSON and dispatches the
//! event through every medium it lists. `--check` renders the texts
//! and validates routing without sending anything.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ducker_notify::config::load_dotenv;
use ducker_notify::{Dispatcher, InMemoryEventStore, JsonObject, NotifyConfig, SenderRegistry};

// ── CLI ─────────────────────────────────────────────────────────────

/// Dispatch a templated notification to a user.
#[derive(Parser, Debug)]
#[command(name = "notify-dispatch", version, about)]
struct Cli {
    /// Path to the events YAML file.
    #[arg(long, env = "NOTIFY_EVENTS_PATH")]
    events: Option<PathBuf>,

    /// Identifier of the event to send.
    #[arg(long)]
    identifier: String,

    /// JSON file with the reference object (`-` reads stdin).
    #[arg(long, default_value = "-")]
    object: String,

    /// Render and route only; print the texts instead of sending.
    #[arg(long)]
    check: bool,
}

fn read_object(source: &str) -> anyhow::Result<JsonObject> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read reference object from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read reference object from {source}"))?
    };
    Ok(JsonObject::from_json_str(&raw)?)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = NotifyConfig::from_env();
    config.log_summary();

    let events_path = cli.events.unwrap_or_else(|| config.events_path.clone());
    let store = InMemoryEventStore::from_path(&events_path)?;
    let registry = SenderRegistry::from_config(&config)?;
    info!(slugs = ?registry.slugs(), "senders registered");

    let object = read_object(&cli.object)?;
    let dispatcher = Dispatcher::new(Arc::new(store), Arc::new(registry));

    if cli.check {
        let rendered = dispatcher.handler(&object, &cli.identifier).preview().await?;
        for entry in rendered {
            println!("[{}] {}", entry.medium.slug, entry.text);
        }
        return Ok(());
    }

    let results = dispatcher.dispatch(&object, &cli.identifier).await?;
    info!(
        identifier = %cli.identifier,
        delivered = results.len(),
        "notification dispatched"
    );

    Ok(())
}
