//! Call Client replay harness
//!
//! Runs a scripted call headlessly against the in-process loopback transport
//! and prints the final state as JSON.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing (`RUST_LOG`, falling back to `CALL_LOG_FILTER`)
//! 3. Read the script named by `CALL_REPLAY_SCRIPT`
//! 4. Replay it and print the report

#![warn(clippy::pedantic)]

use anyhow::Context;
use call_client::config::{Config, DEFAULT_LOG_FILTER};
use call_client::replay::{self, ReplayScript};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    let fallback_filter = config
        .as_ref()
        .map_or_else(|_| DEFAULT_LOG_FILTER.to_string(), |c| c.log_filter.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting call client replay");

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        mailbox_capacity = config.mailbox_capacity,
        early_track_policy = %config.early_track_policy,
        early_track_queue_limit = config.early_track_queue_limit,
        self_chat_label = %config.self_chat_label,
        "Configuration loaded successfully"
    );

    let path = config.require_replay_script()?.clone();
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read replay script {}", path.display()))?;
    let script: ReplayScript = serde_json::from_str(&raw)
        .with_context(|| format!("invalid replay script {}", path.display()))?;

    info!(steps = script.steps.len(), "Replay script loaded");

    let report = replay::run(script, config).await.map_err(|e| {
        error!(error = %e, "Replay failed");
        e
    })?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(
        call_id = %report.call_id,
        steps_run = report.steps_run,
        ended = report.ended,
        "Replay complete"
    );
    Ok(())
}
