pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod doc_processor;
pub mod i18n;
pub mod knowledge;
pub mod logging;
pub mod persistence;
pub mod session;
pub mod state;
pub mod terminal;

use anyhow::Context;
use api::AskClient;
use config::AppConfig;
use state::AppState;
use std::sync::Arc;
use tracing::{info, warn};

pub fn run() -> anyhow::Result<()> {
    logging::configure_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let client = AskClient::new(&config.ask_config()).context("Failed to build HTTP client")?;
    info!(endpoint = %client.endpoint(), "Using assistant endpoint");

    match client.health().await {
        Ok(health) => info!(
            status = %health.status,
            version = ?health.version,
            knowledge_base = ?health.knowledge_base,
            "Assistant backend reachable"
        ),
        Err(e) => warn!(error = %e, "Assistant backend health check failed"),
    }

    let state = AppState::from_config(&config, Arc::new(client));
    terminal::run_repl(&state, tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Terminal I/O failed")?;
    info!("Bye");
    Ok(())
}
