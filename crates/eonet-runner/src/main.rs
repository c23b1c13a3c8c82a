//! Headless driver for the EONET natural-event explorer.
//!
//! Performs one pass of the explorer flow against the live EONET catalog
//! and, when configured, the explanation agent, and prints a plain-text
//! report to stdout.
//!
//! # Architecture
//!
//! ```text
//! EONET feeds --> Aggregator --> Session (search, selection, map) --> Report
//!                                   |
//!                   event detail --> Prompt --> Agent --> Normalizer
//! ```
//!
//! A failed feed fails the pass; a failed explanation is reported inline.

mod agent;
mod config;
mod eonet;
mod error;
mod explorer;
mod prompt;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// then runs one explorer pass.
///
/// # Errors
///
/// Returns an error if configuration, the feed fetch or report output fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("eonet-runner starting");

    let config = RunnerConfig::from_env()?;
    info!(
        eonet_api_url = config.eonet_api_url,
        categories = config.query.categories.len(),
        status = config.query.status.as_str(),
        window_days = config.query.window_days,
        lang = config.lang.as_str(),
        agent_configured = config.agent.is_some(),
        "configuration loaded"
    );

    let mut stdout = std::io::stdout().lock();
    let summary = explorer::run(&config, &mut stdout).await?;
    info!(
        events = summary.events,
        visible = summary.visible,
        mapped = summary.mapped,
        selected = summary.selected.as_ref().map(|id| id.as_str()),
        explained = summary.explained,
        "explorer pass complete"
    );

    Ok(())
}
