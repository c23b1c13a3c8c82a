//! Error types for the explorer runner.
//!
//! Uses `thiserror` for typed errors that surface through the runner: config
//! loading, catalog and agent HTTP calls, prompt rendering and output.

use eonet_core::ExplorerError;

/// Errors that can occur while running the explorer.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The EONET catalog could not be reached or returned a failure.
    #[error("EONET error: {0}")]
    Http(String),

    /// The explanation agent could not be reached or returned a failure.
    #[error("agent error: {0}")]
    Agent(String),

    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Writing the report failed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    /// A session operation failed.
    #[error(transparent)]
    Explorer(#[from] ExplorerError),
}
