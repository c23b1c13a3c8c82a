//! Configuration types for the explorer runner.
//!
//! All configuration is loaded from environment variables. The runner needs
//! to know where the EONET catalog lives, how to reach the explanation agent
//! (if at all), and which query and selection to drive the session with.

use std::time::Duration;

use eonet_types::{EventId, EventQuery, Lang, StatusFilter, SUPPORTED_CATEGORIES};

use crate::error::RunnerError;

/// Default EONET API base URL.
pub const DEFAULT_EONET_API_URL: &str = "https://eonet.gsfc.nasa.gov/api/v3";

/// Default per-request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// EONET API base URL, without a trailing slash.
    pub eonet_api_url: String,
    /// Explanation agent, if both endpoint and key are set.
    pub agent: Option<AgentConfig>,
    /// Feed query to aggregate.
    pub query: EventQuery,
    /// Reply language.
    pub lang: Lang,
    /// Free-text title filter for the list.
    pub search: Option<String>,
    /// Event to select instead of the first mappable one.
    pub select: Option<EventId>,
    /// Question to ask the agent about the selection.
    pub question: Option<String>,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Directory holding an `explain.j2` prompt override.
    pub templates_dir: Option<String>,
}

/// Connection details for the explanation agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Agent base URL, without a trailing slash.
    pub endpoint: String,
    /// Bearer access key.
    pub access_key: String,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `EONET_API_URL` -- catalog base URL (default `https://eonet.gsfc.nasa.gov/api/v3`)
    /// - `DO_AGENT_ENDPOINT`, `DO_AGENT_ACCESS_KEY` -- explanation agent; both
    ///   are needed to enable explanations
    /// - `EXPLORER_CATEGORIES` -- CSV of category ids (default: all supported)
    /// - `EXPLORER_STATUS` -- `open`, `closed` or `all` (default `open`)
    /// - `EXPLORER_DAYS` -- look-back window, clamped to 1..=365 (default 7)
    /// - `EXPLORER_LANG` -- `en` for English, anything else for Spanish
    /// - `EXPLORER_SEARCH`, `EXPLORER_SELECT`, `EXPLORER_QUESTION`
    /// - `REQUEST_TIMEOUT_MS` -- HTTP timeout in milliseconds (default 15000)
    /// - `TEMPLATES_DIR` -- directory with an `explain.j2` override
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let eonet_api_url = var("EONET_API_URL")
            .unwrap_or_else(|| DEFAULT_EONET_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let agent = match (var("DO_AGENT_ENDPOINT"), var("DO_AGENT_ACCESS_KEY")) {
            (Some(endpoint), Some(access_key)) => Some(AgentConfig {
                endpoint: endpoint.trim_end_matches('/').to_owned(),
                access_key,
            }),
            _ => None,
        };

        let categories = lookup("EXPLORER_CATEGORIES").map_or_else(
            || SUPPORTED_CATEGORIES.iter().map(|c| (*c).into()).collect(),
            |csv| EventQuery::parse_categories(&csv),
        );
        let status = var("EXPLORER_STATUS")
            .map_or_else(StatusFilter::default, |s| StatusFilter::parse_lenient(&s));
        let window_days = EventQuery::parse_window_days(var("EXPLORER_DAYS").as_deref());

        let request_timeout_ms: u64 = var("REQUEST_TIMEOUT_MS")
            .map_or(Ok(DEFAULT_REQUEST_TIMEOUT_MS), |v| v.parse())
            .map_err(|e| RunnerError::Config(format!("invalid REQUEST_TIMEOUT_MS: {e}")))?;

        Ok(Self {
            eonet_api_url,
            agent,
            query: EventQuery::new(categories, status, window_days),
            lang: Lang::parse_lenient(var("EXPLORER_LANG").as_deref()),
            search: var("EXPLORER_SEARCH"),
            select: var("EXPLORER_SELECT").map(EventId::new),
            question: var("EXPLORER_QUESTION"),
            request_timeout: Duration::from_millis(request_timeout_ms),
            templates_dir: var("TEMPLATES_DIR"),
        })
    }
}
