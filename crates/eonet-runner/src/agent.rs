//! Explanation agent client.
//!
//! Uses enum dispatch, mirroring how the rest of the runner picks a backend
//! at startup: an [`ExplanationBackend`] is either a configured
//! [`AgentClient`] or `Unconfigured`, which fails every request with the
//! same message the UI shows when the agent env vars are missing.
//!
//! The agent speaks an OpenAI-style chat completions dialect at
//! `{endpoint}/api/v1/chat/completions`. Its reply text is returned
//! unmodified; normalization happens in the core.

use std::time::Duration;

use eonet_core::{ExplainRequest, Explanation, ExplanationSource, ExplorerError};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::eonet::EonetClient;
use crate::error::RunnerError;
use crate::prompt::PromptEngine;

/// Failure message when the agent is not configured.
pub const MISSING_AGENT: &str = "Missing agent env vars";

// ---------------------------------------------------------------------------
// Backend enum
// ---------------------------------------------------------------------------

/// Where explanation requests go.
pub enum ExplanationBackend {
    /// A reachable agent.
    Agent(AgentClient),
    /// No agent configured; every request fails.
    Unconfigured,
}

impl ExplanationBackend {
    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Agent(_) => "chat-completions-agent",
            Self::Unconfigured => "unconfigured",
        }
    }

    /// Whether requests can succeed at all.
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Agent(_))
    }
}

impl ExplanationSource for ExplanationBackend {
    async fn explain(&self, request: &ExplainRequest) -> Result<Explanation, ExplorerError> {
        match self {
            Self::Agent(agent) => agent.explain(request).await.map_err(|e| {
                warn!(event_id = %request.event_id, error = %e, "explanation failed");
                ExplorerError::Explanation(e.to_string())
            }),
            Self::Unconfigured => Err(ExplorerError::Explanation(MISSING_AGENT.to_owned())),
        }
    }
}

/// Create the backend for an optional agent configuration.
///
/// `timeout` bounds every agent request, matching the catalog client.
pub fn create_backend(
    config: Option<&AgentConfig>,
    timeout: Duration,
    catalog: EonetClient,
    prompts: PromptEngine,
) -> Result<ExplanationBackend, RunnerError> {
    match config {
        Some(cfg) => Ok(ExplanationBackend::Agent(AgentClient::new(
            cfg, timeout, catalog, prompts,
        )?)),
        None => Ok(ExplanationBackend::Unconfigured),
    }
}

// ---------------------------------------------------------------------------
// Chat completions agent
// ---------------------------------------------------------------------------

/// Client for one explanation agent deployment.
pub struct AgentClient {
    client: reqwest::Client,
    timeout: Duration,
    chat_url: String,
    access_key: String,
    catalog: EonetClient,
    prompts: PromptEngine,
}

impl AgentClient {
    /// Create a client. The catalog client supplies the event detail that
    /// is embedded in every prompt.
    pub fn new(
        config: &AgentConfig,
        timeout: Duration,
        catalog: EonetClient,
        prompts: PromptEngine,
    ) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunnerError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout,
            chat_url: chat_url(&config.endpoint),
            access_key: config.access_key.clone(),
            catalog,
            prompts,
        })
    }

    /// Upper bound on each agent request.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the event, render the prompt and ask the agent.
    async fn explain(&self, request: &ExplainRequest) -> Result<Explanation, RunnerError> {
        let event = self.catalog.fetch_event(request.event_id.as_str()).await?;
        let prompt = self.prompts.render(request, &event)?;

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.access_key)
            .json(&request_body(&prompt))
            .send()
            .await
            .map_err(|e| RunnerError::Agent(format!("agent request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::Agent(format!("agent returned {status}: {detail}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RunnerError::Agent(format!("agent response parse failed: {e}")))?;

        let explanation = Explanation {
            raw_text: extract_content(&body),
            retrieval: extract_retrieval(&body),
        };
        info!(
            event_id = %request.event_id,
            raw_len = explanation.raw_text.len(),
            has_retrieval = explanation.retrieval.is_some(),
            "explanation received"
        );
        Ok(explanation)
    }
}

/// Chat completions URL for an agent endpoint.
pub fn chat_url(endpoint: &str) -> String {
    format!("{}/api/v1/chat/completions", endpoint.trim_end_matches('/'))
}

/// Request body for one prompt.
pub fn request_body(prompt: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": prompt}],
        "stream": false,
        "include_retrieval_info": true,
        "include_guardrails_info": true
    })
}

/// Reply text at `choices[0].message.content`; empty when absent.
pub fn extract_content(body: &Value) -> String {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Retrieval metadata from `retrieval`, else `retrieval_info`.
pub fn extract_retrieval(body: &Value) -> Option<Value> {
    ["retrieval", "retrieval_info"]
        .iter()
        .find_map(|key| body.get(*key).filter(|v| !v.is_null()))
        .cloned()
}
