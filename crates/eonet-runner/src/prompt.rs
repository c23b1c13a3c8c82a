//! Explanation prompt templating via `minijinja`.
//!
//! A built-in template asks the agent for a JSON object with the answer
//! document keys. Operators can replace it without recompiling by placing
//! an `explain.j2` file in `TEMPLATES_DIR`; it receives the same context.

use minijinja::{Environment, ErrorKind, path_loader};
use serde_json::{Value, json};
use tracing::{debug, info};

use eonet_core::ExplainRequest;
use eonet_types::Lang;

use crate::error::RunnerError;

const BUILTIN_TEMPLATE: &str = "explain";
const OVERRIDE_TEMPLATE: &str = "explain.j2";

const EXPLAIN_TEMPLATE: &str = r#"You are an educational assistant.
You MUST answer with valid JSON only (no markdown, no extra text).
If you can't support a claim with the provided Event JSON or the attached Knowledge Base, say so in limitations.

{{ language_rule }}

JSON schema (exact keys):
{
  "summary": "string (1-3 lines)",
  "meaning": ["bullet", "bullet"],
  "how_to_read": ["bullet", "bullet"],
  "sources": [{"label":"string","url":"string"}],
  "limitations": ["bullet"],
  "next_steps": ["bullet"]
}

Guidance:
- Keep it friendly and non-technical.
- Explain: status/open/closed, geometry type, what sources mean.
- Add sources URLs from Event JSON (and KB docs if relevant).
- Don't invent precise causes/impacts. Provide general safety guidance only.

User question:
{{ question }}

Event JSON:
{{ event_json }}"#;

/// Renders explanation prompts.
pub struct PromptEngine {
    env: Environment<'static>,
    template: &'static str,
}

impl PromptEngine {
    /// Create an engine, preferring `explain.j2` from `templates_dir` when
    /// present.
    pub fn new(templates_dir: Option<&str>) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        env.add_template(BUILTIN_TEMPLATE, EXPLAIN_TEMPLATE)
            .map_err(|e| RunnerError::Template(format!("failed to add built-in template: {e}")))?;

        let mut template = BUILTIN_TEMPLATE;
        if let Some(dir) = templates_dir {
            env.set_loader(path_loader(dir.to_owned()));
            match env.get_template(OVERRIDE_TEMPLATE) {
                Ok(_) => {
                    info!(templates_dir = dir, "using explain.j2 override");
                    template = OVERRIDE_TEMPLATE;
                }
                Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                    debug!(templates_dir = dir, "no explain.j2 override, using built-in");
                }
                Err(e) => {
                    return Err(RunnerError::Template(format!(
                        "failed to load {dir}/{OVERRIDE_TEMPLATE}: {e}"
                    )));
                }
            }
        }

        Ok(Self { env, template })
    }

    /// Whether the on-disk override is in use.
    pub fn uses_override(&self) -> bool {
        self.template == OVERRIDE_TEMPLATE
    }

    /// Render the prompt for one request and the event's full record.
    pub fn render(&self, request: &ExplainRequest, event: &Value) -> Result<String, RunnerError> {
        let context = json!({
            "event_id": request.event_id.as_str(),
            "lang": request.lang.as_str(),
            "language_rule": language_rule(request.lang),
            "question": request.effective_question(),
            "event_json": serde_json::to_string_pretty(event)?,
        });

        self.env
            .get_template(self.template)
            .map_err(|e| RunnerError::Template(format!("missing {} template: {e}", self.template)))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{} render failed: {e}", self.template)))
    }
}

const fn language_rule(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Return content in English.",
        Lang::Es => "Devuelve el contenido en español.",
    }
}
