//! Headless explorer driver.
//!
//! Runs one pass of the interactive flow against real collaborators:
//! aggregate the configured query, apply the search, pick a selection, sync
//! the map, show the detail panel and, when an agent is configured, ask for
//! an explanation. Output is a plain-text report.

use std::io::Write;

use eonet_core::render::render_text;
use eonet_core::source::quick_questions;
use eonet_core::{EventSource, ExplanationSource, ExplanationState, ExplorerSession, Viewport};
use eonet_types::{Event, EventId, Lang};
use tracing::{info, warn};

use crate::agent::create_backend;
use crate::config::RunnerConfig;
use crate::eonet::{CategoryInfo, EonetClient};
use crate::error::RunnerError;
use crate::prompt::PromptEngine;

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events in the aggregated working set.
    pub events: usize,
    /// Events left after the search.
    pub visible: usize,
    /// Events with a marker on the map.
    pub mapped: usize,
    /// The selected event, if any.
    pub selected: Option<EventId>,
    /// Whether an explanation was applied.
    pub explained: bool,
}

/// Build the HTTP collaborators from config and run one pass.
pub async fn run<W: Write>(config: &RunnerConfig, out: &mut W) -> Result<RunSummary, RunnerError> {
    let catalog = EonetClient::new(&config.eonet_api_url, config.request_timeout)?;
    let prompts = PromptEngine::new(config.templates_dir.as_deref())?;
    info!(
        base_url = catalog.base_url(),
        template_override = prompts.uses_override(),
        "collaborators built"
    );

    let categories = match catalog.fetch_categories().await {
        Ok(categories) => {
            info!(count = categories.len(), "category catalog loaded");
            categories
        }
        Err(e) => {
            warn!(error = %e, "category catalog unavailable, using ids");
            Vec::new()
        }
    };

    let agent = create_backend(
        config.agent.as_ref(),
        config.request_timeout,
        catalog.clone(),
        prompts,
    )?;
    info!(
        backend = agent.name(),
        configured = agent.is_configured(),
        "explanation backend configured"
    );

    drive(config, &catalog, &agent, &categories, out).await
}

/// Run one pass against arbitrary collaborators.
pub async fn drive<E, X, W>(
    config: &RunnerConfig,
    source: &E,
    agent: &X,
    categories: &[CategoryInfo],
    out: &mut W,
) -> Result<RunSummary, RunnerError>
where
    E: EventSource,
    X: ExplanationSource,
    W: Write,
{
    let mut session = ExplorerSession::new(Viewport::default(), config.query.clone(), config.lang);
    writeln!(out, "{}", query_line(config, categories))?;

    session.refresh(source).await?;
    if let Some(search) = &config.search {
        session.set_search(search);
    }

    let visible = session.visible_events();
    writeln!(out, "Events: {} of {}", visible.len(), session.events().len())?;
    for event in &visible {
        writeln!(out, "{}", list_line(event))?;
    }
    let fallback = first_mappable(&session);
    let mut summary = RunSummary {
        events: session.events().len(),
        visible: visible.len(),
        mapped: session.map_points().len(),
        ..RunSummary::default()
    };

    let wanted = config.select.clone().or(fallback);
    if let Some(id) = &wanted
        && !session.select(id)
    {
        warn!(event_id = %id, "requested event is not in the working set");
    }

    let report = session.render();
    info!(
        markers = session.map().markers().len(),
        rebuilt = report.rebuilt,
        fitted = report.fitted,
        focused = report.focused,
        "map rendered"
    );

    let Some(detail) = session.detail() else {
        writeln!(out, "\nNo event selected.")?;
        return Ok(summary);
    };
    summary.selected = Some(detail.id.clone());

    writeln!(out, "\n# {}", detail.title)?;
    writeln!(out, "{}", detail.description)?;
    writeln!(out, "Event ID: {}", detail.id)?;
    writeln!(out, "State: {}", detail.status.as_str())?;
    writeln!(out, "Geometry: {}", detail.geometry_kind)?;
    match (detail.point, detail.map_link()) {
        (Some(p), Some(link)) => writeln!(out, "Location: {:.4}, {:.4} ({link})", p.lat, p.lon)?,
        _ => writeln!(out, "(No Point coords)")?,
    }

    if config.agent.is_none() {
        info!("no agent configured, skipping explanation");
        return Ok(summary);
    }

    writeln!(out)?;
    match session.explain(agent, config.question.as_deref()).await {
        Ok(ExplanationState::Ready { answer, .. }) => {
            writeln!(out, "{}", render_text(answer, config.lang))?;
            summary.explained = true;
        }
        Ok(_) => {}
        Err(e) => writeln!(out, "{}: {e}", failure_label(config.lang))?,
    }

    writeln!(out, "\n{}", quick_label(config.lang))?;
    for question in quick_questions(config.lang) {
        writeln!(out, "- {question}")?;
    }
    Ok(summary)
}

fn first_mappable(session: &ExplorerSession<Viewport>) -> Option<EventId> {
    let points = session.map_points();
    session
        .visible_events()
        .into_iter()
        .find(|e| points.iter().any(|p| p.id == e.id))
        .map(|e| e.id.clone())
}

fn query_line(config: &RunnerConfig, categories: &[CategoryInfo]) -> String {
    let names: Vec<&str> = config
        .query
        .categories
        .iter()
        .map(|id| {
            categories
                .iter()
                .find(|c| c.id == id.as_str())
                .map_or(id.as_str(), |c| c.title.as_str())
        })
        .collect();
    let names = if names.is_empty() {
        "all".to_owned()
    } else {
        names.join(", ")
    };
    format!(
        "Categories: {names} | status: {} | last {} days",
        config.query.status.as_str(),
        config.query.window_days
    )
}

fn list_line(event: &Event) -> String {
    format!("- [{}] {} ({})", event.id, event.title, event.status.as_str())
}

const fn failure_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Explanation failed",
        Lang::Es => "No se pudo generar la explicación",
    }
}

const fn quick_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "Quick questions:",
        Lang::Es => "Preguntas rápidas:",
    }
}
