//! Selection state and the explanation lifecycle bound to it.
//!
//! Every selection change bumps an epoch. An explanation request captures
//! the epoch in its [`ExplainTicket`]; a reply is applied only if the epoch
//! and selected id still match when it arrives, so the latest selection
//! always wins over out-of-order completions.

use eonet_types::{Event, EventId, Lang, ParsedAnswer, SelectionState};
use serde_json::Value;
use tracing::debug;

use crate::answer::normalize_answer;
use crate::error::ExplorerError;
use crate::source::{ExplainRequest, Explanation};

/// Proof that an explanation request was started for a specific selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainTicket {
    epoch: u64,
    request: ExplainRequest,
}

impl ExplainTicket {
    /// The request to send to the explanation agent.
    pub const fn request(&self) -> &ExplainRequest {
        &self.request
    }

    /// The event this ticket was issued for.
    pub const fn event_id(&self) -> &EventId {
        &self.request.event_id
    }

    /// Selection epoch at issue time.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Explanation state for the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExplanationState {
    /// Nothing requested for the current selection.
    #[default]
    Idle,
    /// A request is outstanding.
    Pending {
        /// Event being explained.
        event_id: EventId,
    },
    /// The agent replied.
    Ready {
        /// Event that was explained.
        event_id: EventId,
        /// Normalized reply.
        answer: ParsedAnswer,
        /// The reply exactly as received.
        raw_text: String,
        /// Retrieval metadata passed through from the agent.
        retrieval: Option<Value>,
    },
    /// The request failed; retry by requesting again.
    Failed {
        /// Event that was being explained.
        event_id: EventId,
        /// User-presentable failure message.
        message: String,
    },
}

impl ExplanationState {
    /// Whether a request is outstanding.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The normalized answer, once ready.
    pub const fn answer(&self) -> Option<&ParsedAnswer> {
        match self {
            Self::Ready { answer, .. } => Some(answer),
            _ => None,
        }
    }
}

/// What happened to a completed explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The reply matched the current selection and was stored.
    Applied,
    /// The selection moved on; the reply was dropped.
    Discarded,
}

/// Owner of [`SelectionState`] and the explanation for it.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    epoch: u64,
    explanation: ExplanationState,
}

impl SelectionController {
    /// Controller with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an event. Returns `false` if it was already selected.
    ///
    /// Any outstanding or finished explanation is invalidated.
    pub fn select(&mut self, id: EventId) -> bool {
        if self.state.selected_id.as_ref() == Some(&id) {
            return false;
        }
        debug!(event_id = %id, "event selected");
        self.state.selected_id = Some(id);
        self.invalidate();
        true
    }

    /// Clear the selection. Returns `false` if nothing was selected.
    pub fn clear(&mut self) -> bool {
        if self.state.selected_id.take().is_none() {
            return false;
        }
        debug!("selection cleared");
        self.invalidate();
        true
    }

    /// Heal a dangling selection against a new working set.
    ///
    /// Returns `true` if the selection was cleared.
    pub fn reconcile(&mut self, events: &[Event]) -> bool {
        let Some(selected) = &self.state.selected_id else {
            return false;
        };
        if events.iter().any(|e| &e.id == selected) {
            return false;
        }
        debug!(event_id = %selected, "selected event left the working set");
        self.clear()
    }

    /// Currently selected id.
    pub const fn selected(&self) -> Option<&EventId> {
        self.state.selected_id.as_ref()
    }

    /// The full selection state.
    pub const fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Selection epoch; increases on every change.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Explanation state for the current selection.
    pub const fn explanation(&self) -> &ExplanationState {
        &self.explanation
    }

    /// Start an explanation request for the current selection.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::NothingSelected`] with no selection and
    /// [`ExplorerError::ExplanationInFlight`] while a request for the same
    /// selection is outstanding.
    pub fn begin_explanation(
        &mut self,
        question: Option<&str>,
        lang: Lang,
    ) -> Result<ExplainTicket, ExplorerError> {
        let event_id = self
            .state
            .selected_id
            .clone()
            .ok_or(ExplorerError::NothingSelected)?;
        if self.explanation.is_pending() {
            return Err(ExplorerError::ExplanationInFlight(event_id.into_inner()));
        }

        self.explanation = ExplanationState::Pending {
            event_id: event_id.clone(),
        };
        Ok(ExplainTicket {
            epoch: self.epoch,
            request: ExplainRequest::new(event_id, question, lang),
        })
    }

    /// Apply a finished request, unless the selection moved on since the
    /// ticket was issued.
    pub fn complete_explanation(
        &mut self,
        ticket: &ExplainTicket,
        result: Result<Explanation, ExplorerError>,
    ) -> Completion {
        if ticket.epoch != self.epoch || self.selected() != Some(ticket.event_id()) {
            debug!(
                event_id = %ticket.event_id(),
                ticket_epoch = ticket.epoch,
                current_epoch = self.epoch,
                "discarding stale explanation"
            );
            return Completion::Discarded;
        }

        let event_id = ticket.event_id().clone();
        self.explanation = match result {
            Ok(reply) => ExplanationState::Ready {
                event_id,
                answer: normalize_answer(&reply.raw_text),
                raw_text: reply.raw_text,
                retrieval: reply.retrieval,
            },
            Err(err) => ExplanationState::Failed {
                event_id,
                message: err.to_string(),
            },
        };
        Completion::Applied
    }

    /// Abandon the request a ticket was issued for.
    ///
    /// Returns to idle only if the ticket's request is still the pending
    /// one; the epoch moves on so a late reply for it is discarded.
    /// Returns whether anything was cancelled.
    pub fn cancel_explanation(&mut self, ticket: &ExplainTicket) -> bool {
        let pending_for_ticket = matches!(
            &self.explanation,
            ExplanationState::Pending { event_id } if event_id == ticket.event_id()
        );
        if ticket.epoch != self.epoch || !pending_for_ticket {
            return false;
        }
        debug!(event_id = %ticket.event_id(), epoch = self.epoch, "explanation cancelled");
        self.invalidate();
        true
    }

    /// Drop the explanation without touching the selection.
    pub fn reset_explanation(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.epoch = self.epoch.saturating_add(1);
        self.explanation = ExplanationState::Idle;
    }
}
