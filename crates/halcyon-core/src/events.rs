use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Domain events emitted by the autopilot core.
///
/// This is the entire surface the surrounding application (tray, chat,
/// voice) consumes; nothing outside the core reaches into engine internals.
/// Events are delivered over a broadcast channel and may also be folded
/// into an event log for debugging.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// An action was queued and is waiting for user approval.
    ActionPending {
        action_id: Uuid,
        action_type: String,
        description: String,
        risk: Option<String>,
        timestamp: Timestamp,
    },

    /// An action finished executing successfully.
    ActionExecuted {
        action_id: Uuid,
        action_type: String,
        auto_executed: bool,
        timestamp: Timestamp,
    },

    /// An action's execution failed.
    ActionFailed {
        action_id: Uuid,
        action_type: String,
        error: String,
        timestamp: Timestamp,
    },

    /// The engine produced a proactive, informational suggestion.
    SuggestionGenerated {
        suggestion_id: Uuid,
        title: String,
        timestamp: Timestamp,
    },

    /// Engine status changed (enabled, disabled, paused after error).
    StatusChanged { status: String, timestamp: Timestamp },

    /// An away session ended and its summary is available.
    AwaySummaryReady {
        session_id: Uuid,
        total_actions: u32,
        successful_actions: u32,
        failed_actions: u32,
        timestamp: Timestamp,
    },
}

impl DomainEvent {
    /// Short name used in logs and the event console.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::ActionPending { .. } => "action_pending",
            DomainEvent::ActionExecuted { .. } => "action_executed",
            DomainEvent::ActionFailed { .. } => "action_failed",
            DomainEvent::SuggestionGenerated { .. } => "suggestion_generated",
            DomainEvent::StatusChanged { .. } => "status_changed",
            DomainEvent::AwaySummaryReady { .. } => "away_summary_ready",
        }
    }
}
