//! Away-session tracking.
//!
//! While the user is marked away, actions, suggestions, and observations
//! are folded into one session; ending the session reduces it to a summary
//! for review. At most one session is open at a time.

use std::sync::Mutex;

use halcyon_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{ActionStatus, AutopilotAction, Suggestion};

/// A per-action record inside an away session, upserted by action id so the
/// summary sees each action's latest status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAction {
    pub action_id: Uuid,
    pub action_type: String,
    pub description: String,
    pub status: ActionStatus,
}

/// One away interval and everything that happened in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwaySession {
    pub id: Uuid,
    pub reason: Option<String>,
    pub started_at: Timestamp,
    pub actions: Vec<RecordedAction>,
    pub suggestions: Vec<Suggestion>,
    pub observations: Vec<String>,
    /// Set when the session ended abnormally (engine shutdown mid-session).
    pub interrupted: bool,
}

/// What the user sees on return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwaySessionSummary {
    pub session_id: Uuid,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    pub total_actions: u32,
    pub successful_actions: u32,
    pub failed_actions: u32,
    pub pending_approvals: u32,
    pub suggestions: u32,
    pub observations: u32,
    /// What went well, in prose.
    pub highlights: Vec<String>,
    /// What went wrong or still needs a decision.
    pub issues: Vec<String>,
    pub interrupted: bool,
}

/// Owns the current away session; at most one open at a time.
pub struct AwayTracker {
    current: Mutex<Option<AwaySession>>,
}

impl AwayTracker {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Open a session. Idempotent: a second `start` while one is open is a
    /// logged no-op returning `false`.
    pub fn start(&self, reason: Option<String>) -> bool {
        let mut current = self.current.lock().unwrap();
        if current.is_some() {
            debug!("Away session already open; start ignored");
            return false;
        }
        let session = AwaySession {
            id: Uuid::new_v4(),
            reason,
            started_at: Timestamp::now(),
            actions: Vec::new(),
            suggestions: Vec::new(),
            observations: Vec::new(),
            interrupted: false,
        };
        info!(session_id = %session.id, "Away session started");
        *current = Some(session);
        true
    }

    pub fn is_active(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    /// Record an action outcome, upserting by action id. No-op without an
    /// open session.
    pub fn record_action(&self, action: &AutopilotAction) {
        let mut current = self.current.lock().unwrap();
        let Some(session) = current.as_mut() else {
            return;
        };
        match session
            .actions
            .iter_mut()
            .find(|r| r.action_id == action.id)
        {
            Some(existing) => existing.status = action.status,
            None => session.actions.push(RecordedAction {
                action_id: action.id,
                action_type: action.action_type.clone(),
                description: action.description.clone(),
                status: action.status,
            }),
        }
    }

    /// No-op without an open session.
    pub fn record_suggestion(&self, suggestion: &Suggestion) {
        if let Some(session) = self.current.lock().unwrap().as_mut() {
            session.suggestions.push(suggestion.clone());
        }
    }

    /// No-op without an open session.
    pub fn record_observation(&self, observation: &str) {
        if let Some(session) = self.current.lock().unwrap().as_mut() {
            session.observations.push(observation.to_string());
        }
    }

    /// Close the session and reduce it to a summary. `None` if no session
    /// was open.
    pub fn end(&self) -> Option<AwaySessionSummary> {
        self.close(false)
    }

    /// Close abnormally (engine shutdown mid-session).
    pub fn end_interrupted(&self) -> Option<AwaySessionSummary> {
        self.close(true)
    }

    fn close(&self, interrupted: bool) -> Option<AwaySessionSummary> {
        let session = self.current.lock().unwrap().take()?;

        let successful = session
            .actions
            .iter()
            .filter(|r| r.status == ActionStatus::Completed)
            .count() as u32;
        let failed = session
            .actions
            .iter()
            .filter(|r| r.status == ActionStatus::Failed)
            .count() as u32;
        let pending = session
            .actions
            .iter()
            .filter(|r| r.status == ActionStatus::AwaitingApproval)
            .count() as u32;

        let highlights: Vec<String> = session
            .actions
            .iter()
            .filter(|r| r.status == ActionStatus::Completed)
            .take(5)
            .map(|r| r.description.clone())
            .collect();

        let mut issues: Vec<String> = session
            .actions
            .iter()
            .filter(|r| r.status == ActionStatus::Failed)
            .map(|r| format!("failed: {}", r.description))
            .collect();
        if pending > 0 {
            issues.push(format!("{} action(s) still waiting for approval", pending));
        }

        let summary = AwaySessionSummary {
            session_id: session.id,
            started_at: session.started_at,
            ended_at: Timestamp::now(),
            total_actions: session.actions.len() as u32,
            successful_actions: successful,
            failed_actions: failed,
            pending_approvals: pending,
            suggestions: session.suggestions.len() as u32,
            observations: session.observations.len() as u32,
            highlights,
            issues,
            interrupted: interrupted || session.interrupted,
        };
        info!(
            session_id = %summary.session_id,
            total = summary.total_actions,
            interrupted = summary.interrupted,
            "Away session ended"
        );
        Some(summary)
    }
}

impl Default for AwayTracker {
    fn default() -> Self {
        Self::new()
    }
}
