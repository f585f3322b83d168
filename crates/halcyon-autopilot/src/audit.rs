//! Append-only audit log of authorization decisions.
//!
//! One entry per terminal action outcome (or per observed-only action),
//! capturing the reasoning so decisions stay explainable after the fact.
//! Entries are never updated or deleted in normal operation; data-retention
//! purges happen outside this component.

use std::sync::Mutex;

use halcyon_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ActionContext, AutonomyLevel, AutopilotAction};

/// Immutable record of one authorization decision and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action_id: Uuid,
    pub action_type: String,
    pub description: String,
    /// Why the engine wanted to do this.
    pub reasoning: String,
    pub rule_id: Option<Uuid>,
    pub autonomy: AutonomyLevel,
    pub auto_executed: bool,
    /// Whether the action ran and succeeded. Observed-only and rejected
    /// actions carry `false` here with the outcome note explaining why.
    pub success: bool,
    /// Terminal outcome note, e.g. "observed only", "rejected: too risky".
    pub outcome: String,
    pub context: ActionContext,
    pub created_at: Timestamp,
}

/// Append-only in-memory log, written through a single entry point.
pub struct AuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append one entry for an action's terminal outcome.
    pub fn record(&self, action: &AutopilotAction, outcome: &str, success: bool) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            action_id: action.id,
            action_type: action.action_type.clone(),
            description: action.description.clone(),
            reasoning: action.reasoning.clone(),
            rule_id: action.rule_id,
            autonomy: action.required_level,
            auto_executed: action.auto_executed,
            success,
            outcome: outcome.to_string(),
            context: action.context.clone(),
            created_at: Timestamp::now(),
        };
        self.entries.lock().unwrap().push(entry);
    }

    /// The most recent `count` entries, newest first.
    pub fn recent(&self, count: usize) -> Vec<AuditLogEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full copy for persistence.
    pub fn snapshot(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Seed the log from persisted entries (startup only).
    pub fn restore(&self, entries: Vec<AuditLogEntry>) {
        *self.entries.lock().unwrap() = entries;
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
