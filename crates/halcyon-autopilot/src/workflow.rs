//! Named multi-step workflows.
//!
//! A workflow is a user-authored sequence of action steps run as a unit.
//! Steps get no special privilege: the engine proposes each one through
//! the normal authorization path, so blocked or rate-limited steps are
//! skipped rather than forced.

use std::sync::Mutex;

use halcyon_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub action_type: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A named sequence of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotWorkflow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    pub enabled: bool,
    pub run_count: u64,
    pub last_run_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl AutopilotWorkflow {
    pub fn new(name: &str, description: &str, steps: Vec<WorkflowStep>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            steps,
            enabled: true,
            run_count: 0,
            last_run_at: None,
            created_at: Timestamp::now(),
        }
    }
}

/// Outcome of one workflow run: how many steps the engine admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunReport {
    pub workflow_id: Uuid,
    pub steps_total: u32,
    /// Steps the engine accepted (executed, queued, or observed).
    pub steps_admitted: u32,
    /// Steps refused at admission (disabled, blocklisted, rate-limited).
    pub steps_skipped: u32,
}

/// In-memory workflow collection.
pub struct WorkflowBook {
    workflows: Mutex<Vec<AutopilotWorkflow>>,
}

impl WorkflowBook {
    pub fn new() -> Self {
        Self {
            workflows: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, workflow: AutopilotWorkflow) {
        self.workflows.lock().unwrap().push(workflow);
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let mut workflows = self.workflows.lock().unwrap();
        let before = workflows.len();
        workflows.retain(|w| w.id != id);
        workflows.len() < before
    }

    pub fn get(&self, id: Uuid) -> Option<AutopilotWorkflow> {
        self.workflows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == id)
            .cloned()
    }

    pub fn list(&self) -> Vec<AutopilotWorkflow> {
        self.workflows.lock().unwrap().clone()
    }

    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> bool {
        let mut workflows = self.workflows.lock().unwrap();
        match workflows.iter_mut().find(|w| w.id == id) {
            Some(workflow) => {
                workflow.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Replace the whole collection (used when loading persisted state).
    pub fn replace_all(&self, workflows: Vec<AutopilotWorkflow>) {
        *self.workflows.lock().unwrap() = workflows;
    }

    /// Bump run statistics after a run.
    pub fn record_run(&self, id: Uuid) {
        let mut workflows = self.workflows.lock().unwrap();
        if let Some(workflow) = workflows.iter_mut().find(|w| w.id == id) {
            workflow.run_count += 1;
            workflow.last_run_at = Some(Timestamp::now());
        }
    }
}

impl Default for WorkflowBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_workflow(name: &str) -> AutopilotWorkflow {
        AutopilotWorkflow::new(
            name,
            "test workflow",
            vec![
                WorkflowStep {
                    action_type: "file_move".to_string(),
                    description: "tidy downloads".to_string(),
                    parameters: serde_json::json!({"path": "~/Downloads"}),
                },
                WorkflowStep {
                    action_type: "notification".to_string(),
                    description: "report".to_string(),
                    parameters: serde_json::json!({}),
                },
            ],
        )
    }

    #[test]
    fn test_add_get_remove() {
        let book = WorkflowBook::new();
        let workflow = make_workflow("cleanup");
        let id = workflow.id;
        book.add(workflow);

        assert_eq!(book.get(id).unwrap().name, "cleanup");
        assert!(book.remove(id));
        assert!(book.get(id).is_none());
        assert!(!book.remove(id));
    }

    #[test]
    fn test_enable_disable() {
        let book = WorkflowBook::new();
        let workflow = make_workflow("cleanup");
        let id = workflow.id;
        book.add(workflow);

        assert!(book.set_enabled(id, false));
        assert!(!book.get(id).unwrap().enabled);
        assert!(!book.set_enabled(Uuid::new_v4(), true));
    }

    #[test]
    fn test_record_run() {
        let book = WorkflowBook::new();
        let workflow = make_workflow("cleanup");
        let id = workflow.id;
        book.add(workflow);

        book.record_run(id);
        let updated = book.get(id).unwrap();
        assert_eq!(updated.run_count, 1);
        assert!(updated.last_run_at.is_some());
    }

    #[test]
    fn test_workflow_serde_round_trip() {
        let workflow = make_workflow("cleanup");
        let json = serde_json::to_string(&workflow).unwrap();
        let rt: AutopilotWorkflow = serde_json::from_str(&json).unwrap();
        assert_eq!(rt.id, workflow.id);
        assert_eq!(rt.steps.len(), 2);
        assert_eq!(rt.steps[0].action_type, "file_move");
    }
}
