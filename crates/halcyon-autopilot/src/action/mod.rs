//! Action lifecycle management.
//!
//! In-memory store for proposed actions, with state transitions validated
//! by the state machine. The engine is the only writer; queries are served
//! from cloned snapshots.

pub mod state_machine;

use crate::action::state_machine::validate_transition;
use crate::error::ActionError;
use crate::types::{ActionStatus, AutopilotAction};
use halcyon_core::error::HalcyonError;
use halcyon_core::types::Timestamp;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory action store with lifecycle management.
pub struct ActionStore {
    actions: Mutex<Vec<AutopilotAction>>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AutopilotAction>>, ActionError> {
        self.actions
            .lock()
            .map_err(|e| ActionError::Storage(HalcyonError::Storage(format!("Lock poisoned: {}", e))))
    }

    /// Insert a freshly constructed action.
    pub fn insert(&self, action: AutopilotAction) -> Result<(), ActionError> {
        self.lock()?.push(action);
        Ok(())
    }

    /// Get an action by ID.
    pub fn get(&self, id: Uuid) -> Result<AutopilotAction, ActionError> {
        self.lock()?
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(ActionError::NotFound(id))
    }

    /// Update an action's status with state machine validation.
    ///
    /// Terminal statuses stamp `completed_at`; `Approved` sets the approved
    /// flag.
    pub fn update_status(
        &self,
        id: Uuid,
        new_status: ActionStatus,
    ) -> Result<AutopilotAction, ActionError> {
        let mut actions = self.lock()?;
        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ActionError::NotFound(id))?;

        validate_transition(action.status, new_status)?;
        action.status = new_status;

        if new_status == ActionStatus::Approved {
            action.approved = true;
        }
        if new_status.is_terminal() {
            action.completed_at = Some(Timestamp::now());
        }

        Ok(action.clone())
    }

    /// Transition `Executing -> Completed` and record the executor output.
    pub fn complete(
        &self,
        id: Uuid,
        output: Option<String>,
    ) -> Result<AutopilotAction, ActionError> {
        let mut actions = self.lock()?;
        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ActionError::NotFound(id))?;

        validate_transition(action.status, ActionStatus::Completed)?;
        action.status = ActionStatus::Completed;
        action.output = output;
        action.completed_at = Some(Timestamp::now());
        Ok(action.clone())
    }

    /// Transition `Executing -> Failed` and record the error message.
    pub fn fail(&self, id: Uuid, error: String) -> Result<AutopilotAction, ActionError> {
        let mut actions = self.lock()?;
        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ActionError::NotFound(id))?;

        validate_transition(action.status, ActionStatus::Failed)?;
        action.status = ActionStatus::Failed;
        action.error = Some(error);
        action.completed_at = Some(Timestamp::now());
        Ok(action.clone())
    }

    /// List actions, optionally filtered by status, newest first.
    pub fn list(&self, status: Option<ActionStatus>, limit: Option<usize>) -> Vec<AutopilotAction> {
        let actions = match self.actions.lock() {
            Ok(a) => a,
            Err(_) => return vec![],
        };

        let mut result: Vec<AutopilotAction> = actions
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(limit) = limit {
            result.truncate(limit);
        }
        result
    }

    /// The approval queue: actions awaiting a decision, oldest first.
    pub fn pending(&self) -> Vec<AutopilotAction> {
        let actions = match self.actions.lock() {
            Ok(a) => a,
            Err(_) => return vec![],
        };
        actions
            .iter()
            .filter(|a| a.status == ActionStatus::AwaitingApproval)
            .cloned()
            .collect()
    }

    /// Cancel queued approvals older than `ttl_minutes`, returning their IDs.
    pub fn expire_stale(&self, ttl_minutes: i64) -> Vec<Uuid> {
        let mut actions = match self.actions.lock() {
            Ok(a) => a,
            Err(_) => return vec![],
        };

        let cutoff = Timestamp::now().0 - ttl_minutes * 60;
        let mut expired = Vec::new();

        for action in actions.iter_mut() {
            if action.status == ActionStatus::AwaitingApproval && action.created_at.0 < cutoff {
                if validate_transition(action.status, ActionStatus::Cancelled).is_ok() {
                    action.status = ActionStatus::Cancelled;
                    action.completed_at = Some(Timestamp::now());
                    expired.push(action.id);
                }
            }
        }

        expired
    }
}

impl Default for ActionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionContext, AutonomyLevel};

    fn make_action(action_type: &str) -> AutopilotAction {
        AutopilotAction {
            id: Uuid::new_v4(),
            action_type: action_type.to_string(),
            description: format!("test {}", action_type),
            reasoning: "because the test says so".to_string(),
            parameters: serde_json::json!({}),
            context: ActionContext::default(),
            required_level: AutonomyLevel::Ask,
            auto_executed: false,
            approved: false,
            rule_id: None,
            assessment: None,
            status: ActionStatus::Pending,
            created_at: Timestamp::now(),
            completed_at: None,
            output: None,
            error: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = ActionStore::new();
        let action = make_action("file_write");
        let id = action.id;
        store.insert(action).unwrap();

        let found = store.get(id).unwrap();
        assert_eq!(found.action_type, "file_write");
        assert_eq!(found.status, ActionStatus::Pending);
    }

    #[test]
    fn test_get_not_found() {
        let store = ActionStore::new();
        let result = store.get(Uuid::new_v4());
        assert!(matches!(result.unwrap_err(), ActionError::NotFound(_)));
    }

    #[test]
    fn test_approval_path_sets_flags() {
        let store = ActionStore::new();
        let action = make_action("shell_command");
        let id = action.id;
        store.insert(action).unwrap();

        store
            .update_status(id, ActionStatus::AwaitingApproval)
            .unwrap();
        let approved = store.update_status(id, ActionStatus::Approved).unwrap();
        assert!(approved.approved);
        assert!(approved.completed_at.is_none());

        store.update_status(id, ActionStatus::Executing).unwrap();
        let done = store.complete(id, Some("ok".to_string())).unwrap();
        assert_eq!(done.status, ActionStatus::Completed);
        assert_eq!(done.output.as_deref(), Some("ok"));
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_fail_records_error() {
        let store = ActionStore::new();
        let action = make_action("shell_command");
        let id = action.id;
        store.insert(action).unwrap();

        store.update_status(id, ActionStatus::Executing).unwrap();
        let failed = store.fail(id, "exit code 1".to_string()).unwrap();
        assert_eq!(failed.status, ActionStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("exit code 1"));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let store = ActionStore::new();
        let action = make_action("file_read");
        let id = action.id;
        store.insert(action).unwrap();

        // Pending -> Failed is not a legal route.
        let result = store.update_status(id, ActionStatus::Failed);
        assert!(matches!(
            result.unwrap_err(),
            ActionError::InvalidTransition(_, _)
        ));
    }

    #[test]
    fn test_terminal_is_immutable() {
        let store = ActionStore::new();
        let action = make_action("file_read");
        let id = action.id;
        store.insert(action).unwrap();

        store.update_status(id, ActionStatus::Completed).unwrap();
        assert!(store.update_status(id, ActionStatus::Executing).is_err());
        assert!(store.complete(id, None).is_err());
        assert!(store.fail(id, "nope".to_string()).is_err());
    }

    #[test]
    fn test_pending_queue_oldest_first() {
        let store = ActionStore::new();
        let mut first = make_action("a");
        first.created_at = Timestamp(1000);
        let mut second = make_action("b");
        second.created_at = Timestamp(2000);
        let (id1, id2) = (first.id, second.id);

        store.insert(first).unwrap();
        store.insert(second).unwrap();
        store.update_status(id1, ActionStatus::AwaitingApproval).unwrap();
        store.update_status(id2, ActionStatus::AwaitingApproval).unwrap();

        let pending = store.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, id1);
        assert_eq!(pending[1].id, id2);
    }

    #[test]
    fn test_list_filters_and_limits() {
        let store = ActionStore::new();
        for i in 0..5 {
            let mut action = make_action("x");
            action.created_at = Timestamp(i);
            store.insert(action).unwrap();
        }

        let all = store.list(None, None);
        assert_eq!(all.len(), 5);
        // Newest first.
        assert_eq!(all[0].created_at, Timestamp(4));

        let limited = store.list(Some(ActionStatus::Pending), Some(2));
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_expire_stale_cancels_old_pending() {
        let store = ActionStore::new();
        let mut old = make_action("old");
        old.created_at = Timestamp(Timestamp::now().0 - 7200);
        let old_id = old.id;
        let fresh = make_action("fresh");
        let fresh_id = fresh.id;

        store.insert(old).unwrap();
        store.insert(fresh).unwrap();
        store
            .update_status(old_id, ActionStatus::AwaitingApproval)
            .unwrap();
        store
            .update_status(fresh_id, ActionStatus::AwaitingApproval)
            .unwrap();

        let expired = store.expire_stale(60);
        assert_eq!(expired, vec![old_id]);
        assert_eq!(
            store.get(old_id).unwrap().status,
            ActionStatus::Cancelled
        );
        assert_eq!(
            store.get(fresh_id).unwrap().status,
            ActionStatus::AwaitingApproval
        );
    }

    #[test]
    fn test_expire_skips_terminal_and_pending_states() {
        let store = ActionStore::new();
        let mut done = make_action("done");
        done.created_at = Timestamp(Timestamp::now().0 - 7200);
        let done_id = done.id;
        store.insert(done).unwrap();
        store.update_status(done_id, ActionStatus::Completed).unwrap();

        assert!(store.expire_stale(60).is_empty());
    }
}
