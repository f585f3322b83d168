//! Error types for the autopilot engine.

use halcyon_core::error::HalcyonError;
use uuid::Uuid;

use crate::types::ActionStatus;

/// Errors from action lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Action not found: {0}")]
    NotFound(Uuid),
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(ActionStatus, ActionStatus),
    #[error("Storage error: {0}")]
    Storage(#[from] HalcyonError),
}

/// Errors surfaced synchronously when adding or validating a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Rule text could not be parsed: {0}")]
    Parse(String),
    #[error("Rule validation failed: {0}")]
    Validation(String),
}

/// Opaque failure reported by an action executor.
///
/// The engine maps any of these to a `Failed` action status without
/// inspecting the cause.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Execution failed: {0}")]
    Failed(String),
    #[error("Unsupported action type: {0}")]
    Unsupported(String),
    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_display() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let err = ActionError::NotFound(id);
        assert_eq!(
            err.to_string(),
            "Action not found: 550e8400-e29b-41d4-a716-446655440000"
        );

        let err = ActionError::InvalidTransition(ActionStatus::Completed, ActionStatus::Executing);
        assert_eq!(
            err.to_string(),
            "Invalid state transition: completed -> executing"
        );
    }

    #[test]
    fn test_action_error_from_core_error() {
        let core_err = HalcyonError::Storage("lock poisoned".to_string());
        let err: ActionError = core_err.into();
        assert!(matches!(err, ActionError::Storage(_)));
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn test_rule_error_display() {
        let err = RuleError::Parse("no trigger found".to_string());
        assert_eq!(err.to_string(), "Rule text could not be parsed: no trigger found");

        let err = RuleError::Validation("rule names no action".to_string());
        assert_eq!(err.to_string(), "Rule validation failed: rule names no action");
    }

    #[test]
    fn test_executor_error_display() {
        let err = ExecutorError::Failed("exit code 1".to_string());
        assert_eq!(err.to_string(), "Execution failed: exit code 1");

        let err = ExecutorError::Unsupported("teleport".to_string());
        assert_eq!(err.to_string(), "Unsupported action type: teleport");

        let err = ExecutorError::Timeout(60);
        assert_eq!(err.to_string(), "Execution timed out after 60 seconds");
    }
}
