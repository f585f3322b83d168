//! Action state machine with validated transitions.
//!
//! Enforces the allowed lifecycle transitions:
//! Pending -> AwaitingApproval | Executing | Completed | Rejected
//! AwaitingApproval -> Approved | Rejected | Cancelled
//! Approved -> Executing
//! Executing -> Completed | Failed | Cancelled

use crate::error::ActionError;
use crate::types::ActionStatus;

/// Validate that a status transition is allowed.
///
/// `Pending -> Completed` covers observe-only actions (logged, never run)
/// and `Pending -> Rejected` covers policy-blocked proposals. Terminal
/// states accept no further transitions.
pub fn validate_transition(from: ActionStatus, to: ActionStatus) -> Result<(), ActionError> {
    let valid = matches!(
        (from, to),
        (ActionStatus::Pending, ActionStatus::AwaitingApproval)
            | (ActionStatus::Pending, ActionStatus::Executing)
            | (ActionStatus::Pending, ActionStatus::Completed)
            | (ActionStatus::Pending, ActionStatus::Rejected)
            | (ActionStatus::AwaitingApproval, ActionStatus::Approved)
            | (ActionStatus::AwaitingApproval, ActionStatus::Rejected)
            | (ActionStatus::AwaitingApproval, ActionStatus::Cancelled)
            | (ActionStatus::Approved, ActionStatus::Executing)
            | (ActionStatus::Executing, ActionStatus::Completed)
            | (ActionStatus::Executing, ActionStatus::Failed)
            | (ActionStatus::Executing, ActionStatus::Cancelled)
    );

    if valid {
        Ok(())
    } else {
        Err(ActionError::InvalidTransition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [ActionStatus; 8] = [
        ActionStatus::Pending,
        ActionStatus::AwaitingApproval,
        ActionStatus::Approved,
        ActionStatus::Rejected,
        ActionStatus::Executing,
        ActionStatus::Completed,
        ActionStatus::Failed,
        ActionStatus::Cancelled,
    ];

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_pending_routes() {
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::AwaitingApproval).is_ok());
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Executing).is_ok());
        // Observe tier: logged and completed without running.
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Completed).is_ok());
        // Policy block: rejected without queueing.
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Rejected).is_ok());
    }

    #[test]
    fn test_approval_routes() {
        assert!(
            validate_transition(ActionStatus::AwaitingApproval, ActionStatus::Approved).is_ok()
        );
        assert!(
            validate_transition(ActionStatus::AwaitingApproval, ActionStatus::Rejected).is_ok()
        );
        assert!(
            validate_transition(ActionStatus::AwaitingApproval, ActionStatus::Cancelled).is_ok()
        );
        assert!(validate_transition(ActionStatus::Approved, ActionStatus::Executing).is_ok());
    }

    #[test]
    fn test_execution_routes() {
        assert!(validate_transition(ActionStatus::Executing, ActionStatus::Completed).is_ok());
        assert!(validate_transition(ActionStatus::Executing, ActionStatus::Failed).is_ok());
        assert!(validate_transition(ActionStatus::Executing, ActionStatus::Cancelled).is_ok());
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_pending_cannot_fail_or_approve_directly() {
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Failed).is_err());
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Approved).is_err());
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Cancelled).is_err());
    }

    #[test]
    fn test_awaiting_cannot_execute_without_approval() {
        assert!(
            validate_transition(ActionStatus::AwaitingApproval, ActionStatus::Executing).is_err()
        );
        assert!(
            validate_transition(ActionStatus::AwaitingApproval, ActionStatus::Completed).is_err()
        );
    }

    #[test]
    fn test_approved_only_executes() {
        for to in ALL_STATES {
            let result = validate_transition(ActionStatus::Approved, to);
            if to == ActionStatus::Executing {
                assert!(result.is_ok());
            } else {
                assert!(result.is_err(), "approved -> {} should be invalid", to);
            }
        }
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        for from in [
            ActionStatus::Completed,
            ActionStatus::Failed,
            ActionStatus::Rejected,
            ActionStatus::Cancelled,
        ] {
            for to in ALL_STATES {
                assert!(
                    validate_transition(from, to).is_err(),
                    "{} -> {} should be invalid",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for state in ALL_STATES {
            assert!(validate_transition(state, state).is_err());
        }
    }

    #[test]
    fn test_valid_transition_count() {
        let mut valid = 0;
        for from in ALL_STATES {
            for to in ALL_STATES {
                if validate_transition(from, to).is_ok() {
                    valid += 1;
                }
            }
        }
        assert_eq!(valid, 11, "Expected exactly 11 valid transitions");
    }

    #[test]
    fn test_invalid_transition_error_message() {
        let err =
            validate_transition(ActionStatus::Completed, ActionStatus::Executing).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("executing"));
    }
}
