//! Executor seam between the engine and real-world effects.
//!
//! The engine never performs effects itself; it hands an action type and
//! parameter map to an `ActionExecutor` and treats any error as an
//! execution failure without inspecting its cause.

use async_trait::async_trait;

use crate::error::ExecutorError;

/// Performs the real-world effect of an authorized action.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute one action and return a textual result.
    async fn execute(
        &self,
        action_type: &str,
        parameters: &serde_json::Value,
    ) -> Result<String, ExecutorError>;
}

/// Default executor that stages actions instead of performing them.
///
/// Useful until a platform executor is injected, and as the safe wiring
/// for demos: every action is logged as staged and reported as such.
pub struct StagingExecutor;

#[async_trait]
impl ActionExecutor for StagingExecutor {
    async fn execute(
        &self,
        action_type: &str,
        parameters: &serde_json::Value,
    ) -> Result<String, ExecutorError> {
        tracing::info!(action_type, %parameters, "Action staged (no real effect)");
        Ok(format!("staged: {}", action_type))
    }
}
