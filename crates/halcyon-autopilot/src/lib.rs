//! Autopilot core for Halcyon.
//!
//! Decides, for every proposed system action, whether to execute it
//! immediately, ask the user first, only observe it, or block it, and
//! keeps an auditable record of every decision. The surrounding
//! application talks to the engine through `propose`/`approve`/`reject`
//! and the domain-event stream; it never reaches into engine internals.

pub mod action;
pub mod audit;
pub mod away;
pub mod consent;
pub mod engine;
pub mod error;
pub mod executor;
pub mod policy;
pub mod risk;
pub mod rules;
pub mod store;
pub mod types;
pub mod workflow;

pub use action::ActionStore;
pub use audit::{AuditLog, AuditLogEntry};
pub use away::{AwaySessionSummary, AwayTracker};
pub use consent::{ConsentGate, ConsentPrompt, ConsentRequest, ConsentResult};
pub use engine::AutopilotEngine;
pub use error::{ActionError, ExecutorError, RuleError};
pub use executor::{ActionExecutor, StagingExecutor};
pub use policy::{ActionPolicy, PolicyTable};
pub use risk::{ActionRequest, RiskAssessment, RiskAssessor};
pub use rules::{AutopilotRule, KeywordRuleParser, RuleBook, RuleParser};
pub use store::AutopilotStore;
pub use types::{
    ActionContext, ActionStatus, AutonomyLevel, AutopilotAction, AutopilotConfig,
    PermissionLevel, RiskLevel, Suggestion, TriggerKind,
};
pub use workflow::{AutopilotWorkflow, WorkflowBook, WorkflowStep};
