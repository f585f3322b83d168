//! Core types and value objects for the autopilot engine.
//!
//! Defines autonomy tiers, action lifecycle states, context snapshots, and
//! the engine configuration.

use halcyon_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::risk::RiskAssessment;

// =============================================================================
// Enums
// =============================================================================

/// How much a given action class is allowed to run without a human in the
/// loop. The derived ordering is meaningful: `Observe` is the most
/// conservative tier and `AutoExecute` the most permissive, so clamping a
/// level uses `Ord::min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    /// Log only, never act.
    Observe,
    /// Queue for explicit approval.
    Ask,
    /// Run immediately, log after.
    AutoExecute,
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutonomyLevel::Observe => write!(f, "observe"),
            AutonomyLevel::Ask => write!(f, "ask"),
            AutonomyLevel::AutoExecute => write!(f, "auto_execute"),
        }
    }
}

impl std::str::FromStr for AutonomyLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observe" => Ok(AutonomyLevel::Observe),
            "ask" => Ok(AutonomyLevel::Ask),
            "auto_execute" => Ok(AutonomyLevel::AutoExecute),
            _ => Err(format!("Unknown autonomy level: {}", s)),
        }
    }
}

/// Yes / maybe / no scale shared by the policy table, the risk assessor's
/// recommended tier, and the consent gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Allow,
    Ask,
    Block,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Allow => write!(f, "allow"),
            PermissionLevel::Ask => write!(f, "ask"),
            PermissionLevel::Block => write!(f, "block"),
        }
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(PermissionLevel::Allow),
            "ask" => Ok(PermissionLevel::Ask),
            "block" => Ok(PermissionLevel::Block),
            _ => Err(format!("Unknown permission level: {}", s)),
        }
    }
}

/// Risk classification for a single action instance. Ordered so that
/// escalation can use `Ord::max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

/// Action lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    AwaitingApproval,
    Approved,
    Rejected,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl ActionStatus {
    /// Terminal states are immutable once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed
                | ActionStatus::Failed
                | ActionStatus::Rejected
                | ActionStatus::Cancelled
        )
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "pending"),
            ActionStatus::AwaitingApproval => write!(f, "awaiting_approval"),
            ActionStatus::Approved => write!(f, "approved"),
            ActionStatus::Rejected => write!(f, "rejected"),
            ActionStatus::Executing => write!(f, "executing"),
            ActionStatus::Completed => write!(f, "completed"),
            ActionStatus::Failed => write!(f, "failed"),
            ActionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActionStatus::Pending),
            "awaiting_approval" => Ok(ActionStatus::AwaitingApproval),
            "approved" => Ok(ActionStatus::Approved),
            "rejected" => Ok(ActionStatus::Rejected),
            "executing" => Ok(ActionStatus::Executing),
            "completed" => Ok(ActionStatus::Completed),
            "failed" => Ok(ActionStatus::Failed),
            "cancelled" => Ok(ActionStatus::Cancelled),
            _ => Err(format!("Unknown action status: {}", s)),
        }
    }
}

/// What causes a rule to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Scheduled,
    OnIdle,
    OnAway,
    OnAppOpen,
    OnCondition,
    OnSystemEvent,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Manual => write!(f, "manual"),
            TriggerKind::Scheduled => write!(f, "scheduled"),
            TriggerKind::OnIdle => write!(f, "on_idle"),
            TriggerKind::OnAway => write!(f, "on_away"),
            TriggerKind::OnAppOpen => write!(f, "on_app_open"),
            TriggerKind::OnCondition => write!(f, "on_condition"),
            TriggerKind::OnSystemEvent => write!(f, "on_system_event"),
        }
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// Snapshot of the situation an action was proposed in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionContext {
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Day of week, Mon = 1 through Sun = 7.
    pub weekday: u8,
    /// Foreground application, if known.
    pub active_app: Option<String>,
    /// Minutes since last user input.
    pub idle_minutes: u32,
    /// Whether the user is marked away.
    pub away_mode: bool,
}

impl ActionContext {
    /// Capture a context snapshot for the current wall-clock time.
    pub fn capture(active_app: Option<String>, idle_minutes: u32, away_mode: bool) -> Self {
        let now = Timestamp::now();
        Self {
            hour: now.hour(),
            weekday: now.weekday(),
            active_app,
            idle_minutes,
            away_mode,
        }
    }
}

/// One proposed or completed action instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotAction {
    pub id: Uuid,
    /// Action-type name, e.g. `file_delete`, `shell_command`, `app_launch`.
    pub action_type: String,
    pub description: String,
    /// Why the engine wants to do this.
    pub reasoning: String,
    pub parameters: serde_json::Value,
    pub context: ActionContext,
    /// The autonomy tier this instance resolved to.
    pub required_level: AutonomyLevel,
    pub auto_executed: bool,
    pub approved: bool,
    /// The rule that matched this action, if any.
    pub rule_id: Option<Uuid>,
    /// Risk assessment attached when the parameters classify.
    pub assessment: Option<RiskAssessment>,
    pub status: ActionStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Executor output on success.
    pub output: Option<String>,
    /// Error message on failure.
    pub error: Option<String>,
}

/// A proactive, informational notice. Never executed, never gated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: Timestamp,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the autopilot engine. Persisted as a JSON document by
/// the store; mutable at runtime through the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotConfig {
    pub enabled: bool,
    /// Default autonomy tier for actions no rule covers.
    pub default_level: AutonomyLevel,
    pub max_actions_per_session: u32,
    pub max_actions_per_minute: u32,
    /// Wall-clock minutes since session start before the engine disables
    /// itself. Checked lazily on each proposal, never by a timer.
    pub session_timeout_minutes: u64,
    /// Action-type names the engine refuses outright.
    pub blocked_actions: Vec<String>,
    pub notify_on_every_action: bool,
    /// Disable the engine when an execution fails.
    pub pause_on_error: bool,
    /// How long a non-remembered approval keeps covering an action name.
    pub consent_cache_seconds: u64,
    /// Queued approvals older than this are cancelled by `expire_pending`.
    pub pending_ttl_minutes: i64,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_level: AutonomyLevel::Ask,
            max_actions_per_session: 50,
            max_actions_per_minute: 10,
            session_timeout_minutes: 240,
            blocked_actions: Vec::new(),
            notify_on_every_action: false,
            pause_on_error: true,
            consent_cache_seconds: 300,
            pending_ttl_minutes: 60,
        }
    }
}
