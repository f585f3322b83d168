//! The authorization engine.
//!
//! Single authority over the pending-action queue and the session
//! counters. Callers propose actions; the engine applies blocklist and
//! rate-limit checks, resolves the autonomy tier via rule match or the
//! configured default, and routes each action to auto-execution, human
//! approval, or observation. Every terminal outcome lands in the audit
//! log, and in the open away session when one exists.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use halcyon_core::events::DomainEvent;
use halcyon_core::types::Timestamp;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::ActionStore;
use crate::audit::AuditLog;
use crate::away::{AwaySessionSummary, AwayTracker};
use crate::consent::ConsentGate;
use crate::executor::ActionExecutor;
use crate::risk::{ActionRequest, RiskAssessor};
use crate::rules::RuleBook;
use crate::types::{
    ActionContext, ActionStatus, AutonomyLevel, AutopilotAction, AutopilotConfig, Suggestion,
};
use crate::workflow::{WorkflowBook, WorkflowRunReport};

/// Action-type name fragments that always require at least `Ask` when no
/// rule matches, regardless of a more permissive global default. Only an
/// explicit rule with `AutoExecute` lifts this floor.
const DESTRUCTIVE_VERBS: &[&str] = &["delete", "modify", "send", "install", "uninstall"];

const EVENT_CAPACITY: usize = 256;

/// Rate-limit and session bookkeeping, reset only by `reset_session`.
struct SessionCounters {
    session_count: u32,
    minute_count: u32,
    minute_started: Instant,
    session_started: Instant,
}

impl SessionCounters {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            session_count: 0,
            minute_count: 0,
            minute_started: now,
            session_started: now,
        }
    }
}

/// Snapshot of engine state for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub enabled: bool,
    pub default_level: AutonomyLevel,
    pub pending_count: usize,
    pub session_count: u32,
    pub minute_count: u32,
    pub away_active: bool,
    pub audit_entries: usize,
}

/// Where a proposal was routed at admission.
enum Route {
    Auto,
    Preapproved(String),
    Observe,
    Queue,
}

/// The core orchestrator.
pub struct AutopilotEngine {
    config: Mutex<AutopilotConfig>,
    policy: Arc<crate::policy::PolicyTable>,
    risk: RiskAssessor,
    rules: Arc<RuleBook>,
    consent: Arc<ConsentGate>,
    workflows: Arc<WorkflowBook>,
    actions: Arc<ActionStore>,
    audit: Arc<AuditLog>,
    away: Arc<AwayTracker>,
    executor: Arc<dyn ActionExecutor>,
    events: broadcast::Sender<DomainEvent>,
    counters: Mutex<SessionCounters>,
}

impl AutopilotEngine {
    pub fn new(
        config: AutopilotConfig,
        policy: Arc<crate::policy::PolicyTable>,
        rules: Arc<RuleBook>,
        consent: Arc<ConsentGate>,
        workflows: Arc<WorkflowBook>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config: Mutex::new(config),
            policy,
            risk: RiskAssessor::new(),
            rules,
            consent,
            workflows,
            actions: Arc::new(ActionStore::new()),
            audit: Arc::new(AuditLog::new()),
            away: Arc::new(AwayTracker::new()),
            executor,
            events,
            counters: Mutex::new(SessionCounters::new()),
        }
    }

    /// Subscribe to the engine's domain events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// The audit log, shared-read by anything needing history.
    pub fn audit_log(&self) -> Arc<AuditLog> {
        Arc::clone(&self.audit)
    }

    pub fn config_snapshot(&self) -> AutopilotConfig {
        self.config.lock().unwrap().clone()
    }

    fn emit(&self, event: DomainEvent) {
        // No subscribers is fine; events are best-effort notifications.
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Proposal admission and routing
    // =========================================================================

    /// Propose an action for authorization.
    ///
    /// Returns `None` when the engine is disabled, the action type is
    /// blocklisted, or a rate limit is exceeded: expected steady-state
    /// refusals, not errors, so no audit entry is written for them.
    /// Otherwise the returned record shows where the action went:
    /// executed, queued for approval, observed, or rejected by policy.
    pub async fn propose(
        &self,
        action_type: &str,
        description: &str,
        reasoning: &str,
        parameters: serde_json::Value,
        context: Option<ActionContext>,
    ) -> Option<AutopilotAction> {
        let (default_level, timed_out) = {
            let mut config = self.config.lock().unwrap();
            if !config.enabled {
                debug!(action_type, "Proposal ignored: autopilot disabled");
                return None;
            }
            if config.blocked_actions.iter().any(|b| b == action_type) {
                debug!(action_type, "Proposal ignored: action type blocklisted");
                return None;
            }

            let mut counters = self.counters.lock().unwrap();

            // Lazy session-timeout check: no background timer exists, so a
            // long idle period only trips this on the next proposal.
            let timeout = Duration::from_secs(config.session_timeout_minutes * 60);
            if counters.session_started.elapsed() >= timeout {
                config.enabled = false;
                warn!("Session timeout reached; autopilot disabled");
                (config.default_level, true)
            } else {
                if counters.minute_started.elapsed() >= Duration::from_secs(60) {
                    counters.minute_count = 0;
                    counters.minute_started = Instant::now();
                }
                if counters.minute_count >= config.max_actions_per_minute {
                    debug!(action_type, "Proposal ignored: per-minute cap reached");
                    return None;
                }
                if counters.session_count >= config.max_actions_per_session {
                    debug!(action_type, "Proposal ignored: session cap reached");
                    return None;
                }
                counters.minute_count += 1;
                counters.session_count += 1;
                (config.default_level, false)
            }
        };

        if timed_out {
            self.emit(DomainEvent::StatusChanged {
                status: "autopilot disabled: session timeout".to_string(),
                timestamp: Timestamp::now(),
            });
            return None;
        }

        let context = context
            .unwrap_or_else(|| ActionContext::capture(None, 0, self.away.is_active()));

        let assessment = ActionRequest::classify(action_type, &parameters)
            .map(|request| self.risk.assess(&request));

        let mut action = AutopilotAction {
            id: Uuid::new_v4(),
            action_type: action_type.to_string(),
            description: description.to_string(),
            reasoning: reasoning.to_string(),
            parameters,
            context,
            required_level: default_level,
            auto_executed: false,
            approved: false,
            rule_id: None,
            assessment,
            status: ActionStatus::Pending,
            created_at: Timestamp::now(),
            completed_at: None,
            output: None,
            error: None,
        };

        // Rule match wins over the default; the matched rule's tier can
        // elevate as well as restrict.
        if let Some(rule) = self.rules.match_action(&action) {
            action.required_level = rule.autonomy;
            action.rule_id = Some(rule.id);
        } else if DESTRUCTIVE_VERBS.iter().any(|v| action_type.contains(v)) {
            // Safety floor: destructive names never auto-execute off the
            // global default alone.
            action.required_level = action.required_level.min(AutonomyLevel::Ask);
        }

        // Policy blocklist beats every tier, including rule elevation.
        if self.policy.is_blocked(action_type) {
            if self.actions.insert(action.clone()).is_err() {
                return None;
            }
            let rejected = self
                .actions
                .update_status(action.id, ActionStatus::Rejected)
                .ok()?;
            self.audit.record(&rejected, "rejected: blocked by policy", false);
            self.away.record_action(&rejected);
            info!(action_type, "Action blocked by policy");
            return Some(rejected);
        }

        let route = if action.required_level == AutonomyLevel::Observe
            || default_level == AutonomyLevel::Observe
        {
            Route::Observe
        } else if action.required_level == AutonomyLevel::AutoExecute {
            // Reaching here implies the global default permits autonomy
            // (it is not Observe).
            Route::Auto
        } else {
            match self.consent.preapproval(&action.action_type) {
                Some(result) if result.approved => Route::Preapproved(result.reason),
                Some(result) => {
                    // Only Block denies promptlessly, which the blocklist
                    // check above already handled; kept for overrides that
                    // race with admission.
                    if self.actions.insert(action.clone()).is_err() {
                        return None;
                    }
                    let rejected = self
                        .actions
                        .update_status(action.id, ActionStatus::Rejected)
                        .ok()?;
                    self.audit
                        .record(&rejected, &format!("rejected: {}", result.reason), false);
                    self.away.record_action(&rejected);
                    return Some(rejected);
                }
                None => Route::Queue,
            }
        };

        match route {
            Route::Observe => {
                if self.actions.insert(action.clone()).is_err() {
                    return None;
                }
                let observed = self
                    .actions
                    .update_status(action.id, ActionStatus::Completed)
                    .ok()?;
                self.audit.record(&observed, "observed only", false);
                self.away.record_action(&observed);
                debug!(action_type, "Action observed only");
                Some(observed)
            }
            Route::Auto => {
                action.auto_executed = true;
                if self.actions.insert(action.clone()).is_err() {
                    return None;
                }
                Some(self.execute(action.id, None).await?)
            }
            Route::Preapproved(reason) => {
                action.approved = true;
                if self.actions.insert(action.clone()).is_err() {
                    return None;
                }
                debug!(action_type, reason = %reason, "Action pre-approved");
                Some(self.execute(action.id, Some(&reason)).await?)
            }
            Route::Queue => {
                if self.actions.insert(action.clone()).is_err() {
                    return None;
                }
                let queued = self
                    .actions
                    .update_status(action.id, ActionStatus::AwaitingApproval)
                    .ok()?;
                self.away.record_action(&queued);
                self.emit(DomainEvent::ActionPending {
                    action_id: queued.id,
                    action_type: queued.action_type.clone(),
                    description: queued.description.clone(),
                    risk: queued.assessment.as_ref().map(|a| a.level.to_string()),
                    timestamp: Timestamp::now(),
                });
                info!(action_type, action_id = %queued.id, "Action awaiting approval");
                Some(queued)
            }
        }
    }

    // =========================================================================
    // Approval surface
    // =========================================================================

    /// Approve a queued action and execute it. Returns `false` if the
    /// action is unknown or not awaiting approval. Works while the engine
    /// is disabled: queued items stay decidable.
    pub async fn approve(&self, action_id: Uuid, note: Option<&str>) -> bool {
        let approved = match self.actions.update_status(action_id, ActionStatus::Approved) {
            Ok(action) => action,
            Err(e) => {
                debug!(action_id = %action_id, error = %e, "Approve refused");
                return false;
            }
        };

        // Feed the short-lived consent cache; deliberately keyed by the
        // action name alone.
        self.consent.note_approval(&approved.action_type);
        info!(action_id = %action_id, action_type = %approved.action_type, "Action approved");

        self.execute(action_id, note).await.is_some()
    }

    /// Reject a queued action. The executor is never called for it.
    pub fn reject(&self, action_id: Uuid, reason: Option<&str>) -> bool {
        let rejected = match self.actions.update_status(action_id, ActionStatus::Rejected) {
            Ok(action) => action,
            Err(e) => {
                debug!(action_id = %action_id, error = %e, "Reject refused");
                return false;
            }
        };

        let outcome = match reason {
            Some(reason) => format!("rejected: {}", reason),
            None => "rejected by user".to_string(),
        };
        self.audit.record(&rejected, &outcome, false);
        self.away.record_action(&rejected);
        info!(action_id = %action_id, "Action rejected");
        true
    }

    /// Cancel a queued or in-flight action.
    pub fn cancel(&self, action_id: Uuid) -> bool {
        let cancelled = match self.actions.update_status(action_id, ActionStatus::Cancelled) {
            Ok(action) => action,
            Err(e) => {
                debug!(action_id = %action_id, error = %e, "Cancel refused");
                return false;
            }
        };
        self.audit.record(&cancelled, "cancelled", false);
        self.away.record_action(&cancelled);
        true
    }

    /// Run one approved or auto-admitted action.
    ///
    /// The engine lock discipline lives here: only the transitions into
    /// and out of `Executing` take store locks; the executor await runs
    /// with nothing held, so a slow or hung executor never blocks
    /// proposals or queries.
    async fn execute(&self, action_id: Uuid, note: Option<&str>) -> Option<AutopilotAction> {
        let action = match self.actions.update_status(action_id, ActionStatus::Executing) {
            Ok(action) => action,
            Err(e) => {
                warn!(action_id = %action_id, error = %e, "Could not start execution");
                return None;
            }
        };

        let result = self
            .executor
            .execute(&action.action_type, &action.parameters)
            .await;

        match result {
            Ok(output) => {
                let completed = self.actions.complete(action_id, Some(output)).ok()?;
                let outcome = match note {
                    Some(note) => format!("completed ({})", note),
                    None => "completed".to_string(),
                };
                self.audit.record(&completed, &outcome, true);
                if let Some(rule_id) = completed.rule_id {
                    self.rules.record_run(rule_id);
                }
                self.away.record_action(&completed);

                let notify = {
                    let config = self.config.lock().unwrap();
                    config.notify_on_every_action || !completed.auto_executed
                };
                if notify {
                    self.emit(DomainEvent::ActionExecuted {
                        action_id: completed.id,
                        action_type: completed.action_type.clone(),
                        auto_executed: completed.auto_executed,
                        timestamp: Timestamp::now(),
                    });
                }
                info!(action_id = %action_id, "Action completed");
                Some(completed)
            }
            Err(e) => {
                let failed = self.actions.fail(action_id, e.to_string()).ok()?;
                self.audit
                    .record(&failed, &format!("failed: {}", e), false);
                self.away.record_action(&failed);
                self.emit(DomainEvent::ActionFailed {
                    action_id: failed.id,
                    action_type: failed.action_type.clone(),
                    error: e.to_string(),
                    timestamp: Timestamp::now(),
                });
                warn!(action_id = %action_id, error = %e, "Action failed");

                let pause = self.config.lock().unwrap().pause_on_error;
                if pause {
                    self.set_enabled_with_status(false, "autopilot paused after action failure");
                }
                Some(failed)
            }
        }
    }

    // =========================================================================
    // Suggestions and observations
    // =========================================================================

    /// Proactive, informational side-channel. Not an action: no execution,
    /// no approval flow, never gated by autonomy level.
    pub fn generate_suggestion(&self, title: &str, body: &str) -> Suggestion {
        let suggestion = Suggestion {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: Timestamp::now(),
        };
        self.away.record_suggestion(&suggestion);
        self.emit(DomainEvent::SuggestionGenerated {
            suggestion_id: suggestion.id,
            title: suggestion.title.clone(),
            timestamp: Timestamp::now(),
        });
        info!(title, "Suggestion generated");
        suggestion
    }

    /// Fold a system observation (health or security event) into the open
    /// away session, if any.
    pub fn record_observation(&self, observation: &str) {
        debug!(observation, "Observation recorded");
        self.away.record_observation(observation);
    }

    // =========================================================================
    // Away sessions
    // =========================================================================

    /// Open an away session. No-op while the engine is disabled, and
    /// idempotent while a session is already open.
    pub fn begin_away(&self, reason: Option<String>) -> bool {
        if !self.config.lock().unwrap().enabled {
            debug!("Away session not started: autopilot disabled");
            return false;
        }
        self.away.start(reason)
    }

    /// Close the away session and publish its summary.
    pub fn end_away(&self) -> Option<AwaySessionSummary> {
        let summary = self.away.end()?;
        self.emit_summary(&summary);
        Some(summary)
    }

    /// Shut the engine down, closing any open away session as interrupted.
    pub fn shutdown(&self) -> Option<AwaySessionSummary> {
        let summary = self.away.end_interrupted();
        if let Some(summary) = &summary {
            self.emit_summary(summary);
        }
        self.emit(DomainEvent::StatusChanged {
            status: "autopilot shutting down".to_string(),
            timestamp: Timestamp::now(),
        });
        summary
    }

    fn emit_summary(&self, summary: &AwaySessionSummary) {
        self.emit(DomainEvent::AwaySummaryReady {
            session_id: summary.session_id,
            total_actions: summary.total_actions,
            successful_actions: summary.successful_actions,
            failed_actions: summary.failed_actions,
            timestamp: Timestamp::now(),
        });
    }

    // =========================================================================
    // Workflows
    // =========================================================================

    /// Run a workflow by proposing each step through the normal
    /// authorization path. Steps get no special privilege: blocked or
    /// rate-limited steps are skipped, not forced.
    pub async fn run_workflow(&self, workflow_id: Uuid) -> Option<WorkflowRunReport> {
        let workflow = self.workflows.get(workflow_id)?;
        if !workflow.enabled {
            debug!(workflow_id = %workflow_id, "Workflow disabled; not run");
            return None;
        }

        let mut admitted = 0u32;
        let mut skipped = 0u32;
        for step in &workflow.steps {
            let proposed = self
                .propose(
                    &step.action_type,
                    &step.description,
                    &format!("workflow step of '{}'", workflow.name),
                    step.parameters.clone(),
                    None,
                )
                .await;
            match proposed {
                Some(_) => admitted += 1,
                None => skipped += 1,
            }
        }

        self.workflows.record_run(workflow_id);
        info!(workflow = %workflow.name, admitted, skipped, "Workflow run finished");
        Some(WorkflowRunReport {
            workflow_id,
            steps_total: workflow.steps.len() as u32,
            steps_admitted: admitted,
            steps_skipped: skipped,
        })
    }

    // =========================================================================
    // Control and queries
    // =========================================================================

    /// Enable or disable the engine. Disabling closes the new-admission
    /// path only: queued approvals stay visible and decidable.
    pub fn set_enabled(&self, enabled: bool) {
        let status = if enabled {
            "autopilot enabled"
        } else {
            "autopilot disabled"
        };
        self.set_enabled_with_status(enabled, status);
    }

    fn set_enabled_with_status(&self, enabled: bool, status: &str) {
        self.config.lock().unwrap().enabled = enabled;
        info!(enabled, "{}", status);
        self.emit(DomainEvent::StatusChanged {
            status: status.to_string(),
            timestamp: Timestamp::now(),
        });
    }

    /// Cancel queued approvals older than the configured TTL. Returns how
    /// many were expired.
    pub fn expire_pending(&self) -> usize {
        let ttl = self.config.lock().unwrap().pending_ttl_minutes;
        let expired = self.actions.expire_stale(ttl);
        for id in &expired {
            if let Ok(action) = self.actions.get(*id) {
                self.audit
                    .record(&action, "cancelled: approval window expired", false);
                self.away.record_action(&action);
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired stale pending actions");
        }
        expired.len()
    }

    /// Reset the session counters and the session clock.
    pub fn reset_session(&self) {
        *self.counters.lock().unwrap() = SessionCounters::new();
        info!("Session counters reset");
    }

    /// Snapshot of the approval queue, oldest first.
    pub fn pending_actions(&self) -> Vec<AutopilotAction> {
        self.actions.pending()
    }

    /// The most recent audit entries, newest first.
    pub fn recent_audit(&self, count: usize) -> Vec<crate::audit::AuditLogEntry> {
        self.audit.recent(count)
    }

    pub fn get_action(&self, action_id: Uuid) -> Option<AutopilotAction> {
        self.actions.get(action_id).ok()
    }

    pub fn status(&self) -> EngineStatus {
        let config = self.config.lock().unwrap();
        let counters = self.counters.lock().unwrap();
        EngineStatus {
            enabled: config.enabled,
            default_level: config.default_level,
            pending_count: self.actions.pending().len(),
            session_count: counters.session_count,
            minute_count: counters.minute_count,
            away_active: self.away.is_active(),
            audit_entries: self.audit.len(),
        }
    }
}
