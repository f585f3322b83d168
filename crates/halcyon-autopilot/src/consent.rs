//! User consent mediation for action execution.
//!
//! Decides approval without bothering the user where policy or a recent
//! approval already answers the question, and otherwise hands a synthesized
//! consent request to the registered prompt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::policy::PolicyTable;
use crate::risk::RiskAssessment;
use crate::types::PermissionLevel;

/// A synthesized request handed to the interactive prompt.
#[derive(Debug, Clone)]
pub struct ConsentRequest {
    pub action_name: String,
    pub description: String,
    pub assessment: Option<RiskAssessment>,
    /// Short "why I'm asking" text from the policy rationale.
    pub why: String,
}

/// The outcome of a consent decision.
#[derive(Debug, Clone)]
pub struct ConsentResult {
    pub approved: bool,
    /// User asked to remember the choice permanently.
    pub remember: bool,
    pub reason: String,
}

impl ConsentResult {
    fn approved(reason: &str) -> Self {
        Self {
            approved: true,
            remember: false,
            reason: reason.to_string(),
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            approved: false,
            remember: false,
            reason: reason.to_string(),
        }
    }
}

/// Interactive consent callback registered by the surrounding application.
pub trait ConsentPrompt: Send + Sync {
    fn prompt(&self, request: &ConsentRequest) -> ConsentResult;
}

/// Blocking terminal prompt, used when no interactive callback is
/// registered.
pub struct TerminalPrompt;

impl ConsentPrompt for TerminalPrompt {
    fn prompt(&self, request: &ConsentRequest) -> ConsentResult {
        println!("Approval needed: {} - {}", request.action_name, request.description);
        if let Some(assessment) = &request.assessment {
            println!("  risk: {} ({})", assessment.level, assessment.explanation);
            for warning in &assessment.warnings {
                println!("  warning: {}", warning);
            }
        }
        println!("  {}", request.why);
        println!("Approve? [y]es / [a]lways / [N]o: ");

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return ConsentResult::denied("no response from user");
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => ConsentResult::approved("approved by user"),
            "a" | "always" => ConsentResult {
                approved: true,
                remember: true,
                reason: "approved by user (always)".to_string(),
            },
            _ => ConsentResult::denied("denied by user"),
        }
    }
}

/// Approval mediator honoring policy tiers, a short-lived approval cache,
/// and permanent trust grants.
///
/// The cache is keyed by action name only, not by the full parameter set:
/// approving one `file_delete` covers any `file_delete` for the cache
/// window. This coarse granularity is deliberate and load-bearing; see the
/// tests.
pub struct ConsentGate {
    policy: Arc<PolicyTable>,
    cache: Mutex<HashMap<String, Instant>>,
    cache_window: Duration,
    prompt: Mutex<Option<Arc<dyn ConsentPrompt>>>,
}

impl ConsentGate {
    pub fn new(policy: Arc<PolicyTable>, cache_window: Duration) -> Self {
        Self {
            policy,
            cache: Mutex::new(HashMap::new()),
            cache_window,
            prompt: Mutex::new(None),
        }
    }

    /// Register the interactive callback. Replaces any previous one.
    pub fn set_prompt(&self, prompt: Arc<dyn ConsentPrompt>) {
        *self.prompt.lock().unwrap() = Some(prompt);
    }

    /// Steps 1-3 of the decision procedure, without prompting: policy
    /// allow, policy block, or a cached recent approval. `None` means the
    /// user would have to be asked.
    pub fn preapproval(&self, action_name: &str) -> Option<ConsentResult> {
        match self.policy.permission_for(action_name) {
            PermissionLevel::Allow => return Some(ConsentResult::approved("allowed by policy")),
            PermissionLevel::Block => return Some(ConsentResult::denied("blocked for safety")),
            PermissionLevel::Ask => {}
        }

        if self.is_cached(action_name) {
            return Some(ConsentResult::approved("recently approved"));
        }
        None
    }

    /// Read-only mirror of the promptless path, for callers pre-filtering
    /// UI.
    pub fn needs_consent(&self, action_name: &str) -> bool {
        self.preapproval(action_name).is_none()
    }

    /// Full decision procedure; may block on the prompt.
    pub fn request_consent(
        &self,
        action_name: &str,
        description: &str,
        assessment: Option<RiskAssessment>,
    ) -> ConsentResult {
        if let Some(result) = self.preapproval(action_name) {
            debug!(
                action = action_name,
                reason = %result.reason,
                "Consent resolved without prompting"
            );
            return result;
        }

        let why = self
            .policy
            .rationale_for(action_name)
            .map(|r| format!("Asking because {}", r))
            .unwrap_or_else(|| "Asking because this action is not pre-approved".to_string());

        let request = ConsentRequest {
            action_name: action_name.to_string(),
            description: description.to_string(),
            assessment,
            why,
        };

        let prompt = self.prompt.lock().unwrap().clone();
        let result = match prompt {
            Some(prompt) => prompt.prompt(&request),
            None => TerminalPrompt.prompt(&request),
        };

        if result.approved {
            if result.remember {
                self.policy.trust(action_name);
            } else {
                self.note_approval(action_name);
            }
        }
        result
    }

    /// Record an approval into the short-lived cache.
    pub fn note_approval(&self, action_name: &str) {
        self.cache
            .lock()
            .unwrap()
            .insert(action_name.to_string(), Instant::now());
    }

    fn is_cached(&self, action_name: &str) -> bool {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(action_name) {
            Some(when) if when.elapsed() < self.cache_window => true,
            Some(_) => {
                cache.remove(action_name);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prompt stub with a scripted answer and a call counter.
    struct ScriptedPrompt {
        approved: bool,
        remember: bool,
        calls: AtomicUsize,
    }

    impl ScriptedPrompt {
        fn new(approved: bool, remember: bool) -> Self {
            Self {
                approved,
                remember,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ConsentPrompt for ScriptedPrompt {
        fn prompt(&self, _request: &ConsentRequest) -> ConsentResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ConsentResult {
                approved: self.approved,
                remember: self.remember,
                reason: "scripted".to_string(),
            }
        }
    }

    fn gate_with_prompt(
        approved: bool,
        remember: bool,
    ) -> (ConsentGate, Arc<ScriptedPrompt>, Arc<PolicyTable>) {
        let policy = Arc::new(PolicyTable::new());
        let gate = ConsentGate::new(Arc::clone(&policy), Duration::from_secs(300));
        let prompt = Arc::new(ScriptedPrompt::new(approved, remember));
        gate.set_prompt(Arc::clone(&prompt) as Arc<dyn ConsentPrompt>);
        (gate, prompt, policy)
    }

    #[test]
    fn test_policy_allow_skips_prompt() {
        let (gate, prompt, _) = gate_with_prompt(false, false);
        let result = gate.request_consent("web_search", "look something up", None);
        assert!(result.approved);
        assert_eq!(result.reason, "allowed by policy");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_policy_block_denies_regardless_of_prompt() {
        // Prompt would approve, but blocked names never reach it.
        let (gate, prompt, _) = gate_with_prompt(true, false);
        let result = gate.request_consent("registry_delete", "clean up keys", None);
        assert!(!result.approved);
        assert_eq!(result.reason, "blocked for safety");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_approval_populates_cache() {
        let (gate, prompt, _) = gate_with_prompt(true, false);

        let first = gate.request_consent("file_write", "save notes", None);
        assert!(first.approved);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);

        // Second ask within the window is served from the cache.
        let second = gate.request_consent("file_write", "save other notes", None);
        assert!(second.approved);
        assert_eq!(second.reason, "recently approved");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_is_keyed_by_name_only() {
        // Deliberate coarse granularity: approving one file_delete covers a
        // different file's deletion within the window.
        let (gate, prompt, _) = gate_with_prompt(true, false);

        gate.request_consent("file_delete", "delete a.txt", None);
        let other = gate.request_consent("file_delete", "delete b.txt", None);
        assert!(other.approved);
        assert_eq!(other.reason, "recently approved");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_expires() {
        let policy = Arc::new(PolicyTable::new());
        let gate = ConsentGate::new(Arc::clone(&policy), Duration::ZERO);
        let prompt = Arc::new(ScriptedPrompt::new(true, false));
        gate.set_prompt(Arc::clone(&prompt) as Arc<dyn ConsentPrompt>);

        gate.request_consent("file_write", "save", None);
        gate.request_consent("file_write", "save again", None);
        // Zero window: every ask reaches the prompt.
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remember_trusts_permanently() {
        let (gate, prompt, policy) = gate_with_prompt(true, true);

        let result = gate.request_consent("file_move", "tidy downloads", None);
        assert!(result.approved);
        assert!(result.remember);
        assert!(policy.is_trusted("file_move"));

        // Now resolved by policy, not the prompt or the cache.
        let next = gate.request_consent("file_move", "tidy again", None);
        assert_eq!(next.reason, "allowed by policy");
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);

        policy.untrust("file_move");
        assert!(gate.needs_consent("file_move"));
    }

    #[test]
    fn test_denial_does_not_cache() {
        let (gate, prompt, _) = gate_with_prompt(false, false);

        let result = gate.request_consent("file_write", "save", None);
        assert!(!result.approved);
        let again = gate.request_consent("file_write", "save", None);
        assert!(!again.approved);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_needs_consent_mirror() {
        let (gate, prompt, _) = gate_with_prompt(true, false);

        assert!(!gate.needs_consent("web_search"));
        assert!(!gate.needs_consent("registry_delete"));
        assert!(gate.needs_consent("file_write"));

        gate.note_approval("file_write");
        assert!(!gate.needs_consent("file_write"));

        // The pure predicate never prompts.
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }
}
