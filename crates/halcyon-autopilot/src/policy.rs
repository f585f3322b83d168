//! Default authorization policy per action name.
//!
//! Maps action-type names to a permission tier, an autonomy tier, a
//! baseline risk level, and a short rationale used by the consent gate.
//! Purely in-memory; callers persist overrides and trust grants if they
//! want durability.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::{AutonomyLevel, PermissionLevel, RiskLevel};

/// Policy for one action name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPolicy {
    pub permission: PermissionLevel,
    pub autonomy: AutonomyLevel,
    pub risk: RiskLevel,
    /// Why the policy is what it is; shown when asking for consent.
    pub rationale: String,
}

impl ActionPolicy {
    fn new(
        permission: PermissionLevel,
        autonomy: AutonomyLevel,
        risk: RiskLevel,
        rationale: &str,
    ) -> Self {
        Self {
            permission,
            autonomy,
            risk,
            rationale: rationale.to_string(),
        }
    }
}

/// Static default policy plus user overrides and a permanent trust set.
///
/// Resolution order, highest priority first: user override, trusted name,
/// static default, then the `Ask` fallback for unknown action names.
pub struct PolicyTable {
    defaults: HashMap<&'static str, ActionPolicy>,
    overrides: Mutex<HashMap<String, ActionPolicy>>,
    trusted: Mutex<HashSet<String>>,
}

impl PolicyTable {
    pub fn new() -> Self {
        use AutonomyLevel::*;
        use PermissionLevel::*;
        use RiskLevel::*;

        let mut defaults = HashMap::new();

        // Passive / read-only surface.
        defaults.insert(
            "web_search",
            ActionPolicy::new(Allow, AutoExecute, Low, "searching the web has no local effect"),
        );
        defaults.insert(
            "notification",
            ActionPolicy::new(Allow, AutoExecute, Low, "notifications are informational"),
        );
        defaults.insert(
            "clipboard_read",
            ActionPolicy::new(Allow, AutoExecute, Low, "reading the clipboard is passive"),
        );
        defaults.insert(
            "file_read",
            ActionPolicy::new(Allow, AutoExecute, Low, "reading files does not change them"),
        );
        defaults.insert(
            "app_launch",
            ActionPolicy::new(Allow, AutoExecute, Low, "launching an app is easily undone"),
        );

        // Mutating surface: ask first.
        defaults.insert(
            "file_write",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, Medium, "writing files changes user data"),
        );
        defaults.insert(
            "file_move",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, Medium, "moving files changes user data layout"),
        );
        defaults.insert(
            "file_delete",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "deleted files may not be recoverable"),
        );
        defaults.insert(
            "clipboard_write",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, Medium, "overwrites whatever the user copied"),
        );
        defaults.insert(
            "app_close",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, Medium, "closing an app may lose unsaved work"),
        );
        defaults.insert(
            "app_kill",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "force-killing a process loses unsaved work"),
        );
        defaults.insert(
            "app_uninstall",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, Critical, "uninstalling software is hard to undo"),
        );
        defaults.insert(
            "app_install",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "installing software changes the system"),
        );
        defaults.insert(
            "shell_command",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "shell commands can do anything"),
        );
        defaults.insert(
            "send_message",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "messages sent on your behalf cannot be unsent"),
        );
        defaults.insert(
            "send_email",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "email sent on your behalf cannot be unsent"),
        );
        defaults.insert(
            "keyboard_input",
            ActionPolicy::new(PermissionLevel::Ask, AutonomyLevel::Ask, High, "synthetic keystrokes go to whatever is focused"),
        );

        // Blocked surface: registry, system files, elevation.
        defaults.insert(
            "registry_edit",
            ActionPolicy::new(Block, Observe, Critical, "registry changes can break the system"),
        );
        defaults.insert(
            "registry_delete",
            ActionPolicy::new(Block, Observe, Critical, "registry deletions can break the system"),
        );
        defaults.insert(
            "system_file_write",
            ActionPolicy::new(Block, Observe, Critical, "system files are off limits"),
        );
        defaults.insert(
            "run_as_admin",
            ActionPolicy::new(Block, Observe, Critical, "elevated execution is off limits"),
        );

        Self {
            defaults,
            overrides: Mutex::new(HashMap::new()),
            trusted: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve the autonomy tier for an action name.
    pub fn level_for(&self, action_name: &str) -> AutonomyLevel {
        if let Some(over) = self.overrides.lock().unwrap().get(action_name) {
            return over.autonomy;
        }
        if self.trusted.lock().unwrap().contains(action_name) {
            return AutonomyLevel::AutoExecute;
        }
        self.defaults
            .get(action_name)
            .map(|p| p.autonomy)
            .unwrap_or(AutonomyLevel::Ask)
    }

    /// Resolve the permission tier for an action name.
    pub fn permission_for(&self, action_name: &str) -> PermissionLevel {
        if let Some(over) = self.overrides.lock().unwrap().get(action_name) {
            return over.permission;
        }
        if self.trusted.lock().unwrap().contains(action_name) {
            return PermissionLevel::Allow;
        }
        self.defaults
            .get(action_name)
            .map(|p| p.permission)
            .unwrap_or(PermissionLevel::Ask)
    }

    pub fn is_blocked(&self, action_name: &str) -> bool {
        self.permission_for(action_name) == PermissionLevel::Block
    }

    pub fn is_allowed(&self, action_name: &str) -> bool {
        self.permission_for(action_name) == PermissionLevel::Allow
    }

    pub fn requires_confirmation(&self, action_name: &str) -> bool {
        self.permission_for(action_name) == PermissionLevel::Ask
    }

    /// Baseline risk for an action name, if the policy knows it.
    pub fn risk_for(&self, action_name: &str) -> Option<RiskLevel> {
        if let Some(over) = self.overrides.lock().unwrap().get(action_name) {
            return Some(over.risk);
        }
        self.defaults.get(action_name).map(|p| p.risk)
    }

    /// The stored rationale for an action name; feeds "why I'm asking".
    pub fn rationale_for(&self, action_name: &str) -> Option<String> {
        if let Some(over) = self.overrides.lock().unwrap().get(action_name) {
            return Some(over.rationale.clone());
        }
        self.defaults
            .get(action_name)
            .map(|p| p.rationale.clone())
    }

    /// Permanently trust an action name: it resolves to Allow/AutoExecute
    /// until `untrust` is called.
    pub fn trust(&self, action_name: &str) {
        tracing::info!(action = action_name, "Action name trusted");
        self.trusted.lock().unwrap().insert(action_name.to_string());
    }

    pub fn untrust(&self, action_name: &str) {
        tracing::info!(action = action_name, "Action name untrusted");
        self.trusted.lock().unwrap().remove(action_name);
    }

    pub fn is_trusted(&self, action_name: &str) -> bool {
        self.trusted.lock().unwrap().contains(action_name)
    }

    /// Install a per-action override; wins over trust and defaults.
    pub fn set_override(&self, action_name: &str, policy: ActionPolicy) {
        self.overrides
            .lock()
            .unwrap()
            .insert(action_name.to_string(), policy);
    }

    pub fn clear_override(&self, action_name: &str) {
        self.overrides.lock().unwrap().remove(action_name);
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new()
    }
}
