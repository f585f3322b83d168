//! JSON persistence for autopilot state.
//!
//! Engine configuration, rules, workflows, and audit entries are saved as
//! JSON documents at fixed locations under one data directory. A failed
//! load warns and yields an empty/default value; a failed save is logged
//! by callers and never poisons in-memory state, which stays authoritative
//! for the running process.

use std::path::{Path, PathBuf};

use halcyon_core::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::audit::AuditLogEntry;
use crate::rules::AutopilotRule;
use crate::types::AutopilotConfig;
use crate::workflow::AutopilotWorkflow;

const CONFIG_FILE: &str = "autopilot.json";
const RULES_FILE: &str = "rules.json";
const WORKFLOWS_FILE: &str = "workflows.json";
const AUDIT_FILE: &str = "audit.json";

/// File-backed store rooted at a data directory.
pub struct AutopilotStore {
    dir: PathBuf,
}

impl AutopilotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_or<T: DeserializeOwned>(&self, file: &str, fallback: T) -> T {
        let path = self.dir.join(file);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return fallback,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read document; using default");
                return fallback;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed document; using default");
                fallback
            }
        }
    }

    fn save<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)?;
        info!(path = %path.display(), "Document saved");
        Ok(())
    }

    pub fn load_config(&self) -> AutopilotConfig {
        self.load_or(CONFIG_FILE, AutopilotConfig::default())
    }

    pub fn save_config(&self, config: &AutopilotConfig) -> Result<()> {
        self.save(CONFIG_FILE, config)
    }

    pub fn load_rules(&self) -> Vec<AutopilotRule> {
        self.load_or(RULES_FILE, Vec::new())
    }

    pub fn save_rules(&self, rules: &[AutopilotRule]) -> Result<()> {
        self.save(RULES_FILE, &rules)
    }

    pub fn load_workflows(&self) -> Vec<AutopilotWorkflow> {
        self.load_or(WORKFLOWS_FILE, Vec::new())
    }

    pub fn save_workflows(&self, workflows: &[AutopilotWorkflow]) -> Result<()> {
        self.save(WORKFLOWS_FILE, &workflows)
    }

    pub fn load_audit(&self) -> Vec<AuditLogEntry> {
        self.load_or(AUDIT_FILE, Vec::new())
    }

    pub fn save_audit(&self, entries: &[AuditLogEntry]) -> Result<()> {
        self.save(AUDIT_FILE, &entries)
    }
}
