//! Per-instance risk assessment.
//!
//! A pure computation of how dangerous a proposed action instance is,
//! independent of whether it is ultimately allowed. Requests are a tagged
//! variant per action category; each category owns its own rule set. Risk
//! only escalates within one assessment, never de-escalates.

mod app;
mod file;
mod shell;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PermissionLevel, RiskLevel};

pub use app::AppVerb;
pub use file::FileOperation;

/// A concrete action instance to be assessed, one variant per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "category")]
pub enum ActionRequest {
    FileOp {
        operation: FileOperation,
        path: String,
    },
    ShellCommand {
        command: String,
    },
    AppLifecycle {
        verb: AppVerb,
        app: String,
    },
}

impl ActionRequest {
    /// Derive a request from a proposed action's type name and JSON
    /// parameters, when they classify into a known category.
    pub fn classify(action_type: &str, parameters: &serde_json::Value) -> Option<Self> {
        if action_type == "shell_command" || action_type.contains("command") {
            let command = parameters.get("command")?.as_str()?.to_string();
            return Some(ActionRequest::ShellCommand { command });
        }

        if let Some(op) = action_type.strip_prefix("file_") {
            let operation: FileOperation = op.parse().ok()?;
            let path = parameters.get("path")?.as_str()?.to_string();
            return Some(ActionRequest::FileOp { operation, path });
        }

        if let Some(verb) = action_type.strip_prefix("app_") {
            let verb: AppVerb = verb.parse().ok()?;
            let app = parameters
                .get("app")
                .or_else(|| parameters.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            return Some(ActionRequest::AppLifecycle { verb, app });
        }

        None
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionRequest::FileOp { operation, path } => write!(f, "{} {}", operation, path),
            ActionRequest::ShellCommand { command } => write!(f, "run: {}", command),
            ActionRequest::AppLifecycle { verb, app } => write!(f, "{} {}", verb, app),
        }
    }
}

/// The result of assessing one action instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Ordered list of contributing factors.
    pub factors: Vec<String>,
    /// Human-readable warnings, one per matched hazard.
    pub warnings: Vec<String>,
    /// The tier this assessment recommends to the consent gate.
    pub recommended: PermissionLevel,
    pub explanation: String,
}

impl RiskAssessment {
    /// Escalate to at least `level`, recording the reason. Risk never
    /// de-escalates within one assessment.
    pub(crate) fn escalate(&mut self, level: RiskLevel, factor: &str) {
        self.level = self.level.max(level);
        self.factors.push(factor.to_string());
    }

    pub(crate) fn base(factor: &str) -> Self {
        Self {
            level: RiskLevel::Low,
            factors: vec![factor.to_string()],
            warnings: Vec::new(),
            recommended: PermissionLevel::Allow,
            explanation: String::new(),
        }
    }
}

/// Stateless assessor holding the compiled shell pattern table.
///
/// `assess` performs no I/O and mutates no shared state, so it can be
/// invoked freely for preview and explanation purposes.
pub struct RiskAssessor {
    shell_patterns: Vec<shell::ShellPattern>,
}

impl RiskAssessor {
    pub fn new() -> Self {
        Self {
            shell_patterns: shell::compile_patterns(),
        }
    }

    /// Assess one request against its category's rule set.
    pub fn assess(&self, request: &ActionRequest) -> RiskAssessment {
        let mut assessment = match request {
            ActionRequest::FileOp { operation, path } => file::assess(*operation, path),
            ActionRequest::ShellCommand { command } => {
                shell::assess(&self.shell_patterns, command)
            }
            ActionRequest::AppLifecycle { verb, app } => app::assess(*verb, app),
        };

        if assessment.explanation.is_empty() {
            assessment.explanation = format!(
                "{} risk: {}",
                assessment.level,
                assessment.factors.join("; ")
            );
        }
        assessment
    }
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new()
    }
}
