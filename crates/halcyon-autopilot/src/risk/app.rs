//! Risk rules for application lifecycle operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PermissionLevel, RiskLevel};

use super::RiskAssessment;

/// Application lifecycle verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppVerb {
    Launch,
    Close,
    Kill,
    Uninstall,
}

impl fmt::Display for AppVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppVerb::Launch => write!(f, "launch"),
            AppVerb::Close => write!(f, "close"),
            AppVerb::Kill => write!(f, "kill"),
            AppVerb::Uninstall => write!(f, "uninstall"),
        }
    }
}

impl std::str::FromStr for AppVerb {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "launch" | "open" => Ok(AppVerb::Launch),
            "close" => Ok(AppVerb::Close),
            "kill" | "terminate" => Ok(AppVerb::Kill),
            "uninstall" => Ok(AppVerb::Uninstall),
            _ => Err(format!("Unknown app verb: {}", s)),
        }
    }
}

/// Fixed lookup by verb. Uninstall is Ask rather than Block: only
/// registry, system-file, and elevation categories default to Block.
pub(super) fn assess(verb: AppVerb, app: &str) -> RiskAssessment {
    let mut assessment = RiskAssessment::base(&format!("app {}", verb));

    let (level, recommended, factor) = match verb {
        AppVerb::Launch => (RiskLevel::Low, PermissionLevel::Allow, "launching is easily undone"),
        AppVerb::Close => (
            RiskLevel::Medium,
            PermissionLevel::Ask,
            "closing may lose unsaved work",
        ),
        AppVerb::Kill => (
            RiskLevel::High,
            PermissionLevel::Ask,
            "force-kill loses unsaved work",
        ),
        AppVerb::Uninstall => (
            RiskLevel::Critical,
            PermissionLevel::Ask,
            "uninstalling is hard to undo",
        ),
    };

    assessment.escalate(level, factor);
    assessment.recommended = recommended;
    if level >= RiskLevel::High {
        assessment.warnings.push(format!("{} {}: {}", verb, app, factor));
    }
    assessment
}
