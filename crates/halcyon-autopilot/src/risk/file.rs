//! Risk rules for file operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PermissionLevel, RiskLevel};

use super::RiskAssessment;

/// What the file operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Read,
    Write,
    Delete,
    Move,
    Copy,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOperation::Read => write!(f, "read"),
            FileOperation::Write => write!(f, "write"),
            FileOperation::Delete => write!(f, "delete"),
            FileOperation::Move => write!(f, "move"),
            FileOperation::Copy => write!(f, "copy"),
        }
    }
}

impl std::str::FromStr for FileOperation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(FileOperation::Read),
            "write" => Ok(FileOperation::Write),
            "delete" => Ok(FileOperation::Delete),
            "move" => Ok(FileOperation::Move),
            "copy" => Ok(FileOperation::Copy),
            _ => Err(format!("Unknown file operation: {}", s)),
        }
    }
}

/// Directories no assistant action should touch.
const PROTECTED_DIRS: &[&str] = &[
    "c:\\windows",
    "c:/windows",
    "c:\\program files",
    "c:/program files",
    "c:\\program files (x86)",
    "c:/program files (x86)",
    "/etc",
    "/usr",
    "/bin",
    "/sbin",
    "/boot",
    "/system",
    "/library/system",
];

/// Extensions that carry executable or system-configuration payloads.
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "dll", "sys", "bat", "cmd", "ps1", "vbs", "msi", "reg", "scr", "com", "sh",
];

/// Assess one file operation. Risk only escalates.
pub(super) fn assess(operation: FileOperation, path: &str) -> RiskAssessment {
    let mut assessment = RiskAssessment::base(&format!("file {}", operation));

    match operation {
        FileOperation::Read => {}
        FileOperation::Write | FileOperation::Move | FileOperation::Copy => {
            assessment.escalate(RiskLevel::Medium, "modifies user data");
            assessment.recommended = PermissionLevel::Ask;
        }
        FileOperation::Delete => {
            assessment.escalate(RiskLevel::High, "deletion may be unrecoverable");
            assessment.recommended = PermissionLevel::Ask;
        }
    }

    let lower = path.to_lowercase();

    if let Some(dir) = PROTECTED_DIRS.iter().find(|d| lower.starts_with(**d)) {
        assessment.escalate(RiskLevel::Critical, "path is under a protected system directory");
        assessment
            .warnings
            .push(format!("{} touches the protected directory {}", operation, dir));
        // System-file category defaults to Block.
        assessment.recommended = PermissionLevel::Block;
    }

    if let Some(ext) = lower.rsplit('.').next().filter(|e| *e != lower) {
        if DANGEROUS_EXTENSIONS.contains(&ext) {
            assessment.escalate(RiskLevel::High, "file extension is executable or system-level");
            assessment
                .warnings
                .push(format!(".{} files can carry executable payloads", ext));
            if assessment.recommended == PermissionLevel::Allow {
                assessment.recommended = PermissionLevel::Ask;
            }
        }
    }

    assessment
}
