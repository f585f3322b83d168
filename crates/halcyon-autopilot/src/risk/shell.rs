//! Risk rules for shell commands.

use regex::Regex;

use crate::types::{PermissionLevel, RiskLevel};

use super::RiskAssessment;

/// One compiled hazard pattern with its factor and warning text.
pub(super) struct ShellPattern {
    regex: Regex,
    factor: &'static str,
    warning: &'static str,
    /// Registry manipulation also recommends Block.
    recommend_block: bool,
}

/// Substrings that indicate elevated execution. Matching any of these
/// forces Critical / Block regardless of other factors.
const ELEVATION_KEYWORDS: &[&str] = &["run as admin", "runas", "sudo ", "administrator"];

pub(super) fn compile_patterns() -> Vec<ShellPattern> {
    let table: &[(&str, &str, &str, bool)] = &[
        (
            r"(?i)\b(rm\s+-[a-z]*r[a-z]*f|rm\s+-[a-z]*f[a-z]*r|del\s+/s|rd\s+/s|remove-item\b.*-recurse)",
            "recursive delete",
            "Recursively deletes files without confirmation",
            false,
        ),
        (
            r"(?i)\bformat(\.com)?\s+[a-z]:",
            "drive format",
            "Formats a drive, destroying everything on it",
            false,
        ),
        (
            r"(?i)\breg(\.exe)?\s+(add|delete)\b",
            "registry modification",
            "Modifies the Windows registry",
            true,
        ),
        (
            r"(?i)\b(shutdown|restart-computer|reboot)\b",
            "shutdown or restart",
            "Shuts down or restarts the machine",
            false,
        ),
        (
            r"(?i)(\btaskkill\b.*(/f|-f)|\bkill\s+-9\b|\bpkill\s+-9\b)",
            "forced process kill",
            "Force-kills a process, losing unsaved work",
            false,
        ),
    ];

    table
        .iter()
        .map(|&(pattern, factor, warning, recommend_block)| ShellPattern {
            regex: Regex::new(pattern).expect("Invalid shell hazard regex"),
            factor,
            warning,
            recommend_block,
        })
        .collect()
}

/// Assess one shell command against the hazard table. Risk only escalates;
/// each matched pattern appends its own specific warning.
pub(super) fn assess(patterns: &[ShellPattern], command: &str) -> RiskAssessment {
    let mut assessment = RiskAssessment::base("shell command");
    assessment.escalate(RiskLevel::Medium, "arbitrary command execution");
    assessment.recommended = PermissionLevel::Ask;

    for pattern in patterns {
        if pattern.regex.is_match(command) {
            assessment.escalate(RiskLevel::High, pattern.factor);
            assessment.warnings.push(pattern.warning.to_string());
            if pattern.recommend_block {
                assessment.recommended = PermissionLevel::Block;
            }
        }
    }

    let lower = command.to_lowercase();
    if ELEVATION_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        assessment.escalate(RiskLevel::Critical, "requests elevated execution");
        assessment
            .warnings
            .push("Runs with elevated privileges".to_string());
        assessment.recommended = PermissionLevel::Block;
    }

    assessment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assess_cmd(command: &str) -> RiskAssessment {
        assess(&compile_patterns(), command)
    }

    #[test]
    fn test_plain_command_is_medium_ask() {
        let a = assess_cmd("ls -la");
        assert_eq!(a.level, RiskLevel::Medium);
        assert_eq!(a.recommended, PermissionLevel::Ask);
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn test_recursive_delete_is_high() {
        for cmd in ["rm -rf /tmp/cache", "del /s C:\\temp", "Remove-Item C:\\temp -Recurse"] {
            let a = assess_cmd(cmd);
            assert_eq!(a.level, RiskLevel::High, "cmd: {}", cmd);
            assert!(
                a.warnings.iter().any(|w| w.contains("Recursively")),
                "cmd: {}",
                cmd
            );
        }
    }

    #[test]
    fn test_format_is_high() {
        let a = assess_cmd("format D:");
        assert_eq!(a.level, RiskLevel::High);
        assert!(a.warnings.iter().any(|w| w.contains("Formats")));
    }

    #[test]
    fn test_registry_recommends_block() {
        let a = assess_cmd("reg delete HKLM\\Software\\Foo /f");
        assert_eq!(a.level, RiskLevel::High);
        assert_eq!(a.recommended, PermissionLevel::Block);
        assert!(a.warnings.iter().any(|w| w.contains("registry")));
    }

    #[test]
    fn test_shutdown_and_kill_patterns() {
        assert_eq!(assess_cmd("shutdown /s /t 0").level, RiskLevel::High);
        assert_eq!(assess_cmd("taskkill /im chrome.exe /f").level, RiskLevel::High);
        assert_eq!(assess_cmd("kill -9 1234").level, RiskLevel::High);
    }

    #[test]
    fn test_elevation_forces_critical_block() {
        for cmd in [
            "sudo rm /var/log/syslog",
            "runas /user:Administrator cmd",
            "run as admin: installer.exe",
        ] {
            let a = assess_cmd(cmd);
            assert_eq!(a.level, RiskLevel::Critical, "cmd: {}", cmd);
            assert_eq!(a.recommended, PermissionLevel::Block, "cmd: {}", cmd);
        }
    }

    #[test]
    fn test_elevation_outranks_everything_else() {
        // Elevation forces Critical/Block even when combined with other
        // matched hazards.
        let a = assess_cmd("sudo rm -rf /");
        assert_eq!(a.level, RiskLevel::Critical);
        assert_eq!(a.recommended, PermissionLevel::Block);
        assert!(a.warnings.len() >= 2);
    }

    #[test]
    fn test_one_warning_per_matched_pattern() {
        let a = assess_cmd("rm -rf /old && shutdown -h now");
        let recursive = a.warnings.iter().filter(|w| w.contains("Recursively")).count();
        let shutdown = a.warnings.iter().filter(|w| w.contains("Shuts down")).count();
        assert_eq!(recursive, 1);
        assert_eq!(shutdown, 1);
    }
}
