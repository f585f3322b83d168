//! User-authored automation rules and rule matching.
//!
//! Rules are created from free-form text by a `RuleParser`, validated, and
//! stored in configuration order. The matcher decides which rule, if any,
//! covers a proposed action; it assigns an autonomy tier only; yes/no
//! consent stays with the consent gate.

use std::fmt;
use std::sync::{Arc, Mutex};

use halcyon_core::types::Timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::RuleError;
use crate::types::{ActionContext, AutonomyLevel, AutopilotAction, TriggerKind};

// =============================================================================
// Parsed rule structure
// =============================================================================

/// Comparison operator for a parsed condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionOp::Equals => write!(f, "=="),
            ConditionOp::Contains => write!(f, "contains"),
            ConditionOp::GreaterThan => write!(f, ">"),
            ConditionOp::LessThan => write!(f, "<"),
        }
    }
}

/// A parsed condition evaluated against the action's context snapshot.
/// Known fields: `hour`, `weekday`, `idle_minutes`, `active_app`, `away`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: String,
    pub operator: ConditionOp,
    pub value: String,
}

/// The parsed action side of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAction {
    pub action_type: String,
    pub parameters: serde_json::Value,
}

/// A user-authored automation rule.
///
/// Mutable only through explicit enable/disable or removal; the engine
/// never rewrites a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotRule {
    pub id: Uuid,
    /// The raw text the user wrote.
    pub text: String,
    pub condition: Option<RuleCondition>,
    pub action: Option<RuleAction>,
    pub autonomy: AutonomyLevel,
    pub enabled: bool,
    /// Action-type names this rule covers.
    pub allowed_actions: Vec<String>,
    pub trigger: TriggerKind,
    pub run_count: u64,
    pub last_run_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

// =============================================================================
// Parser seam
// =============================================================================

/// Converts free-form rule text into a structured rule and evaluates
/// parsed conditions. Treated as a black box by the engine.
pub trait RuleParser: Send + Sync {
    /// Parse rule text into an unvalidated rule.
    fn parse(&self, text: &str) -> Result<AutopilotRule, RuleError>;

    /// A usable rule must resolve to at least one concrete action name or
    /// carry a condition.
    fn validate(&self, rule: &AutopilotRule) -> Result<(), RuleError> {
        if rule.allowed_actions.is_empty() && rule.condition.is_none() {
            return Err(RuleError::Validation(
                "rule resolves to no action name and no condition".to_string(),
            ));
        }
        Ok(())
    }

    /// Evaluate a parsed condition against a context snapshot.
    fn matches_condition(&self, condition: &RuleCondition, context: &ActionContext) -> bool;
}

/// Regex/keyword reference implementation of `RuleParser`.
///
/// Good enough for rules like "when I'm away, automatically close chrome"
/// or "if idle_minutes > 30, organize my downloads". A smarter parser can
/// be swapped in behind the same trait.
pub struct KeywordRuleParser {
    idle_pattern: Regex,
    app_open_pattern: Regex,
    condition_pattern: Regex,
}

impl KeywordRuleParser {
    pub fn new() -> Self {
        Self {
            idle_pattern: Regex::new(r"(?i)\bidle\s+(?:for\s+)?(\d+)\s*min")
                .expect("Invalid idle regex"),
            app_open_pattern: Regex::new(r"(?i)\bwhen\s+i\s+open\s+([a-z0-9_ .-]+?)(?:,|$)")
                .expect("Invalid app-open regex"),
            condition_pattern: Regex::new(
                r"(?i)\bif\s+(hour|weekday|idle_minutes|active_app|away)\s*(==|>|<|contains)\s*([a-z0-9_ .-]+?)(?:,|$)",
            )
            .expect("Invalid condition regex"),
        }
    }

    /// Keyword table mapping verbs in rule text to action-type names.
    fn extract_actions(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let table: &[(&[&str], &str)] = &[
            (&["delete", "clean up", "remove old"], "file_delete"),
            (&["organize", "move", "tidy"], "file_move"),
            (&["write", "save a note", "jot"], "file_write"),
            (&["open", "launch", "start"], "app_launch"),
            (&["close"], "app_close"),
            (&["run", "execute"], "shell_command"),
            (&["send a message", "send message", "message"], "send_message"),
            (&["email"], "send_email"),
            (&["notify", "remind", "alert"], "notification"),
            (&["search"], "web_search"),
        ];

        let mut actions = Vec::new();
        for (keywords, action_type) in table {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                actions.push(action_type.to_string());
            }
        }
        actions
    }
}

impl Default for KeywordRuleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleParser for KeywordRuleParser {
    fn parse(&self, text: &str) -> Result<AutopilotRule, RuleError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RuleError::Parse("rule text is empty".to_string()));
        }
        let lower = trimmed.to_lowercase();

        let autonomy = if lower.contains("automatically") || lower.contains("without asking") {
            AutonomyLevel::AutoExecute
        } else if lower.contains("just watch") || lower.contains("only log") {
            AutonomyLevel::Observe
        } else {
            AutonomyLevel::Ask
        };

        let mut condition = None;
        let trigger = if lower.contains("away") {
            condition = Some(RuleCondition {
                field: "away".to_string(),
                operator: ConditionOp::Equals,
                value: "true".to_string(),
            });
            TriggerKind::OnAway
        } else if let Some(caps) = self.idle_pattern.captures(trimmed) {
            condition = Some(RuleCondition {
                field: "idle_minutes".to_string(),
                operator: ConditionOp::GreaterThan,
                value: caps[1].to_string(),
            });
            TriggerKind::OnIdle
        } else if let Some(caps) = self.app_open_pattern.captures(trimmed) {
            condition = Some(RuleCondition {
                field: "active_app".to_string(),
                operator: ConditionOp::Contains,
                value: caps[1].trim().to_lowercase(),
            });
            TriggerKind::OnAppOpen
        } else if let Some(caps) = self.condition_pattern.captures(trimmed) {
            let operator = match &caps[2] {
                "==" => ConditionOp::Equals,
                ">" => ConditionOp::GreaterThan,
                "<" => ConditionOp::LessThan,
                _ => ConditionOp::Contains,
            };
            condition = Some(RuleCondition {
                field: caps[1].to_lowercase(),
                operator,
                value: caps[3].trim().to_lowercase(),
            });
            TriggerKind::OnCondition
        } else if lower.contains("every ") || lower.contains(" at ") {
            TriggerKind::Scheduled
        } else {
            TriggerKind::Manual
        };

        let allowed_actions = Self::extract_actions(trimmed);
        let action = allowed_actions.first().map(|action_type| RuleAction {
            action_type: action_type.clone(),
            parameters: serde_json::json!({}),
        });

        Ok(AutopilotRule {
            id: Uuid::new_v4(),
            text: trimmed.to_string(),
            condition,
            action,
            autonomy,
            enabled: true,
            allowed_actions,
            trigger,
            run_count: 0,
            last_run_at: None,
            created_at: Timestamp::now(),
        })
    }

    fn matches_condition(&self, condition: &RuleCondition, context: &ActionContext) -> bool {
        let field_value: String = match condition.field.as_str() {
            "hour" => context.hour.to_string(),
            "weekday" => context.weekday.to_string(),
            "idle_minutes" => context.idle_minutes.to_string(),
            "active_app" => context
                .active_app
                .as_deref()
                .unwrap_or("")
                .to_lowercase(),
            "away" => context.away_mode.to_string(),
            _ => return false,
        };

        match condition.operator {
            ConditionOp::Equals => field_value == condition.value,
            ConditionOp::Contains => field_value.contains(&condition.value),
            ConditionOp::GreaterThan | ConditionOp::LessThan => {
                let (Ok(lhs), Ok(rhs)) =
                    (field_value.parse::<i64>(), condition.value.parse::<i64>())
                else {
                    return false;
                };
                if condition.operator == ConditionOp::GreaterThan {
                    lhs > rhs
                } else {
                    lhs < rhs
                }
            }
        }
    }
}

// =============================================================================
// Rule book (the matcher)
// =============================================================================

/// Insertion-ordered rule collection plus the parser used to evaluate
/// conditions. When several enabled rules match, the first configured one
/// wins.
pub struct RuleBook {
    rules: Mutex<Vec<AutopilotRule>>,
    parser: Arc<dyn RuleParser>,
}

impl RuleBook {
    pub fn new(parser: Arc<dyn RuleParser>) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            parser,
        }
    }

    /// Parse, validate, and store a rule from user text. Validation
    /// failures surface synchronously; nothing is stored on error.
    pub fn add_text(&self, text: &str) -> Result<AutopilotRule, RuleError> {
        let rule = self.parser.parse(text)?;
        self.parser.validate(&rule)?;
        self.rules.lock().unwrap().push(rule.clone());
        debug!(rule_id = %rule.id, trigger = %rule.trigger, "Rule added");
        Ok(rule)
    }

    /// Store an already-parsed rule after validation.
    pub fn add(&self, rule: AutopilotRule) -> Result<(), RuleError> {
        self.parser.validate(&rule)?;
        self.rules.lock().unwrap().push(rule);
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        rules.len() < before
    }

    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> bool {
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<AutopilotRule> {
        self.rules.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn list(&self) -> Vec<AutopilotRule> {
        self.rules.lock().unwrap().clone()
    }

    /// Replace the whole collection (used when loading persisted rules).
    pub fn replace_all(&self, rules: Vec<AutopilotRule>) {
        *self.rules.lock().unwrap() = rules;
    }

    /// Find the first enabled rule covering this action: either the
    /// action's type name is in the rule's allowed list, or the rule's
    /// condition holds for the action's context.
    pub fn match_action(&self, action: &AutopilotAction) -> Option<AutopilotRule> {
        let rules = self.rules.lock().unwrap();
        rules
            .iter()
            .filter(|r| r.enabled)
            .find(|r| {
                r.allowed_actions.iter().any(|a| a == &action.action_type)
                    || r.condition
                        .as_ref()
                        .is_some_and(|c| self.parser.matches_condition(c, &action.context))
            })
            .cloned()
    }

    /// Bump a rule's execution statistics after a successful run.
    pub fn record_run(&self, id: Uuid) {
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| r.id == id) {
            rule.run_count += 1;
            rule.last_run_at = Some(Timestamp::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionStatus;

    fn make_book() -> RuleBook {
        RuleBook::new(Arc::new(KeywordRuleParser::new()))
    }

    fn make_action(action_type: &str, context: ActionContext) -> AutopilotAction {
        AutopilotAction {
            id: Uuid::new_v4(),
            action_type: action_type.to_string(),
            description: String::new(),
            reasoning: String::new(),
            parameters: serde_json::json!({}),
            context,
            required_level: AutonomyLevel::Ask,
            auto_executed: false,
            approved: false,
            rule_id: None,
            assessment: None,
            status: ActionStatus::Pending,
            created_at: Timestamp::now(),
            completed_at: None,
            output: None,
            error: None,
        }
    }

    // ---- parser ----

    #[test]
    fn test_parse_away_rule() {
        let parser = KeywordRuleParser::new();
        let rule = parser
            .parse("When I'm away, automatically close chrome")
            .unwrap();
        assert_eq!(rule.trigger, TriggerKind::OnAway);
        assert_eq!(rule.autonomy, AutonomyLevel::AutoExecute);
        assert!(rule.allowed_actions.contains(&"app_close".to_string()));
        assert!(rule.condition.is_some());
    }

    #[test]
    fn test_parse_idle_rule_with_threshold() {
        let parser = KeywordRuleParser::new();
        let rule = parser
            .parse("After being idle for 30 minutes, organize my downloads")
            .unwrap();
        assert_eq!(rule.trigger, TriggerKind::OnIdle);
        let cond = rule.condition.unwrap();
        assert_eq!(cond.field, "idle_minutes");
        assert_eq!(cond.operator, ConditionOp::GreaterThan);
        assert_eq!(cond.value, "30");
    }

    #[test]
    fn test_parse_condition_rule() {
        let parser = KeywordRuleParser::new();
        let rule = parser
            .parse("if hour > 18, remind me to stretch")
            .unwrap();
        assert_eq!(rule.trigger, TriggerKind::OnCondition);
        let cond = rule.condition.unwrap();
        assert_eq!(cond.field, "hour");
        assert_eq!(cond.value, "18");
    }

    #[test]
    fn test_parse_defaults_to_ask() {
        let parser = KeywordRuleParser::new();
        let rule = parser.parse("close chrome when I say so").unwrap();
        assert_eq!(rule.autonomy, AutonomyLevel::Ask);
    }

    #[test]
    fn test_parse_empty_text_fails() {
        let parser = KeywordRuleParser::new();
        assert!(matches!(parser.parse("   "), Err(RuleError::Parse(_))));
    }

    #[test]
    fn test_validation_requires_action_or_condition() {
        let book = make_book();
        // No recognizable action verb, no condition.
        let err = book.add_text("do the needful").unwrap_err();
        assert!(matches!(err, RuleError::Validation(_)));
        assert!(book.list().is_empty());
    }

    // ---- condition evaluation ----

    #[test]
    fn test_matches_condition_fields() {
        let parser = KeywordRuleParser::new();
        let ctx = ActionContext {
            hour: 20,
            weekday: 3,
            active_app: Some("Chrome Browser".to_string()),
            idle_minutes: 45,
            away_mode: true,
        };

        let hour = RuleCondition {
            field: "hour".to_string(),
            operator: ConditionOp::GreaterThan,
            value: "18".to_string(),
        };
        assert!(parser.matches_condition(&hour, &ctx));

        let idle = RuleCondition {
            field: "idle_minutes".to_string(),
            operator: ConditionOp::LessThan,
            value: "30".to_string(),
        };
        assert!(!parser.matches_condition(&idle, &ctx));

        let app = RuleCondition {
            field: "active_app".to_string(),
            operator: ConditionOp::Contains,
            value: "chrome".to_string(),
        };
        assert!(parser.matches_condition(&app, &ctx));

        let away = RuleCondition {
            field: "away".to_string(),
            operator: ConditionOp::Equals,
            value: "true".to_string(),
        };
        assert!(parser.matches_condition(&away, &ctx));
    }

    #[test]
    fn test_matches_condition_unknown_field_is_false() {
        let parser = KeywordRuleParser::new();
        let cond = RuleCondition {
            field: "moon_phase".to_string(),
            operator: ConditionOp::Equals,
            value: "full".to_string(),
        };
        assert!(!parser.matches_condition(&cond, &ActionContext::default()));
    }

    // ---- matching ----

    #[test]
    fn test_match_by_allowed_action_name() {
        let book = make_book();
        let rule = book
            .add_text("automatically close chrome when I'm away")
            .unwrap();

        let action = make_action("app_close", ActionContext::default());
        let matched = book.match_action(&action).unwrap();
        assert_eq!(matched.id, rule.id);
    }

    #[test]
    fn test_match_by_condition() {
        let book = make_book();
        let rule = book.add_text("if away == true, just watch everything").unwrap();

        let mut ctx = ActionContext::default();
        ctx.away_mode = true;
        let action = make_action("file_read", ctx);
        let matched = book.match_action(&action).unwrap();
        assert_eq!(matched.id, rule.id);

        // Condition false: no match.
        let action = make_action("file_read", ActionContext::default());
        assert!(book.match_action(&action).is_none());
    }

    #[test]
    fn test_disabled_rules_never_match() {
        let book = make_book();
        let rule = book.add_text("automatically close chrome").unwrap();
        assert!(book.set_enabled(rule.id, false));

        let action = make_action("app_close", ActionContext::default());
        assert!(book.match_action(&action).is_none());
    }

    #[test]
    fn test_first_configured_rule_wins() {
        // Two enabled rules cover app_close; ties resolve to the one added
        // first.
        let book = make_book();
        let first = book.add_text("close chrome when I say so").unwrap();
        let second = book.add_text("automatically close everything").unwrap();
        assert_ne!(first.id, second.id);

        let action = make_action("app_close", ActionContext::default());
        let matched = book.match_action(&action).unwrap();
        assert_eq!(matched.id, first.id);
    }

    #[test]
    fn test_remove_and_enable_unknown_rule() {
        let book = make_book();
        assert!(!book.remove(Uuid::new_v4()));
        assert!(!book.set_enabled(Uuid::new_v4(), true));
    }

    #[test]
    fn test_record_run_updates_stats() {
        let book = make_book();
        let rule = book.add_text("automatically close chrome").unwrap();
        assert_eq!(rule.run_count, 0);

        book.record_run(rule.id);
        book.record_run(rule.id);

        let updated = book.get(rule.id).unwrap();
        assert_eq!(updated.run_count, 2);
        assert!(updated.last_run_at.is_some());
    }

    #[test]
    fn test_rule_serde_round_trip() {
        let parser = KeywordRuleParser::new();
        let rule = parser
            .parse("when I'm away, automatically organize my downloads")
            .unwrap();
        let json = serde_json::to_string(&rule).unwrap();
        let rt: AutopilotRule = serde_json::from_str(&json).unwrap();
        assert_eq!(rt.id, rule.id);
        assert_eq!(rt.trigger, TriggerKind::OnAway);
        assert_eq!(rt.allowed_actions, rule.allowed_actions);
    }
}
