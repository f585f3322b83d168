//! Halcyon application binary - composition root.
//!
//! Ties the autopilot crates together into a single executable:
//! 1. Load application configuration from TOML
//! 2. Load autopilot state (config, rules, workflows, audit) from JSON
//! 3. Construct policy, consent, rules, and the engine explicitly -- no
//!    global singletons, everything wired here and passed by reference
//! 4. Print domain events as they arrive
//! 5. Drive the engine from a line-based operator console

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use halcyon_core::config::HalcyonConfig;
use halcyon_core::events::DomainEvent;

use halcyon_autopilot::{
    AutopilotEngine, AutopilotStore, ConsentGate, KeywordRuleParser, PolicyTable, RuleBook,
    StagingExecutor, WorkflowBook,
};

#[derive(Parser)]
#[command(name = "halcyon", about = "Halcyon assistant autopilot console")]
struct Args {
    /// Path to the TOML config file (default: ~/.halcyon/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the data directory from the config file.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Resolve the config file path (flag, HALCYON_CONFIG env, or default).
fn config_path(args: &Args) -> PathBuf {
    if let Some(path) = &args.config {
        return path.clone();
    }
    if let Ok(path) = std::env::var("HALCYON_CONFIG") {
        return PathBuf::from(path);
    }
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".halcyon").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".halcyon").join("config.toml");
    }
    PathBuf::from("config.toml")
}

fn print_event(event: &DomainEvent) {
    match event {
        DomainEvent::ActionPending {
            action_id,
            action_type,
            description,
            risk,
            ..
        } => {
            let risk = risk.as_deref().unwrap_or("unassessed");
            println!("[pending] {} {} ({}) risk={}", action_id, action_type, description, risk);
        }
        DomainEvent::ActionExecuted {
            action_id,
            action_type,
            auto_executed,
            ..
        } => {
            let how = if *auto_executed { "auto" } else { "approved" };
            println!("[executed] {} {} ({})", action_id, action_type, how);
        }
        DomainEvent::ActionFailed {
            action_id,
            action_type,
            error,
            ..
        } => println!("[failed] {} {}: {}", action_id, action_type, error),
        DomainEvent::SuggestionGenerated { title, .. } => println!("[suggestion] {}", title),
        DomainEvent::StatusChanged { status, .. } => println!("[status] {}", status),
        DomainEvent::AwaySummaryReady {
            total_actions,
            successful_actions,
            failed_actions,
            ..
        } => println!(
            "[away] session ended: {} actions ({} ok, {} failed)",
            total_actions, successful_actions, failed_actions
        ),
        _ => println!("[event] {}", event.kind()),
    }
}

const HELP: &str = "\
commands:
  status                      engine status snapshot
  propose <type> <desc...>    propose an action
  pending                     list actions awaiting approval
  approve <id-prefix>         approve a queued action
  reject <id-prefix> [why]    reject a queued action
  rule <text...>              add an automation rule from text
  rules                       list rules
  trust <type> | untrust <type>
  away [reason] | back        open/close an away session
  suggest <title...>          emit a suggestion
  audit [n]                   recent audit entries
  enable | disable            toggle the engine
  expire                      cancel stale pending approvals
  quit";

/// Resolve a queued action by id prefix.
fn find_pending(engine: &AutopilotEngine, prefix: &str) -> Option<uuid::Uuid> {
    engine
        .pending_actions()
        .iter()
        .find(|a| a.id.to_string().starts_with(prefix))
        .map(|a| a.id)
}

async fn handle_line(engine: &Arc<AutopilotEngine>, rules: &Arc<RuleBook>, line: &str) -> bool {
    let mut parts = line.trim().splitn(2, ' ');
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "" => {}
        "help" => println!("{}", HELP),
        "status" => println!("{:#?}", engine.status()),
        "propose" => {
            let mut words = rest.splitn(2, ' ');
            let action_type = words.next().unwrap_or("");
            let description = words.next().unwrap_or(action_type);
            if action_type.is_empty() {
                println!("usage: propose <type> <description>");
            } else {
                match engine
                    .propose(action_type, description, "operator request", serde_json::json!({}), None)
                    .await
                {
                    Some(action) => println!("{} -> {}", action.id, action.status),
                    None => println!("refused (disabled, blocklisted, or rate-limited)"),
                }
            }
        }
        "pending" => {
            for action in engine.pending_actions() {
                println!("{} {} ({})", action.id, action.action_type, action.description);
            }
        }
        "approve" => match find_pending(engine, rest) {
            Some(id) => println!("approved: {}", engine.approve(id, None).await),
            None => println!("no queued action matches '{}'", rest),
        },
        "reject" => {
            let mut words = rest.splitn(2, ' ');
            let prefix = words.next().unwrap_or("");
            let reason = words.next();
            match find_pending(engine, prefix) {
                Some(id) => println!("rejected: {}", engine.reject(id, reason)),
                None => println!("no queued action matches '{}'", prefix),
            }
        }
        "rule" => match rules.add_text(rest) {
            Ok(rule) => println!("rule {} added ({})", rule.id, rule.trigger),
            Err(e) => println!("rule rejected: {}", e),
        },
        "rules" => {
            for rule in rules.list() {
                let state = if rule.enabled { "on" } else { "off" };
                println!("{} [{}] {} (runs: {})", rule.id, state, rule.text, rule.run_count);
            }
        }
        "away" => {
            let reason = if rest.is_empty() { None } else { Some(rest.to_string()) };
            println!("away session opened: {}", engine.begin_away(reason));
        }
        "back" => match engine.end_away() {
            Some(summary) => println!(
                "welcome back: {} actions, {} ok, {} failed, {} waiting",
                summary.total_actions,
                summary.successful_actions,
                summary.failed_actions,
                summary.pending_approvals
            ),
            None => println!("no away session was open"),
        },
        "suggest" => {
            engine.generate_suggestion(rest, "suggested from the console");
        }
        "audit" => {
            let count = rest.parse().unwrap_or(10);
            for entry in engine.recent_audit(count) {
                let ok = if entry.success { "ok" } else { "--" };
                println!("[{}] {} {} ({})", ok, entry.action_type, entry.outcome, entry.autonomy);
            }
        }
        "enable" => engine.set_enabled(true),
        "disable" => engine.set_enabled(false),
        "expire" => println!("expired {} pending action(s)", engine.expire_pending()),
        "quit" | "exit" => return false,
        other => println!("unknown command '{}'; try 'help'", other),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Halcyon v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = config_path(&args);
    let config = HalcyonConfig::load_or_default(&config_file);

    // Storage.
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| resolve_data_dir(&config.general.data_dir));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let store = AutopilotStore::new(&data_dir);
    let autopilot_config = store.load_config();

    // Composition root: explicit construction, wired by reference.
    let policy = Arc::new(PolicyTable::new());
    let consent = Arc::new(ConsentGate::new(
        Arc::clone(&policy),
        Duration::from_secs(autopilot_config.consent_cache_seconds),
    ));
    let rules = Arc::new(RuleBook::new(Arc::new(KeywordRuleParser::new())));
    rules.replace_all(store.load_rules());
    let workflows = Arc::new(WorkflowBook::new());
    workflows.replace_all(store.load_workflows());

    let engine = Arc::new(AutopilotEngine::new(
        autopilot_config,
        Arc::clone(&policy),
        Arc::clone(&rules),
        consent,
        Arc::clone(&workflows),
        Arc::new(StagingExecutor),
    ));
    engine.audit_log().restore(store.load_audit());
    tracing::info!(data_dir = %data_dir.display(), "Autopilot engine ready");

    // Event printer.
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
        }
    });

    // Operator console.
    println!("halcyon autopilot console; 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        // trust/untrust need the policy handle, not the engine.
        let trimmed = line.trim();
        if let Some(name) = trimmed.strip_prefix("trust ") {
            policy.trust(name.trim());
            println!("trusted: {}", name.trim());
            continue;
        }
        if let Some(name) = trimmed.strip_prefix("untrust ") {
            policy.untrust(name.trim());
            println!("untrusted: {}", name.trim());
            continue;
        }
        if !handle_line(&engine, &rules, &line).await {
            break;
        }
    }

    // Shutdown: close any open away session and persist state.
    engine.shutdown();
    if let Err(e) = store.save_config(&engine.config_snapshot()) {
        tracing::warn!(error = %e, "Failed to save autopilot config");
    }
    if let Err(e) = store.save_rules(&rules.list()) {
        tracing::warn!(error = %e, "Failed to save rules");
    }
    if let Err(e) = store.save_workflows(&workflows.list()) {
        tracing::warn!(error = %e, "Failed to save workflows");
    }
    if let Err(e) = store.save_audit(&engine.audit_log().snapshot()) {
        tracing::warn!(error = %e, "Failed to save audit log");
    }
    tracing::info!("Halcyon stopped");
    Ok(())
}
