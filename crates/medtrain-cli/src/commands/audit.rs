//! `medtrain audit` command implementation
//!
//! Shows, verifies and exports the hash-chained audit trail.

use crate::audit::{AuditEvent, AuditLogger, EventFilter, EventType};
use crate::commands::{note, success};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::AuditCommand;
use colored::Colorize;
use std::path::Path;

/// Execute audit command
pub async fn run(config: Config, command: &AuditCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        AuditCommand::List {
            limit,
            event_type,
            actor,
        } => {
            ctx.require_admin("audit list")?;
            let filter = EventFilter {
                event_type: event_type.as_deref().map(str::parse::<EventType>).transpose()?,
                actor: actor.clone(),
                limit: Some(*limit),
            };
            list(&ctx.audit, &filter).await
        }
        AuditCommand::Verify => verify(&ctx.audit).await,
        AuditCommand::Export { output } => {
            ctx.require_admin("audit export")?;
            export(&ctx.audit, output).await
        }
    }
}

/// List audit events
async fn list(audit: &dyn AuditLogger, filter: &EventFilter) -> Result<()> {
    let events = audit.list_events(filter).await?;

    if events.is_empty() {
        note("No audit events found");
        return Ok(());
    }

    note(format!("Showing {} most recent events:", events.len()));
    println!();

    for event in &events {
        print_event(event);
        println!();
    }

    Ok(())
}

fn print_event(event: &AuditEvent) {
    let id = event.id.map(|id| format!("#{id}")).unwrap_or_default();
    println!(
        "{} {} {}",
        id.bright_black(),
        event.event_type.as_str().bold(),
        event.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
    );

    if let Some(ref actor) = event.actor {
        println!("  {} {}", "Actor:".cyan(), actor);
    }
    if let Some(ref subject) = event.subject {
        println!("  {} {}", "Subject:".cyan(), subject);
    }

    if let Some(fields) = event.details.as_object() {
        for (key, value) in fields {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if value.len() < 100 {
                let shown = if key == "status" && value == "failure" {
                    value.red().to_string()
                } else {
                    value
                };
                println!("  {} {}", format!("{key}:").dimmed(), shown);
            }
        }
    }
}

/// Verify audit trail integrity
async fn verify(audit: &dyn AuditLogger) -> Result<()> {
    note("Verifying audit trail integrity...");

    let report = audit.verify_integrity().await?;

    match report.broken_at {
        None => {
            println!("{} Audit trail verified successfully", "✓".green().bold());
            println!("  {} {} event(s) checked", "→".cyan(), report.events_checked);
            println!("  {} Hash chain is intact", "→".cyan());
            Ok(())
        }
        Some(id) => {
            println!("{} Audit trail verification FAILED", "✗".red().bold());
            println!("  {} Hash chain is broken at event #{id}", "→".yellow());
            println!("  {} Possible tampering or data corruption", "→".yellow());
            Err(CliError::audit(format!("hash chain broken at event #{id}")))
        }
    }
}

/// Write every event as a JSON array
async fn export(audit: &dyn AuditLogger, output: &Path) -> Result<()> {
    let events = audit.list_events(&EventFilter::default()).await?;
    let report = audit.verify_integrity().await?;

    let document = serde_json::json!({
        "machineId": audit.machine_id(),
        "exportedAt": chrono::Utc::now(),
        "chainIntact": report.is_valid(),
        "events": events,
    });

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, serde_json::to_vec_pretty(&document)?).await?;

    success(format!("Exported {} event(s) to {}", events.len(), output.display()));
    if !report.is_valid() {
        println!("  {} The hash chain is broken; see 'medtrain audit verify'", "→".yellow());
    }

    Ok(())
}
