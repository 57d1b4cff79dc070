//! `medtrain result` command implementation

use crate::admin;
use crate::audit::{execute_with_audit, AuditEvent, EventType};
use crate::commands::{note, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::results;
use crate::ResultCommand;
use colored::Colorize;
use medtrain_common::types::TestResult;
use serde_json::json;

pub async fn run(config: Config, command: &ResultCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        ResultCommand::List { user, device } => {
            let (_, viewer) = ctx.current_user()?;

            let owner = match user {
                Some(reference) if viewer.is_admin() => {
                    Some(admin::resolve_user_ref(&ctx.store, reference)?.id)
                }
                Some(_) => {
                    ctx.require_admin("result list --user")?;
                    None
                }
                None if viewer.is_admin() => None,
                None => Some(viewer.id.clone()),
            };

            let mut listed: Vec<TestResult> = match (&owner, device) {
                (Some(owner), _) => results::results_for_user(&ctx.store, owner)?,
                (None, Some(device)) => results::results_for_device(&ctx.store, device)?,
                (None, None) => {
                    let mut all = ctx.store.test_results()?;
                    all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                    all
                }
            };
            if let Some(device) = device {
                listed.retain(|result| &result.device_id == device);
            }

            if listed.is_empty() {
                note("No test results");
                return Ok(());
            }

            let mut output = table(&["Date", "User", "Device", "Score", "Result", "Locked", "Id"]);
            for result in &listed {
                output.add_row(vec![
                    result.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    result.username.clone(),
                    result.device_title.clone(),
                    format!("{:.1}%", result.score),
                    if result.passed { "passed" } else { "failed" }.to_string(),
                    if result.is_locked { "yes" } else { "no" }.to_string(),
                    result.id.clone(),
                ]);
            }
            println!("{output}");
        }

        ResultCommand::Unlock { id } => {
            let actor = ctx.require_admin("result unlock")?;
            let event = AuditEvent::new(
                EventType::ResultUnlock,
                Some(actor.username.clone()),
                Some(id.clone()),
                json!({}),
            );

            let store = &ctx.store;
            let result_id = id.as_str();
            let unlocked = execute_with_audit(&ctx.audit, event, || async move {
                results::unlock(store, result_id)
            })
            .await?;

            success(format!(
                "Unlocked {}'s result for '{}' ({})",
                unlocked.username,
                unlocked.device_title,
                unlocked.id.dimmed()
            ));
        }
    }

    Ok(())
}
