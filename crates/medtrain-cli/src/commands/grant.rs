//! `medtrain grant` command implementation

use crate::admin::{self, GrantRequest};
use crate::audit::EventType;
use crate::commands::{note, parse_date_arg, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::GrantCommand;
use colored::Colorize;
use serde_json::json;

pub async fn run(config: Config, command: &GrantCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        GrantCommand::Set {
            user,
            training,
            devices,
            all_devices,
            from,
            until,
        } => {
            let actor = ctx.require_admin("grant set")?;
            let target = admin::resolve_user_ref(&ctx.store, user)?;

            let device_ids = if *all_devices {
                ctx.store
                    .find_training(training)?
                    .ok_or_else(|| CliError::TrainingNotFound(training.clone()))?
                    .device_types
                    .into_iter()
                    .map(|device| device.id)
                    .collect()
            } else {
                devices.clone()
            };

            let request = GrantRequest {
                training_id: training.clone(),
                valid_from: parse_date_arg(from.as_deref())?,
                valid_until: parse_date_arg(until.as_deref())?,
                device_ids,
            };
            let grant = admin::set_grant(&ctx.store, &target.id, request, ctx.today())?;

            ctx.record(
                EventType::GrantSet,
                Some(&actor.username),
                Some(&target.id),
                json!({
                    "trainingId": grant.training_id,
                    "validFrom": grant.valid_from,
                    "validUntil": grant.valid_until,
                    "deviceTypes": grant.device_types,
                }),
            )
            .await?;

            success(format!(
                "Granted '{}' {} device(s) of training {}",
                target.username,
                grant.device_types.len(),
                grant.training_id.dimmed()
            ));
            if let (Some(from), Some(until)) = (grant.valid_from, grant.valid_until) {
                note(format!("Valid from {from} until {until} (inclusive)"));
            }
            if grant.device_types.is_empty() {
                note("The grant names no devices and opens nothing");
            }
        }

        GrantCommand::Revoke { user, training } => {
            let actor = ctx.require_admin("grant revoke")?;
            let target = admin::resolve_user_ref(&ctx.store, user)?;

            if admin::revoke_grant(&ctx.store, &target.id, training)? {
                ctx.record(
                    EventType::GrantRevoke,
                    Some(&actor.username),
                    Some(&target.id),
                    json!({"trainingId": training}),
                )
                .await?;
                success(format!("Revoked access of '{}' to training {}", target.username, training));
            } else {
                note(format!("'{}' had no grant for training {}", target.username, training));
            }
        }

        GrantCommand::List { user } => {
            ctx.require_admin("grant list")?;
            let target = admin::resolve_user_ref(&ctx.store, user)?;
            let trainings = ctx.store.trainings()?;
            let today = ctx.today();

            if target.permissions.trainings.is_empty() {
                note(format!("'{}' has no grants", target.username));
                return Ok(());
            }

            let mut output = table(&["Training", "Devices", "From", "Until", "Active"]);
            for grant in &target.permissions.trainings {
                let training = trainings.iter().find(|t| t.id == grant.training_id);
                let title = training
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| format!("{} (deleted)", grant.training_id));
                let devices: Vec<String> = grant
                    .device_types
                    .iter()
                    .map(|id| {
                        training
                            .and_then(|t| t.device(id))
                            .map(|device| device.title.clone())
                            .unwrap_or_else(|| id.clone())
                    })
                    .collect();
                let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());

                output.add_row(vec![
                    title,
                    devices.join(", "),
                    date(grant.valid_from),
                    date(grant.valid_until),
                    if grant.covers(today) { "yes" } else { "no" }.to_string(),
                ]);
            }
            println!("{output}");
        }
    }

    Ok(())
}
