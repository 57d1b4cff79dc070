//! `medtrain device` command implementation

use crate::access;
use crate::admin::{self, CatalogEntry};
use crate::audit::EventType;
use crate::commands::{note, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::DeviceCommand;
use colored::Colorize;
use serde_json::json;

pub async fn run(config: Config, command: &DeviceCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        DeviceCommand::Add {
            training,
            title,
            description,
            image_url,
            image_scale,
            passing,
        } => {
            let actor = ctx.require_admin("device add")?;
            let device = admin::add_device(
                &ctx.store,
                training,
                CatalogEntry {
                    title: title.clone(),
                    description: description.clone(),
                    image_url: image_url.clone(),
                    image_scale: *image_scale,
                },
                *passing,
            )?;
            ctx.record(
                EventType::DeviceCreate,
                Some(&actor.username),
                Some(&device.id),
                json!({
                    "trainingId": device.training_id,
                    "title": device.title,
                    "passingPercentage": device.passing_percentage,
                }),
            )
            .await?;
            success(format!("Added device '{}' ({})", device.title, device.id.dimmed()));
        }

        DeviceCommand::Delete { id } => {
            let actor = ctx.require_admin("device delete")?;
            let removed = admin::delete_device(&ctx.store, id)?;
            ctx.record(
                EventType::DeviceDelete,
                Some(&actor.username),
                Some(&removed.id),
                json!({"trainingId": removed.training_id, "title": removed.title}),
            )
            .await?;
            success(format!("Deleted device '{}'", removed.title));
        }

        DeviceCommand::List { training } => {
            let (_, user) = ctx.current_user()?;
            let results = ctx.store.test_results()?;
            let trainings = access::visible_trainings(&user, &ctx.store.trainings()?, ctx.today());

            let mut output = table(&["Training", "Device", "Questions", "Pass %", "Test", "Id"]);
            let mut rows = 0;
            for t in trainings
                .iter()
                .filter(|t| training.as_ref().map_or(true, |id| &t.id == id))
            {
                for device in &t.device_types {
                    let status = if !device.has_quiz() {
                        "no quiz".to_string()
                    } else if access::can_take_test(device, &results, &user.id) {
                        "open".to_string()
                    } else {
                        "locked".to_string()
                    };
                    output.add_row(vec![
                        t.title.clone(),
                        device.title.clone(),
                        device.questions.len().to_string(),
                        device.passing_percentage.to_string(),
                        status,
                        device.id.clone(),
                    ]);
                    rows += 1;
                }
            }

            if rows == 0 {
                note("No devices available");
            } else {
                println!("{output}");
            }
        }

        DeviceCommand::Show { id } => {
            let (_, user) = ctx.current_user()?;
            let (training, device) = ctx
                .store
                .find_device(id)?
                .ok_or_else(|| CliError::DeviceNotFound(id.clone()))?;
            if !access::is_device_visible(&user, &training, &device, ctx.today()) {
                return Err(CliError::NotAuthorized(device.title));
            }

            let results = ctx.store.test_results()?;
            println!("{}", device.title.bold());
            println!("{:<14} {}", "Training:".cyan(), training.title);
            println!("{:<14} {}", "Description:".cyan(), device.description);
            println!("{:<14} {}", "Questions:".cyan(), device.questions.len());
            println!("{:<14} {}%", "Pass mark:".cyan(), device.passing_percentage);
            match &device.documentation {
                Some(document) => println!(
                    "{:<14} {} (version {})",
                    "Manual:".cyan(),
                    document.file_name,
                    document.version
                ),
                None => println!("{:<14} -", "Manual:".cyan()),
            }

            match access::latest_result(&results, &user.id, &device.id) {
                Some(latest) => println!(
                    "{:<14} {:.1}% {} on {}{}",
                    "Last test:".cyan(),
                    latest.score,
                    if latest.passed { "passed".green() } else { "failed".red() },
                    latest.timestamp.format("%Y-%m-%d"),
                    if latest.is_locked { " (locked)" } else { "" }
                ),
                None => println!("{:<14} -", "Last test:".cyan()),
            }
            if device.has_quiz() && access::can_take_test(&device, &results, &user.id) {
                note(format!("Run 'medtrain quiz take {}' to start the test", device.id));
            }
        }
    }

    Ok(())
}
