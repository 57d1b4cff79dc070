//! `medtrain training` command implementation

use crate::access;
use crate::admin::{self, CatalogEntry};
use crate::audit::EventType;
use crate::commands::{note, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::TrainingCommand;
use colored::Colorize;
use serde_json::json;

pub async fn run(config: Config, command: &TrainingCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        TrainingCommand::Create {
            title,
            description,
            image_url,
            image_scale,
        } => {
            let actor = ctx.require_admin("training create")?;
            let training = admin::create_training(
                &ctx.store,
                CatalogEntry {
                    title: title.clone(),
                    description: description.clone(),
                    image_url: image_url.clone(),
                    image_scale: *image_scale,
                },
            )?;
            ctx.record(
                EventType::TrainingCreate,
                Some(&actor.username),
                Some(&training.id),
                json!({"title": training.title}),
            )
            .await?;
            success(format!("Created training '{}' ({})", training.title, training.id.dimmed()));
        }

        TrainingCommand::Delete { id } => {
            let actor = ctx.require_admin("training delete")?;
            let removed = admin::delete_training(&ctx.store, id)?;
            ctx.record(
                EventType::TrainingDelete,
                Some(&actor.username),
                Some(&removed.id),
                json!({"title": removed.title, "devices": removed.device_types.len()}),
            )
            .await?;
            success(format!(
                "Deleted training '{}' with {} device(s)",
                removed.title,
                removed.device_types.len()
            ));
        }

        TrainingCommand::List => {
            let (_, user) = ctx.current_user()?;
            let trainings = access::visible_trainings(&user, &ctx.store.trainings()?, ctx.today());

            if trainings.is_empty() {
                note("No trainings available");
                return Ok(());
            }

            let mut output = table(&["Title", "Devices", "Description", "Id"]);
            for training in &trainings {
                output.add_row(vec![
                    training.title.clone(),
                    training.device_types.len().to_string(),
                    training.description.clone(),
                    training.id.clone(),
                ]);
            }
            println!("{output}");
        }
    }

    Ok(())
}
