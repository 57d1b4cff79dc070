//! `medtrain question` command implementation

use crate::admin;
use crate::audit::EventType;
use crate::commands::{note, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::{QuestionCommand, QuestionTypeArg};
use colored::Colorize;
use medtrain_common::types::QuestionType;
use serde_json::json;

impl From<QuestionTypeArg> for QuestionType {
    fn from(kind: QuestionTypeArg) -> Self {
        match kind {
            QuestionTypeArg::Single => QuestionType::Single,
            QuestionTypeArg::Multiple => QuestionType::Multiple,
        }
    }
}

pub async fn run(config: Config, command: &QuestionCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        QuestionCommand::Add {
            device,
            text,
            question_type,
            options,
            correct,
        } => {
            let actor = ctx.require_admin("question add")?;
            let question = admin::add_question(
                &ctx.store,
                device,
                text,
                (*question_type).into(),
                options.clone(),
                correct.clone(),
            )?;
            ctx.record(
                EventType::QuestionCreate,
                Some(&actor.username),
                Some(&question.id),
                json!({"deviceId": device, "type": question.question_type.to_string()}),
            )
            .await?;
            success(format!(
                "Added {} question with {} options ({})",
                question.question_type,
                question.options.len(),
                question.id.dimmed()
            ));
        }

        QuestionCommand::Delete { device, question } => {
            let actor = ctx.require_admin("question delete")?;
            let removed = admin::delete_question(&ctx.store, device, question)?;
            ctx.record(
                EventType::QuestionDelete,
                Some(&actor.username),
                Some(&removed.id),
                json!({"deviceId": device}),
            )
            .await?;
            success(format!("Deleted question '{}'", removed.text));
        }

        QuestionCommand::List { device } => {
            ctx.require_admin("question list")?;
            let (_, device) = ctx
                .store
                .find_device(device)?
                .ok_or_else(|| CliError::DeviceNotFound(device.clone()))?;

            if device.questions.is_empty() {
                note(format!("'{}' has no questions", device.title));
                return Ok(());
            }

            let mut output = table(&["#", "Question", "Type", "Options", "Id"]);
            for (index, question) in device.questions.iter().enumerate() {
                let options: Vec<String> = question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(i, option)| {
                        let marker = if question.correct_answers.contains(&i) { "*" } else { " " };
                        format!("{marker}{i}: {option}")
                    })
                    .collect();
                output.add_row(vec![
                    (index + 1).to_string(),
                    question.text.clone(),
                    question.question_type.to_string(),
                    options.join("\n"),
                    question.id.clone(),
                ]);
            }
            println!("{output}");
            note("Correct options are marked with *");
        }
    }

    Ok(())
}
