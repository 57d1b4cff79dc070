//! `medtrain quiz` command implementation

use crate::audit::EventType;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::quiz::{self, Advance, QuizEngine, QuizOutcome};
use crate::store::KeyValueStore;
use crate::QuizCommand;
use colored::Colorize;
use inquire::{MultiSelect, Select};
use medtrain_common::types::{Question, QuestionType};
use serde_json::json;
use std::collections::BTreeSet;

pub async fn run(config: Config, command: &QuizCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        QuizCommand::Take { device, answers } => {
            let (session, user) = ctx.current_user()?;
            let (training, found) = ctx
                .store
                .find_device(device)?
                .ok_or_else(|| CliError::DeviceNotFound(device.clone()))?;
            quiz::ensure_eligible(&user, &training, &found, &ctx.store.test_results()?, ctx.today())?;

            let scripted = answers
                .as_deref()
                .map(|raw| parse_answers(raw, found.questions.len()))
                .transpose()?;

            println!(
                "{} {} ({} questions, pass mark {}%)",
                "Test:".bold(),
                found.title,
                found.questions.len(),
                found.passing_percentage
            );

            let mut engine = QuizEngine::start(&ctx.store, found, &session);
            let outcome = match scripted {
                Some(groups) => run_scripted(&mut engine, &groups)?,
                None => run_interactive(&mut engine)?,
            };

            print_outcome(&engine, &outcome);

            ctx.record(
                EventType::TestComplete,
                Some(&user.username),
                Some(&outcome.result.id),
                json!({
                    "deviceId": outcome.result.device_id,
                    "score": outcome.score(),
                    "passed": outcome.passed(),
                    "correct": outcome.correct,
                    "total": outcome.total,
                }),
            )
            .await?;
        }
    }

    Ok(())
}

/// Parse `"1;0,2"` into one option set per question
pub fn parse_answers(raw: &str, question_count: usize) -> Result<Vec<BTreeSet<usize>>> {
    let groups: Vec<BTreeSet<usize>> = raw
        .split(';')
        .enumerate()
        .map(|(position, group)| {
            group
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<usize>().map_err(|_| {
                        CliError::validation(format!(
                            "answer '{part}' for question {} is not an option number",
                            position + 1
                        ))
                    })
                })
                .collect()
        })
        .collect::<Result<_>>()?;

    if groups.len() != question_count {
        return Err(CliError::validation(format!(
            "{} answer group(s) given but the test has {question_count} question(s)",
            groups.len()
        )));
    }
    Ok(groups)
}

fn run_scripted<S: KeyValueStore>(
    engine: &mut QuizEngine<'_, S>,
    groups: &[BTreeSet<usize>],
) -> Result<QuizOutcome> {
    for (position, group) in groups.iter().enumerate() {
        let question_id = engine
            .current_question()
            .map(|question| question.id.clone())
            .ok_or_else(|| CliError::validation("the test ended early"))?;
        for option in group {
            engine.select_answer(&question_id, *option);
        }

        match engine.advance()? {
            Advance::Blocked => {
                return Err(CliError::validation(format!(
                    "question {} needs at least one valid option",
                    position + 1
                )))
            }
            Advance::Next(_) => {}
            Advance::Completed(outcome) => return Ok(outcome),
        }
    }
    Err(CliError::validation("the test did not complete"))
}

fn run_interactive<S: KeyValueStore>(engine: &mut QuizEngine<'_, S>) -> Result<QuizOutcome> {
    let total = engine.question_count();
    loop {
        let Some(question) = engine.current_question().cloned() else {
            return Err(CliError::validation("the test has no current question"));
        };
        let position = engine.current_index().unwrap_or(0) + 1;
        let prompt = format!("[{position}/{total}] {}", question.text);

        for option in prompt_options(&question, &prompt)? {
            engine.select_answer(&question.id, option);
        }

        match engine.advance()? {
            Advance::Blocked => println!("{} Select at least one answer", "!".yellow()),
            Advance::Next(_) => {}
            Advance::Completed(outcome) => return Ok(outcome),
        }
    }
}

fn prompt_options(question: &Question, prompt: &str) -> Result<Vec<usize>> {
    let options = question.options.clone();
    match question.question_type {
        QuestionType::Single => {
            let picked = Select::new(prompt, options).raw_prompt()?;
            Ok(vec![picked.index])
        }
        QuestionType::Multiple => {
            let picked = MultiSelect::new(prompt, options)
                .with_help_message("space to toggle, enter to confirm")
                .raw_prompt()?;
            Ok(picked.into_iter().map(|option| option.index).collect())
        }
    }
}

fn print_outcome<S: KeyValueStore>(engine: &QuizEngine<'_, S>, outcome: &QuizOutcome) {
    println!();
    let verdict = if outcome.passed() {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "{verdict} {:.1}% ({}/{} correct, pass mark {}%)",
        outcome.score(),
        outcome.correct,
        outcome.total,
        engine.device().passing_percentage
    );

    if let Some(review) = engine.per_question_review() {
        for (index, item) in review.iter().enumerate() {
            let mark = if item.is_correct { "✓".green() } else { "✗".red() };
            println!("  {mark} {}. {}", index + 1, item.text);
        }
    }

    if outcome.passed() {
        println!(
            "{} Run 'medtrain certificate issue {}' to get your certificate",
            "→".cyan(),
            outcome.result.device_id
        );
    }
    println!(
        "{} The test is now locked. An administrator can unlock it for a retake.",
        "→".cyan()
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answers_groups() {
        let groups = parse_answers("1;0,2", 2).unwrap();
        assert_eq!(groups[0], BTreeSet::from([1]));
        assert_eq!(groups[1], BTreeSet::from([0, 2]));
    }

    #[test]
    fn test_parse_answers_deduplicates() {
        let groups = parse_answers("2,2 , 0", 1).unwrap();
        assert_eq!(groups[0], BTreeSet::from([0, 2]));
    }

    #[test]
    fn test_parse_answers_count_mismatch() {
        assert!(matches!(parse_answers("1", 2), Err(CliError::Validation(_))));
    }

    #[test]
    fn test_parse_answers_rejects_garbage() {
        let err = parse_answers("a;1", 2).unwrap_err();
        assert!(err.to_string().contains("question 1"));
    }

    #[test]
    fn test_parse_answers_empty_group_is_kept() {
        let groups = parse_answers("0;", 2).unwrap();
        assert!(groups[1].is_empty());
    }
}
