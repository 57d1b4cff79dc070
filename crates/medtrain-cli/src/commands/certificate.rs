//! `medtrain certificate` command implementation

use crate::admin;
use crate::audit::EventType;
use crate::certificate::{self, CertificateRequest, CertificateTemplate};
use crate::commands::{note, success};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::progress::create_spinner;
use crate::{CertificateCommand, TemplateCommand};
use chrono::Local;
use colored::Colorize;
use medtrain_common::types::TestResult;
use serde_json::json;

pub async fn run(config: Config, command: &CertificateCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        CertificateCommand::Issue { device, output, user } => {
            let (_, viewer) = ctx.current_user()?;
            let holder = match user {
                Some(reference) => {
                    let target = admin::resolve_user_ref(&ctx.store, reference)?;
                    if target.id != viewer.id {
                        ctx.require_admin("certificate issue --user")?;
                    }
                    target
                }
                None => viewer.clone(),
            };

            let (training, found) = ctx
                .store
                .find_device(device)?
                .ok_or_else(|| CliError::DeviceNotFound(device.clone()))?;
            let results = ctx.store.test_results()?;
            let passed = latest_passed(&results, &holder.id, &found.id)
                .ok_or_else(|| CliError::NotPassed(found.title.clone()))?;

            let template = CertificateTemplate::load(&ctx.config.template_path())?;
            let request = CertificateRequest {
                username: holder.username.clone(),
                device_title: found.title.clone(),
                training_title: training.title.clone(),
                score: passed.score,
                date: passed.timestamp.with_timezone(&Local).date_naive(),
                issuer: ctx.config.issuer.clone(),
                template,
            };

            let spinner = create_spinner("Rendering certificate...");
            let rendered = certificate::render_async(request).await;
            spinner.finish_and_clear();
            let rendered = rendered?;

            let path = certificate::write_atomically(output, &rendered)?;
            ctx.record(
                EventType::CertificateIssue,
                Some(&viewer.username),
                Some(&passed.id),
                json!({
                    "userId": holder.id,
                    "deviceId": found.id,
                    "score": passed.score,
                    "fileName": rendered.file_name,
                }),
            )
            .await?;
            success(format!("Certificate written to {}", path.display()));
        }

        CertificateCommand::Template { command } => template(&ctx, command).await?,
    }

    Ok(())
}

async fn template(ctx: &AppContext, command: &TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::Import { file } => {
            let actor = ctx.require_admin("certificate template import")?;
            let template = CertificateTemplate::load(file)?
                .ok_or_else(|| CliError::validation(format!("'{}' does not exist", file.display())))?;
            let target = ctx.config.stored_template_path();
            template.save(&target)?;

            ctx.record(
                EventType::ConfigChange,
                Some(&actor.username),
                Some("certificate_template"),
                json!({"action": "import", "source": file.display().to_string()}),
            )
            .await?;
            success(format!("Template '{}' stored", template.title));
            if ctx.config.template.is_some() {
                note("A template path is configured and takes precedence over the stored template");
            }
        }

        TemplateCommand::Show => {
            ctx.require_admin("certificate template show")?;
            let path = ctx.config.template_path();
            match CertificateTemplate::load(&path)? {
                Some(template) => {
                    println!("{} {}", "Template:".cyan(), path.display());
                    println!("{}", serde_json::to_string_pretty(&template)?);
                }
                None => note("No custom template; certificates use the standard design"),
            }
        }

        TemplateCommand::Reset => {
            let actor = ctx.require_admin("certificate template reset")?;
            let path = ctx.config.stored_template_path();
            if !path.exists() {
                note("No stored template to remove");
                return Ok(());
            }
            tokio::fs::remove_file(&path).await?;

            ctx.record(
                EventType::ConfigChange,
                Some(&actor.username),
                Some("certificate_template"),
                json!({"action": "reset"}),
            )
            .await?;
            success("Stored template removed; certificates use the standard design");
        }
    }

    Ok(())
}

/// Newest passed attempt of a user for a device
fn latest_passed<'a>(results: &'a [TestResult], user_id: &str, device_id: &str) -> Option<&'a TestResult> {
    results
        .iter()
        .filter(|result| result.belongs_to(user_id, device_id) && result.passed)
        .max_by_key(|result| result.timestamp)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn result(id: &str, passed: bool, age_days: i64) -> TestResult {
        TestResult {
            id: id.to_string(),
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            device_id: "d1".to_string(),
            device_title: "Pump".to_string(),
            score: if passed { 90.0 } else { 10.0 },
            passed,
            timestamp: Utc::now() - Duration::days(age_days),
            is_locked: true,
        }
    }

    #[test]
    fn test_latest_passed_skips_failures() {
        let results = vec![result("old", true, 5), result("new", false, 1)];
        assert_eq!(latest_passed(&results, "u1", "d1").unwrap().id, "old");
    }

    #[test]
    fn test_latest_passed_prefers_newest() {
        let results = vec![result("a", true, 5), result("b", true, 2), result("c", false, 1)];
        assert_eq!(latest_passed(&results, "u1", "d1").unwrap().id, "b");
    }

    #[test]
    fn test_latest_passed_none() {
        let results = vec![result("a", false, 1)];
        assert!(latest_passed(&results, "u1", "d1").is_none());
        assert!(latest_passed(&results, "u2", "d1").is_none());
    }
}
