//! `medtrain login`, `logout` and `whoami`

use crate::auth::{Authenticator, StoreAuthenticator};
use crate::audit::EventType;
use crate::commands::{note, password_or_prompt, success, text_or_prompt};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use colored::Colorize;
use serde_json::json;

pub async fn login(config: Config, username: Option<String>, password: Option<String>) -> Result<()> {
    let ctx = AppContext::open(config)?;

    let username = text_or_prompt(username.as_deref(), "Username:")?;
    let password = password_or_prompt(password.as_deref(), "Password:", false)?;

    match StoreAuthenticator::new(&ctx.store).authenticate(&username, &password) {
        Ok(session) => {
            ctx.sessions.save(&session)?;
            ctx.record(
                EventType::Login,
                Some(&session.username),
                Some(&session.user_id),
                json!({"role": session.role.as_str()}),
            )
            .await?;
            success(format!("Logged in as {} ({})", session.username.bold(), session.role));
            Ok(())
        }
        Err(CliError::InvalidCredentials) => {
            ctx.record(EventType::LoginFailure, Some(username.trim()), None, json!({}))
                .await?;
            Err(CliError::InvalidCredentials)
        }
        Err(e) => Err(e),
    }
}

pub async fn logout(config: Config) -> Result<()> {
    let ctx = AppContext::open(config)?;
    let session = ctx.sessions.load()?;

    if ctx.sessions.clear()? {
        if let Some(session) = session {
            ctx.record(
                EventType::Logout,
                Some(&session.username),
                Some(&session.user_id),
                json!({}),
            )
            .await?;
        }
        success("Logged out");
    } else {
        note("No active session");
    }
    Ok(())
}

pub async fn whoami(config: Config) -> Result<()> {
    let ctx = AppContext::open(config)?;
    let (session, user) = ctx.current_user()?;

    println!("{:<12} {}", "Username:".cyan(), user.username.bold());
    println!("{:<12} {}", "Role:".cyan(), user.role);
    println!("{:<12} {}", "User id:".cyan(), user.id);
    println!(
        "{:<12} {}",
        "Since:".cyan(),
        session.issued_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::{AuditLogger, EventFilter};
    use crate::commands::init;
    use tempfile::TempDir;

    async fn initialized() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path());
        init::run(config.clone(), "admin".to_string(), Some("pw".to_string()), false)
            .await
            .unwrap();
        (dir, config)
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let (_dir, config) = initialized().await;

        login(config.clone(), Some("admin".into()), Some("pw".into())).await.unwrap();
        whoami(config.clone()).await.unwrap();
        logout(config.clone()).await.unwrap();

        assert!(matches!(whoami(config.clone()).await, Err(CliError::NotLoggedIn)));

        let ctx = AppContext::open(config).unwrap();
        let types: Vec<EventType> = ctx
            .audit
            .list_events(&EventFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.event_type)
            .collect();
        assert_eq!(types, vec![EventType::Init, EventType::Login, EventType::Logout]);
    }

    #[tokio::test]
    async fn test_failed_login_is_generic_and_audited() {
        let (_dir, config) = initialized().await;

        let wrong_password = login(config.clone(), Some("admin".into()), Some("nope".into())).await;
        let unknown_user = login(config.clone(), Some("ghost".into()), Some("pw".into())).await;
        assert_eq!(
            wrong_password.unwrap_err().to_string(),
            unknown_user.unwrap_err().to_string()
        );

        let ctx = AppContext::open(config).unwrap();
        let failures = ctx
            .audit
            .list_events(&EventFilter {
                event_type: Some(EventType::LoginFailure),
                ..EventFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(failures.len(), 2);
        assert!(ctx.sessions.load().unwrap().is_none());
    }
}
