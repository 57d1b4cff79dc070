//! `medtrain init` command implementation
//!
//! Creates the data directory, the database and the first administrator.

use crate::admin;
use crate::audit::{execute_with_audit, AuditEvent, EventType};
use crate::commands::{note, password_or_prompt, success};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use medtrain_common::types::Role;
use serde_json::json;

/// Initialize a data directory
pub async fn run(
    config: Config,
    admin_username: String,
    admin_password: Option<String>,
    force: bool,
) -> Result<()> {
    if config.is_initialized() && !force {
        return Err(CliError::AlreadyInitialized(
            config.data_dir().display().to_string(),
        ));
    }

    let ctx = AppContext::open_unchecked(config)?;
    let has_admin = ctx.store.users()?.iter().any(|user| user.is_admin());

    let event = AuditEvent::new(
        EventType::Init,
        Some(admin_username.clone()),
        None,
        json!({
            "dataDir": ctx.config.data_dir().display().to_string(),
            "force": force,
            "adminCreated": !has_admin,
        }),
    );

    let store = &ctx.store;
    let username = admin_username.as_str();
    let blobs_dir = ctx.config.blobs_dir();
    execute_with_audit(&ctx.audit, event, || async move {
        if !has_admin {
            let password = password_or_prompt(
                admin_password.as_deref(),
                &format!("Password for administrator '{username}':"),
                true,
            )?;
            admin::create_user(store, username, &password, Role::Admin)?;
        }
        std::fs::create_dir_all(blobs_dir)?;
        Ok(())
    })
    .await?;

    success(format!(
        "Initialized MedTrain data directory: {}",
        ctx.config.data_dir().display()
    ));
    if has_admin {
        note("Existing administrator accounts were kept");
    } else {
        note(format!("Created administrator '{admin_username}'"));
    }
    note("The audit trail is stored in medtrain.db and can be checked with 'medtrain audit verify'");

    Ok(())
}
