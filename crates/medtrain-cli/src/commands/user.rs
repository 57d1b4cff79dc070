//! `medtrain user` command implementation

use crate::admin;
use crate::audit::EventType;
use crate::commands::{password_or_prompt, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::{RoleArg, UserCommand};
use colored::Colorize;
use medtrain_common::types::Role;
use serde_json::json;

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Trainee => Role::Trainee,
        }
    }
}

pub async fn run(config: Config, command: &UserCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        UserCommand::Create { username, password, role } => {
            let actor = ctx.require_admin("user create")?;
            let password = password_or_prompt(
                password.as_deref(),
                &format!("Password for '{username}':"),
                true,
            )?;
            let user = admin::create_user(&ctx.store, username, &password, (*role).into())?;
            ctx.record(
                EventType::UserCreate,
                Some(&actor.username),
                Some(&user.id),
                json!({"username": user.username, "role": user.role.as_str()}),
            )
            .await?;
            success(format!("Created {} '{}' ({})", user.role, user.username, user.id.dimmed()));
        }

        UserCommand::Delete { user } => {
            let actor = ctx.require_admin("user delete")?;
            let target = admin::resolve_user_ref(&ctx.store, user)?;
            let removed = admin::delete_user(&ctx.store, &target.id)?;
            ctx.record(
                EventType::UserDelete,
                Some(&actor.username),
                Some(&removed.id),
                json!({"username": removed.username}),
            )
            .await?;
            success(format!("Deleted user '{}'; test results were kept", removed.username));
        }

        UserCommand::Passwd { user, password } => {
            let actor = ctx.require_admin("user passwd")?;
            let target = admin::resolve_user_ref(&ctx.store, user)?;
            let password = password_or_prompt(
                password.as_deref(),
                &format!("New password for '{}':", target.username),
                true,
            )?;
            admin::set_password(&ctx.store, &target.id, &password)?;
            ctx.record(
                EventType::PasswordChange,
                Some(&actor.username),
                Some(&target.id),
                json!({"username": target.username}),
            )
            .await?;
            success(format!("Password changed for '{}'", target.username));
        }

        UserCommand::List => {
            ctx.require_admin("user list")?;
            let users = ctx.store.users()?;

            let mut output = table(&["Username", "Role", "Grants", "Id"]);
            for user in &users {
                output.add_row(vec![
                    user.username.clone(),
                    user.role.to_string(),
                    user.permissions.trainings.len().to_string(),
                    user.id.clone(),
                ]);
            }
            println!("{output}");
        }
    }

    Ok(())
}
