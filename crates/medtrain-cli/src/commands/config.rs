//! `medtrain config` command implementation
//!
//! Reads and writes `config.toml` in the data directory. Environment
//! variables still override what is stored there.

use crate::audit::EventType;
use crate::commands::{note, success};
use crate::config::{Config, FileConfig, CONFIG_KEYS, ENV_DATA_DIR, ENV_ISSUER, ENV_TEMPLATE};
use crate::context::AppContext;
use crate::error::Result;
use crate::ConfigCommand;
use colored::Colorize;
use serde_json::json;

pub async fn run(config: Config, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Get { key } => get(&config, key),
        ConfigCommand::Set { key, value } => set(config, key, value).await,
        ConfigCommand::Show => {
            show(&config);
            Ok(())
        }
    }
}

/// Print the effective value of a key
fn get(config: &Config, key: &str) -> Result<()> {
    // Rejects unknown keys
    FileConfig::default().get(key)?;

    match key {
        "issuer" => println!("{}", config.issuer),
        _ => match &config.template {
            Some(path) => println!("{}", path.display()),
            None => println!(),
        },
    }
    Ok(())
}

/// Store a value in `config.toml`
async fn set(config: Config, key: &str, value: &str) -> Result<()> {
    let ctx = AppContext::open(config)?;
    let actor = ctx.require_admin("config set")?;

    let path = ctx.config.config_path();
    let mut file = FileConfig::load(&path)?;
    let previous = file.get(key)?;
    file.set(key, value)?;
    file.save(&path)?;

    ctx.record(
        EventType::ConfigChange,
        Some(&actor.username),
        Some(key),
        json!({"key": key, "previous": previous, "value": file.get(key)?}),
    )
    .await?;

    match file.get(key)? {
        Some(stored) => success(format!("{key} = {stored}")),
        None => success(format!("{key} unset")),
    }

    let env_var = match key {
        "issuer" => ENV_ISSUER,
        _ => ENV_TEMPLATE,
    };
    if std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty()) {
        note(format!("{env_var} is set and overrides this value"));
    }
    Ok(())
}

/// Show all configuration
fn show(config: &Config) {
    println!("{}", "MedTrain Configuration:".cyan().bold());
    println!();
    println!("{:<12} {}", "data_dir:", config.data_dir().display());
    println!("{:<12} {}", "issuer:", config.issuer);
    println!(
        "{:<12} {}",
        "template:",
        config
            .template
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("{} (if present)", config.template_path().display()))
    );
    println!("{:<12} {}", "verbose:", config.is_verbose());
    println!();
    println!("{} {}", "Stored keys:".cyan(), CONFIG_KEYS.join(", "));
    println!("{}", "Environment Variables:".cyan());
    println!("  {ENV_DATA_DIR:<18} - Data directory");
    println!("  {ENV_ISSUER:<18} - Certificate issuer");
    println!("  {ENV_TEMPLATE:<18} - Certificate template file");
}
