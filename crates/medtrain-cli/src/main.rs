//! MedTrain CLI - Main entry point

use clap::Parser;
use medtrain_cli::commands;
use medtrain_cli::{Cli, Commands, Config};
use medtrain_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // A missing .env is fine; anything else is reported once logging is up
    let dotenv_error = dotenvy::dotenv().err().filter(|e| !e.not_found());

    let cli = Cli::parse();

    let mut config = match Config::load_from(cli.data_dir.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    config.set_verbose(cli.verbose);

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_dir(config.data_dir().join("logs"))
        .log_file_prefix("medtrain")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok().flatten();
    if let Some(e) = dotenv_error {
        warn!(error = %e, "Ignoring unreadable .env file");
    }

    if let Err(e) = execute_command(cli, config).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli, config: Config) -> medtrain_cli::Result<()> {
    match cli.command {
        Commands::Init {
            admin_username,
            admin_password,
            force,
        } => commands::init::run(config, admin_username, admin_password, force).await,

        Commands::Login { username, password } => commands::session::login(config, username, password).await,
        Commands::Logout => commands::session::logout(config).await,
        Commands::Whoami => commands::session::whoami(config).await,

        Commands::User { command } => commands::user::run(config, &command).await,
        Commands::Grant { command } => commands::grant::run(config, &command).await,
        Commands::Training { command } => commands::training::run(config, &command).await,
        Commands::Device { command } => commands::device::run(config, &command).await,
        Commands::Question { command } => commands::question::run(config, &command).await,
        Commands::Document { command } => commands::document::run(config, &command).await,
        Commands::Quiz { command } => commands::quiz::run(config, &command).await,
        Commands::Result { command } => commands::result::run(config, &command).await,
        Commands::Certificate { command } => commands::certificate::run(config, &command).await,
        Commands::Audit { command } => commands::audit::run(config, &command).await,
        Commands::Config { command } => commands::config::run(config, &command).await,
        Commands::Import { file } => commands::import::run(config, &file).await,
    }
}
