//! MedTrain CLI Library
//!
//! Command-line training management for medical devices.
//!
//! # Overview
//!
//! - **Accounts**: Administrators manage users and time-limited grants (`medtrain user`, `medtrain grant`)
//! - **Catalog**: Trainings, devices and their quizzes (`medtrain training`, `medtrain device`, `medtrain question`)
//! - **Manuals**: Versioned PDF manuals with download tracking (`medtrain document`)
//! - **Testing**: Quiz attempts that lock after completion (`medtrain quiz`, `medtrain result`)
//! - **Certificates**: PDF certificates for passed tests (`medtrain certificate`)
//! - **Audit**: Hash-chained event log (`medtrain audit`)

pub mod access;
pub mod admin;
pub mod audit;
pub mod auth;
pub mod blob;
pub mod certificate;
pub mod commands;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod import;
pub mod progress;
pub mod quiz;
pub mod results;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use context::AppContext;
pub use error::{CliError, Result};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// MedTrain - Medical device training and certification
#[derive(Parser, Debug)]
#[command(name = "medtrain")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory (defaults to the platform data directory)
    #[arg(long, env = "MEDTRAIN_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and the first administrator
    Init {
        /// Administrator username
        #[arg(long, default_value = "admin")]
        admin_username: String,

        /// Administrator password (prompted when omitted)
        #[arg(long, env = "MEDTRAIN_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        /// Reinitialize an existing data directory, keeping its records
        #[arg(short, long)]
        force: bool,
    },

    /// Log in and remember the session
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "MEDTRAIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Manage user accounts (admin)
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage training access grants (admin)
    Grant {
        #[command(subcommand)]
        command: GrantCommand,
    },

    /// Manage trainings
    Training {
        #[command(subcommand)]
        command: TrainingCommand,
    },

    /// Manage devices
    Device {
        #[command(subcommand)]
        command: DeviceCommand,
    },

    /// Manage quiz questions (admin)
    Question {
        #[command(subcommand)]
        command: QuestionCommand,
    },

    /// Device manuals
    Document {
        #[command(subcommand)]
        command: DocumentCommand,
    },

    /// Take device tests
    Quiz {
        #[command(subcommand)]
        command: QuizCommand,
    },

    /// Test results
    Result {
        #[command(subcommand)]
        command: ResultCommand,
    },

    /// Certificates for passed tests
    Certificate {
        #[command(subcommand)]
        command: CertificateCommand,
    },

    /// Audit trail management
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Import a legacy browser-storage export (admin)
    Import {
        /// JSON file with `users`, `trainings` and `testResults`
        file: PathBuf,
    },
}

/// Account roles as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    Admin,
    Trainee,
}

/// Question types as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionTypeArg {
    Single,
    Multiple,
}

/// User management subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create an account
    Create {
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long, value_enum, default_value = "trainee")]
        role: RoleArg,
    },

    /// Delete an account (test results are kept)
    Delete {
        /// Username or id
        user: String,
    },

    /// Set a new password
    Passwd {
        /// Username or id
        user: String,

        /// New password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// List accounts
    List,
}

/// Grant subcommands
#[derive(Subcommand, Debug)]
pub enum GrantCommand {
    /// Grant access to devices of a training for a date window
    Set {
        /// Username or id
        user: String,

        /// Training id
        training: String,

        /// Device id (repeatable)
        #[arg(short, long = "device")]
        devices: Vec<String>,

        /// Grant every device of the training
        #[arg(long, conflicts_with = "devices")]
        all_devices: bool,

        /// First valid day (YYYY-MM-DD, default today)
        #[arg(long)]
        from: Option<String>,

        /// Last valid day (YYYY-MM-DD, default 30 days after start)
        #[arg(long)]
        until: Option<String>,
    },

    /// Remove the grant for a training
    Revoke {
        /// Username or id
        user: String,

        /// Training id
        training: String,
    },

    /// Show a user's grants
    List {
        /// Username or id
        user: String,
    },
}

/// Training subcommands
#[derive(Subcommand, Debug)]
pub enum TrainingCommand {
    /// Create a training (admin)
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(long, default_value = "")]
        image_url: String,

        /// Image scale in percent (1-200)
        #[arg(long)]
        image_scale: Option<u32>,
    },

    /// Delete a training and its devices (admin)
    Delete { id: String },

    /// List trainings visible to you
    List,
}

/// Device subcommands
#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    /// Add a device to a training (admin)
    Add {
        /// Training id
        training: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(long, default_value = "")]
        image_url: String,

        /// Image scale in percent (1-200)
        #[arg(long)]
        image_scale: Option<u32>,

        /// Percentage needed to pass (0-100, default 70)
        #[arg(long)]
        passing: Option<u32>,
    },

    /// Delete a device (admin)
    Delete { id: String },

    /// List devices visible to you
    List {
        /// Only devices of this training
        #[arg(short, long)]
        training: Option<String>,
    },

    /// Show a device with your test status
    Show { id: String },
}

/// Question subcommands
#[derive(Subcommand, Debug)]
pub enum QuestionCommand {
    /// Add a question to a device
    Add {
        /// Device id
        device: String,

        #[arg(short, long)]
        text: String,

        #[arg(long = "type", value_enum, default_value = "single")]
        question_type: QuestionTypeArg,

        /// Answer option (repeatable, order matters)
        #[arg(short, long = "option", required = true)]
        options: Vec<String>,

        /// Zero-based index of a correct option (repeatable)
        #[arg(short, long = "correct", required = true)]
        correct: Vec<usize>,
    },

    /// Remove a question
    Delete {
        /// Device id
        device: String,

        /// Question id
        question: String,
    },

    /// List a device's questions with their answers
    List {
        /// Device id
        device: String,
    },
}

/// Manual subcommands
#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    /// Upload a PDF manual, replacing the current version (admin)
    Upload {
        /// Device id
        device: String,

        /// PDF file, at most 10 MiB
        file: PathBuf,
    },

    /// Download a device's manual
    Download {
        /// Device id
        device: String,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show manual metadata and download history (admin)
    Info {
        /// Device id
        device: String,
    },
}

/// Quiz subcommands
#[derive(Subcommand, Debug)]
pub enum QuizCommand {
    /// Take the test of a device
    Take {
        /// Device id
        device: String,

        /// Answers for non-interactive use: one group per question separated
        /// by `;`, option indices within a group separated by `,`
        /// (e.g. "1;0,2")
        #[arg(long)]
        answers: Option<String>,
    },
}

/// Result subcommands
#[derive(Subcommand, Debug)]
pub enum ResultCommand {
    /// List results (trainees see their own)
    List {
        /// Username or id (admin)
        #[arg(short, long)]
        user: Option<String>,

        /// Device id
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Unlock a result so the test can be retaken (admin)
    Unlock {
        /// Result id
        id: String,
    },
}

/// Certificate subcommands
#[derive(Subcommand, Debug)]
pub enum CertificateCommand {
    /// Write the certificate for your latest passed test of a device
    Issue {
        /// Device id
        device: String,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Issue for another user (admin)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Manage the custom certificate template (admin)
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
}

/// Certificate template subcommands
#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Validate and store a template JSON file
    Import { file: PathBuf },

    /// Print the template in effect
    Show,

    /// Remove the stored template and use the standard design
    Reset,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value (empty to unset)
        value: String,
    },

    /// Show all configuration
    Show,
}

/// Audit trail subcommands
#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// List audit events
    List {
        /// Limit number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only events of this type (e.g. "login", "result_unlock")
        #[arg(short = 't', long = "type")]
        event_type: Option<String>,

        /// Only events by this username
        #[arg(short, long)]
        actor: Option<String>,
    },

    /// Verify audit trail integrity
    Verify,

    /// Export the audit trail as JSON (admin)
    Export {
        /// Output file
        output: PathBuf,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_grant_set() {
        let cli = Cli::try_parse_from([
            "medtrain", "grant", "set", "alice", "t1", "-d", "d1", "-d", "d2", "--until", "2024-12-31",
        ])
        .unwrap();

        let Commands::Grant {
            command: GrantCommand::Set { devices, until, all_devices, .. },
        } = cli.command
        else {
            panic!("expected grant set");
        };
        assert_eq!(devices, vec!["d1", "d2"]);
        assert_eq!(until.as_deref(), Some("2024-12-31"));
        assert!(!all_devices);
    }

    #[test]
    fn test_parse_question_add() {
        let cli = Cli::try_parse_from([
            "medtrain", "question", "add", "d1", "--text", "Which?", "--type", "multiple",
            "-o", "A", "-o", "B", "-o", "C", "-c", "0", "-c", "2",
        ])
        .unwrap();

        let Commands::Question {
            command: QuestionCommand::Add { question_type, options, correct, .. },
        } = cli.command
        else {
            panic!("expected question add");
        };
        assert_eq!(question_type, QuestionTypeArg::Multiple);
        assert_eq!(options.len(), 3);
        assert_eq!(correct, vec![0, 2]);
    }
}
