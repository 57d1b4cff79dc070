//! Build automation tasks for MedTrain
//!
//! Currently generates the CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for MedTrain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<medtrain_cli::Cli>();

    let content = format!(
        r#"# MedTrain CLI Reference

This documentation is generated from the CLI source code. Last updated: {}.

## Overview

MedTrain manages medical device trainings: administrators maintain trainings,
devices, quizzes and manuals and grant trainees time-limited access; trainees
take one locked attempt per device and receive a PDF certificate when they pass.

## Quick Start

```bash
# Create the data directory and the first administrator
medtrain init

# Log in and set up a training
medtrain login -u admin
medtrain training create -t "Infusion Therapy" -d "Pumps and lines"
medtrain device add <training-id> -t "Infusion Pump X" -d "Volumetric pump"
medtrain question add <device-id> -t "Maximum rate?" -o "10 ml/h" -o "999 ml/h" -c 1

# Create a trainee and grant access for 30 days
medtrain user create alice
medtrain grant set alice <training-id> --all-devices

# As the trainee
medtrain login -u alice
medtrain quiz take <device-id>
medtrain certificate issue <device-id>
```

## Commands

{}

## Environment Variables

- `MEDTRAIN_DATA_DIR` - Data directory (default: platform data directory)
- `MEDTRAIN_ISSUER` - Issuer printed on certificates
- `MEDTRAIN_TEMPLATE` - Certificate template JSON file
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - Logging

## Audit Trail

Every state change is appended to a hash-chained audit trail in `medtrain.db`.

```bash
medtrain audit verify
medtrain audit export audit.json
```

---

*Generated by `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("✅ Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
