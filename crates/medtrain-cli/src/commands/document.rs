//! `medtrain document` command implementation

use crate::access;
use crate::audit::EventType;
use crate::commands::{note, success, table};
use crate::config::Config;
use crate::context::AppContext;
use crate::documents;
use crate::error::{CliError, Result};
use crate::progress::format_bytes;
use crate::DocumentCommand;
use colored::Colorize;
use serde_json::json;

pub async fn run(config: Config, command: &DocumentCommand) -> Result<()> {
    let ctx = AppContext::open(config)?;

    match command {
        DocumentCommand::Upload { device, file } => {
            let actor = ctx.require_admin("document upload")?;
            let bytes = tokio::fs::read(file).await?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| CliError::validation(format!("'{}' is not a file", file.display())))?;

            let document = documents::upload(&ctx.store, &ctx.blobs, device, &file_name, &bytes)?;
            ctx.record(
                EventType::DocumentUpload,
                Some(&actor.username),
                Some(&document.id),
                json!({
                    "deviceId": document.device_id,
                    "fileName": document.file_name,
                    "fileSize": document.file_size,
                    "version": document.version,
                }),
            )
            .await?;
            success(format!(
                "Uploaded '{}' ({}) as version {}",
                document.file_name,
                format_bytes(document.file_size),
                document.version
            ));
        }

        DocumentCommand::Download { device, output } => {
            let (session, user) = ctx.current_user()?;
            let (training, found) = ctx
                .store
                .find_device(device)?
                .ok_or_else(|| CliError::DeviceNotFound(device.clone()))?;
            if !access::is_device_visible(&user, &training, &found, ctx.today()) {
                return Err(CliError::NotAuthorized(found.title));
            }

            let downloaded = documents::download(&ctx.store, &ctx.blobs, device, &session, output)?;

            ctx.record(
                EventType::DocumentDownload,
                Some(&user.username),
                Some(&downloaded.download.document_id),
                json!({"deviceId": device, "fileName": downloaded.file_name}),
            )
            .await?;
            success(format!("Saved manual to {}", downloaded.path.display()));
        }

        DocumentCommand::Info { device } => {
            ctx.require_admin("document info")?;
            let (_, found) = ctx
                .store
                .find_device(device)?
                .ok_or_else(|| CliError::DeviceNotFound(device.clone()))?;
            let document = found
                .documentation
                .ok_or_else(|| CliError::NoDocument(found.title.clone()))?;

            println!("{}", found.title.bold());
            println!("{:<12} {}", "File:".cyan(), document.file_name);
            println!("{:<12} {}", "Size:".cyan(), format_bytes(document.file_size));
            println!("{:<12} {}", "Version:".cyan(), document.version);
            println!(
                "{:<12} {}",
                "Uploaded:".cyan(),
                document.upload_date.format("%Y-%m-%d %H:%M")
            );
            if document.file_handle.is_none() {
                note("The file itself is not stored; upload it again to make it available");
            }

            if document.downloads.is_empty() {
                note("No downloads yet");
                return Ok(());
            }
            let mut output = table(&["User", "Downloaded"]);
            for download in &document.downloads {
                output.add_row(vec![
                    download.username.clone(),
                    download.download_date.format("%Y-%m-%d %H:%M").to_string(),
                ]);
            }
            println!("{output}");
        }
    }

    Ok(())
}
