//! `medtrain import` command implementation

use crate::audit::{execute_with_audit, AuditEvent, EventType};
use crate::commands::{note, success};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::import;
use serde_json::json;
use std::path::Path;

pub async fn run(config: Config, file: &Path) -> Result<()> {
    let ctx = AppContext::open(config)?;
    let actor = ctx.require_admin("import")?;

    let event = AuditEvent::new(
        EventType::DataImport,
        Some(actor.username.clone()),
        None,
        json!({"source": file.display().to_string()}),
    );

    let store = &ctx.store;
    let summary = execute_with_audit(&ctx.audit, event, || async move { import::import_file(store, file) }).await?;

    success(format!(
        "Imported {} user(s), {} training(s), {} test result(s)",
        summary.users, summary.trainings, summary.test_results
    ));
    if summary.skipped > 0 {
        note(format!("{} record(s) already present were skipped", summary.skipped));
    }
    if summary.users > 0 {
        note("Imported manuals have no stored file; upload them again with 'medtrain document upload'");
    }

    Ok(())
}
