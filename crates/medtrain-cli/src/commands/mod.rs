//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod audit;
pub mod certificate;
pub mod config;
pub mod device;
pub mod document;
pub mod grant;
pub mod import;
pub mod init;
pub mod question;
pub mod quiz;
pub mod result;
pub mod session;
pub mod training;
pub mod user;

use crate::error::{CliError, Result};
use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Table with the shared presentation
pub(crate) fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header.to_vec());
    table
}

pub(crate) fn success(message: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), message);
}

pub(crate) fn note(message: impl std::fmt::Display) {
    println!("{} {}", "→".cyan(), message);
}

/// Parse an optional `YYYY-MM-DD` argument
pub(crate) fn parse_date_arg(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|raw| {
        medtrain_common::types::parse_date(raw.trim())
            .map_err(|_| CliError::validation(format!("'{raw}' is not a date in YYYY-MM-DD format")))
    })
    .transpose()
}

/// Use the given secret or ask for it without echo
pub(crate) fn password_or_prompt(given: Option<&str>, prompt: &str, confirm: bool) -> Result<String> {
    if let Some(password) = given {
        return Ok(password.to_string());
    }

    let mut prompt = inquire::Password::new(prompt).with_display_mode(inquire::PasswordDisplayMode::Masked);
    if !confirm {
        prompt = prompt.without_confirmation();
    }
    Ok(prompt.prompt()?)
}

/// Use the given value or ask for it
pub(crate) fn text_or_prompt(given: Option<&str>, prompt: &str) -> Result<String> {
    match given {
        Some(value) => Ok(value.to_string()),
        None => Ok(inquire::Text::new(prompt).prompt()?),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(parse_date_arg(None).unwrap(), None);
        assert_eq!(
            parse_date_arg(Some("2024-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(matches!(
            parse_date_arg(Some("29.02.2024")),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn test_given_values_skip_prompts() {
        assert_eq!(password_or_prompt(Some("pw"), "Password:", true).unwrap(), "pw");
        assert_eq!(text_or_prompt(Some("alice"), "Username:").unwrap(), "alice");
    }
}
