//! Custom certificate template
//!
//! Stored as JSON in the data directory. Missing fields fall back to the
//! built-in defaults so partially filled templates remain usable.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MIN_IMAGE_SCALE: u32 = 1;
pub const MAX_IMAGE_SCALE: u32 = 200;

fn default_title() -> String {
    "Schulungszertifikat".to_string()
}

fn default_title_size() -> f32 {
    32.0
}

fn default_text_size() -> f32 {
    16.0
}

fn default_module_size() -> f32 {
    14.0
}

fn default_modules() -> Vec<TemplateModule> {
    vec![TemplateModule {
        title: "Trainingsmodul 1".to_string(),
        points: Vec::new(),
    }]
}

fn default_strip_width() -> f32 {
    20.0
}

fn default_scale() -> u32 {
    100
}

/// Layout of a custom certificate. Lengths are in millimetres, font sizes
/// in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateTemplate {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_title_size")]
    pub title_font_size: f32,

    /// Confirmation paragraph. Supports `{name}`, `{training}`, `{device}`,
    /// `{score}` and `{date}`.
    #[serde(default)]
    pub reference_text: String,
    #[serde(default = "default_text_size")]
    pub reference_text_font_size: f32,

    #[serde(default = "default_modules")]
    pub modules: Vec<TemplateModule>,
    #[serde(default = "default_module_size")]
    pub module_font_size: f32,

    #[serde(default)]
    pub bottom_text: String,
    #[serde(default = "default_text_size")]
    pub bottom_text_font_size: f32,

    #[serde(default = "default_strip_width", alias = "orangeStripWidth")]
    pub accent_strip_width: f32,
    #[serde(default)]
    pub logo_position: LogoPosition,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<TemplateImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<TemplateImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<TemplateImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal: Option<TemplateImage>,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            title: default_title(),
            title_font_size: default_title_size(),
            reference_text: String::new(),
            reference_text_font_size: default_text_size(),
            modules: default_modules(),
            module_font_size: default_module_size(),
            bottom_text: String::new(),
            bottom_text_font_size: default_text_size(),
            accent_strip_width: default_strip_width(),
            logo_position: LogoPosition::default(),
            logo: None,
            signature: None,
            stamp: None,
            seal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateModule {
    pub title: String,
    #[serde(default)]
    pub points: Vec<String>,
}

/// Logo anchor measured from the top-right corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogoPosition {
    pub top: f32,
    pub right: f32,
    pub height: f32,
}

impl Default for LogoPosition {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 30.0,
            height: 25.0,
        }
    }
}

/// Offset from the image's default placement, in millimetres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageOffset {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// PNG or JPEG file placed on the certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateImage {
    pub path: PathBuf,
    /// Percent of the default size
    #[serde(default = "default_scale")]
    pub scale: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ImageOffset>,
}

impl TemplateImage {
    pub fn scale_factor(&self) -> f32 {
        self.scale as f32 / 100.0
    }
}

impl CertificateTemplate {
    /// Read a template file; `None` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)?;
        let mut template: Self = serde_json::from_str(&raw)?;
        if let Some(base) = path.parent() {
            template.resolve_paths(base);
        }
        template.validate()?;
        Ok(Some(template))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CliError::validation("template title is empty"));
        }

        let sizes = [
            ("titleFontSize", self.title_font_size),
            ("referenceTextFontSize", self.reference_text_font_size),
            ("moduleFontSize", self.module_font_size),
            ("bottomTextFontSize", self.bottom_text_font_size),
        ];
        for (field, size) in sizes {
            if !(4.0..=96.0).contains(&size) {
                return Err(CliError::validation(format!(
                    "{field} must be between 4 and 96, got {size}"
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.accent_strip_width) {
            return Err(CliError::validation(format!(
                "accentStripWidth must be between 0 and 100 mm, got {}",
                self.accent_strip_width
            )));
        }

        for (field, image) in self.images() {
            if !(MIN_IMAGE_SCALE..=MAX_IMAGE_SCALE).contains(&image.scale) {
                return Err(CliError::validation(format!(
                    "{field} scale must be between {MIN_IMAGE_SCALE} and {MAX_IMAGE_SCALE}, got {}",
                    image.scale
                )));
            }
        }
        Ok(())
    }

    /// Make relative image paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for image in [&mut self.logo, &mut self.signature, &mut self.stamp, &mut self.seal]
            .into_iter()
            .flatten()
        {
            if image.path.is_relative() {
                image.path = base.join(&image.path);
            }
        }
    }

    fn images(&self) -> impl Iterator<Item = (&'static str, &TemplateImage)> {
        [
            ("logo", self.logo.as_ref()),
            ("signature", self.signature.as_ref()),
            ("stamp", self.stamp.as_ref()),
            ("seal", self.seal.as_ref()),
        ]
        .into_iter()
        .filter_map(|(field, image)| image.map(|image| (field, image)))
    }
}

/// Substitute `{placeholder}` markers in template text
pub fn fill_placeholders(text: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(text.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}
