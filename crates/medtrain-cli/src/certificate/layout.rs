//! Page layouts
//!
//! `standard` is the built-in design; `custom` follows a
//! [`CertificateTemplate`].

use super::pdf::{fit_font_size, wrap_text, Font, PageBuilder, RasterImage, Rgb, MM, PAGE_HEIGHT, PAGE_WIDTH};
use super::template::{fill_placeholders, CertificateTemplate, TemplateImage};
use super::{format_date, format_score, CertificateRequest};
use crate::error::{CliError, Result};

const BORDER_BLUE: Rgb = Rgb(0.74, 0.86, 0.98);
const WATERMARK_GREY: Rgb = Rgb(0.93, 0.93, 0.93);
const HEADING: Rgb = Rgb(0.12, 0.23, 0.37);
const MUTED: Rgb = Rgb(0.42, 0.45, 0.50);
const ACCENT: Rgb = Rgb(0.96, 0.55, 0.13);

const CENTER_X: f32 = PAGE_WIDTH / 2.0;

/// Convert a distance from the top edge in millimetres to a PDF y coordinate
fn from_top(mm: f32) -> f32 {
    PAGE_HEIGHT - mm * MM
}

pub fn standard(request: &CertificateRequest) -> Result<Vec<u8>> {
    let mut page = PageBuilder::new();
    let content_width = PAGE_WIDTH - 2.0 * 30.0 * MM;

    page.stroke_rect(
        10.0 * MM,
        10.0 * MM,
        PAGE_WIDTH - 20.0 * MM,
        PAGE_HEIGHT - 20.0 * MM,
        3.0,
        BORDER_BLUE,
    );
    page.stroke_rect(
        13.0 * MM,
        13.0 * MM,
        PAGE_WIDTH - 26.0 * MM,
        PAGE_HEIGHT - 26.0 * MM,
        1.0,
        BORDER_BLUE,
    );

    // Diagonal watermark through the page center
    let watermark_size = fit_font_size(&request.issuer, Font::Bold, 54.0, PAGE_HEIGHT * 0.8);
    let half = Font::Bold.text_width(&request.issuer, watermark_size) / 2.0;
    let (sin, cos) = 45f32.to_radians().sin_cos();
    page.text_rotated(
        &request.issuer,
        Font::Bold,
        watermark_size,
        WATERMARK_GREY,
        CENTER_X - half * cos,
        PAGE_HEIGHT / 2.0 - half * sin,
        45.0,
    );

    page.text_centered("Zertifikat", Font::Serif, 40.0, HEADING, CENTER_X, from_top(50.0));
    page.text_centered(
        "für erfolgreich absolvierte Schulung",
        Font::Regular,
        16.0,
        MUTED,
        CENTER_X,
        from_top(62.0),
    );

    let mut y = from_top(95.0);
    let mut line = |page: &mut PageBuilder, text: &str, font: Font, size: f32, color: Rgb, gap: f32| {
        for wrapped in wrap_text(text, font, size, content_width) {
            page.text_centered(&wrapped, font, size, color, CENTER_X, y);
            y -= size * 1.3;
        }
        y -= gap;
    };

    line(&mut page, "Hiermit wird bestätigt, dass", Font::Regular, 14.0, Rgb::BLACK, 14.0);
    let name_size = fit_font_size(&request.username, Font::Bold, 28.0, content_width);
    line(&mut page, &request.username, Font::Bold, name_size, HEADING, 14.0);
    line(&mut page, "erfolgreich an der Schulung", Font::Regular, 14.0, Rgb::BLACK, 10.0);
    line(&mut page, &request.training_title, Font::Bold, 20.0, HEADING, 10.0);
    line(&mut page, "für das Gerät", Font::Regular, 14.0, Rgb::BLACK, 10.0);
    line(&mut page, &request.device_title, Font::Bold, 20.0, HEADING, 14.0);
    line(
        &mut page,
        &format!("teilgenommen und mit {}% bestanden hat.", format_score(request.score)),
        Font::Regular,
        14.0,
        Rgb::BLACK,
        0.0,
    );

    let footer_y = 55.0 * MM;
    let left_x = 35.0 * MM;
    let right_x = PAGE_WIDTH - 35.0 * MM;
    let rule = 55.0 * MM;

    page.line((left_x, footer_y), (left_x + rule, footer_y), 0.8, Rgb::BLACK);
    page.text_centered(
        "Unterschrift Ausbilder",
        Font::Regular,
        10.0,
        MUTED,
        left_x + rule / 2.0,
        footer_y - 14.0,
    );

    page.stroke_circle(CENTER_X, footer_y + 10.0, 14.0 * MM, 1.2, HEADING);
    page.text_centered("SIEGEL", Font::Bold, 11.0, HEADING, CENTER_X, footer_y + 6.0);

    page.text_centered(
        &format_date(request.date),
        Font::Regular,
        12.0,
        Rgb::BLACK,
        right_x - rule / 2.0,
        footer_y + 6.0,
    );
    page.line((right_x - rule, footer_y), (right_x, footer_y), 0.8, Rgb::BLACK);
    page.text_centered(
        "Datum der Ausstellung",
        Font::Regular,
        10.0,
        MUTED,
        right_x - rule / 2.0,
        footer_y - 14.0,
    );

    page.finish()
}

/// Load a template image, skipping ones that cannot be read
fn load_image(image: &TemplateImage) -> Option<RasterImage> {
    let loaded = std::fs::read(&image.path)
        .map_err(CliError::from)
        .and_then(|bytes| RasterImage::decode(&bytes));
    match loaded {
        Ok(raster) => Some(raster),
        Err(e) => {
            tracing::warn!(path = %image.path.display(), error = %e, "Skipping certificate image");
            None
        }
    }
}

pub fn custom(request: &CertificateRequest, template: &CertificateTemplate) -> Result<Vec<u8>> {
    let mut page = PageBuilder::new();

    let strip = template.accent_strip_width * MM;
    if strip > 0.0 {
        page.fill_rect(PAGE_WIDTH - strip, 0.0, strip, PAGE_HEIGHT, ACCENT);
    }

    if let Some(logo) = template.logo.as_ref() {
        if let Some(raster) = load_image(logo) {
            let offset = logo.position.unwrap_or_default();
            let height = template.logo_position.height * MM * logo.scale_factor();
            let width = height * raster.aspect();
            let x = PAGE_WIDTH - template.logo_position.right * MM - width + offset.x * MM;
            let y = from_top(template.logo_position.top + offset.y) - height;
            page.image(raster, x, y, width, height);
        }
    }

    // Text column sits left of the strip
    let left = 25.0 * MM;
    let column_width = PAGE_WIDTH - strip - left - 20.0 * MM;
    let score = format_score(request.score);
    let date = format_date(request.date);
    let values = [
        ("name", request.username.as_str()),
        ("training", request.training_title.as_str()),
        ("device", request.device_title.as_str()),
        ("score", score.as_str()),
        ("date", date.as_str()),
    ];

    let title_size = fit_font_size(&template.title, Font::Bold, template.title_font_size, column_width);
    page.text(&template.title, Font::Bold, title_size, HEADING, left, from_top(60.0));

    let mut y = from_top(60.0) - title_size - 10.0 * MM;

    let reference = if template.reference_text.trim().is_empty() {
        format!(
            "Hiermit wird bestätigt, dass {} erfolgreich an der Schulung {} für das Gerät {} teilgenommen und mit {}% bestanden hat.",
            request.username, request.training_title, request.device_title, score
        )
    } else {
        fill_placeholders(&template.reference_text, &values)
    };
    let size = template.reference_text_font_size;
    for paragraph in reference.lines() {
        for wrapped in wrap_text(paragraph, Font::Regular, size, column_width) {
            page.text(&wrapped, Font::Regular, size, Rgb::BLACK, left, y);
            y -= size * 1.4;
        }
    }
    y -= 8.0 * MM;

    let size = template.module_font_size;
    for module in &template.modules {
        page.text(&module.title, Font::Bold, size, HEADING, left, y);
        y -= size * 1.5;
        for point in &module.points {
            let indent = left + 6.0 * MM;
            page.text("•", Font::Regular, size, ACCENT, left + 2.0 * MM, y);
            for wrapped in wrap_text(point, Font::Regular, size, column_width - 6.0 * MM) {
                page.text(&wrapped, Font::Regular, size, Rgb::BLACK, indent, y);
                y -= size * 1.35;
            }
        }
        y -= size * 0.6;
    }

    if !template.bottom_text.trim().is_empty() {
        y -= 4.0 * MM;
        let size = template.bottom_text_font_size;
        let bottom = fill_placeholders(&template.bottom_text, &values);
        for paragraph in bottom.lines() {
            for wrapped in wrap_text(paragraph, Font::Regular, size, column_width) {
                page.text(&wrapped, Font::Regular, size, Rgb::BLACK, left, y);
                y -= size * 1.4;
            }
        }
    }

    // Signature, stamp and seal share a row above the bottom margin
    let row_base = 35.0 * MM;
    let slot = column_width / 3.0;
    let slots: [(Option<&TemplateImage>, f32, Option<&str>); 3] = [
        (template.signature.as_ref(), 30.0, Some("Unterschrift")),
        (template.stamp.as_ref(), 40.0, None),
        (template.seal.as_ref(), 40.0, None),
    ];
    for (index, (image, base_height, caption)) in slots.into_iter().enumerate() {
        let slot_x = left + slot * index as f32;
        if let Some(image) = image {
            if let Some(raster) = load_image(image) {
                let offset = image.position.unwrap_or_default();
                let height = base_height * MM * image.scale_factor();
                let width = (height * raster.aspect()).min(slot - 4.0 * MM);
                let height = width / raster.aspect();
                page.image(
                    raster,
                    slot_x + offset.x * MM,
                    row_base + 4.0 * MM - offset.y * MM,
                    width,
                    height,
                );
            }
        }
        if let Some(caption) = caption {
            page.line((slot_x, row_base), (slot_x + slot - 8.0 * MM, row_base), 0.8, Rgb::BLACK);
            page.text(caption, Font::Regular, 10.0, MUTED, slot_x, row_base - 14.0);
        }
    }

    page.text(&date, Font::Regular, 10.0, MUTED, left, 15.0 * MM);

    page.finish()
}
