//! Single-page PDF builder over `pdf-writer`
//!
//! Text uses the standard Type 1 fonts with WinAnsi encoding, which covers
//! German umlauts. Widths are estimated from a coarse Helvetica metric,
//! good enough for centering and wrapping.

use crate::error::{CliError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};
use std::io::Write;

/// A4 in PDF points
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// Points per millimetre
pub const MM: f32 = 72.0 / 25.4;

/// RGB colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Serif,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Serif];

    fn resource_name(self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"F1"),
            Font::Bold => Name(b"F2"),
            Font::Serif => Name(b"F3"),
        }
    }

    fn base_font(self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"Helvetica"),
            Font::Bold => Name(b"Helvetica-Bold"),
            Font::Serif => Name(b"Times-Roman"),
        }
    }

    /// Estimated advance of one character, in 1/1000 em
    fn char_width(self, c: char) -> f32 {
        let base = match c {
            ' ' => 278.0,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 240.0,
            'f' | 't' | 'r' | '(' | ')' | '-' => 333.0,
            'm' | 'w' => 833.0,
            'M' | 'W' => 900.0,
            '%' => 889.0,
            c if c.is_ascii_digit() => 556.0,
            c if c.is_uppercase() => 690.0,
            _ => 556.0,
        };
        match self {
            Font::Bold => base * 1.06,
            Font::Serif => base * 0.92,
            Font::Regular => base,
        }
    }

    /// Estimated width of `text` at `size` points
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum::<f32>() * size / 1000.0
    }
}

/// Encode text for a WinAnsi font; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (' '..='~').contains(&c) || ('\u{a0}'..='\u{ff}').contains(&c) => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap against the estimated width
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if font.text_width(&candidate, size) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Largest size not above `size` at which `text` fits into `max_width`
pub fn fit_font_size(text: &str, font: Font, size: f32, max_width: f32) -> f32 {
    let width = font.text_width(text, size);
    if width <= max_width || width == 0.0 {
        size
    } else {
        (size * max_width / width).max(6.0)
    }
}

/// Decoded raster image ready for embedding
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl RasterImage {
    /// Decode PNG or JPEG bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CliError::render(format!("unsupported image: {e}")))?;

        let (width, height) = (decoded.width(), decoded.height());
        if decoded.color().has_alpha() {
            let rgba = decoded.to_rgba8();
            let mut rgb = Vec::with_capacity((width * height * 3) as usize);
            let mut alpha = Vec::with_capacity((width * height) as usize);
            for pixel in rgba.pixels() {
                rgb.extend_from_slice(&pixel.0[..3]);
                alpha.push(pixel.0[3]);
            }
            Ok(Self { width, height, rgb, alpha: Some(alpha) })
        } else {
            Ok(Self {
                width,
                height,
                rgb: decoded.to_rgb8().into_raw(),
                alpha: None,
            })
        }
    }

    /// Width over height
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

struct PlacedImage {
    name: String,
    image: RasterImage,
}

/// Accumulates drawing operations for one A4 page
pub struct PageBuilder {
    content: Content,
    images: Vec<PlacedImage>,
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBuilder {
    pub fn new() -> Self {
        Self {
            content: Content::new(),
            images: Vec::new(),
        }
    }

    /// Text with its baseline starting at `(x, y)`
    pub fn text(&mut self, text: &str, font: Font, size: f32, color: Rgb, x: f32, y: f32) {
        self.text_rotated(text, font, size, color, x, y, 0.0);
    }

    /// Text centered horizontally on `center_x`
    pub fn text_centered(&mut self, text: &str, font: Font, size: f32, color: Rgb, center_x: f32, y: f32) {
        let x = center_x - font.text_width(text, size) / 2.0;
        self.text(text, font, size, color, x, y);
    }

    /// Text rotated counter-clockwise by `degrees` around its start point
    #[allow(clippy::too_many_arguments)]
    pub fn text_rotated(&mut self, text: &str, font: Font, size: f32, color: Rgb, x: f32, y: f32, degrees: f32) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.content.set_fill_rgb(color.0, color.1, color.2);
        self.content.begin_text();
        self.content.set_font(font.resource_name(), size);
        self.content.set_text_matrix([cos, sin, -sin, cos, x, y]);
        self.content.show(Str(&encode_win_ansi(text)));
        self.content.end_text();
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.content.set_fill_rgb(color.0, color.1, color.2);
        self.content.rect(x, y, width, height);
        self.content.fill_nonzero();
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32, color: Rgb) {
        self.content.set_stroke_rgb(color.0, color.1, color.2);
        self.content.set_line_width(line_width);
        self.content.rect(x, y, width, height);
        self.content.stroke();
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), line_width: f32, color: Rgb) {
        self.content.set_stroke_rgb(color.0, color.1, color.2);
        self.content.set_line_width(line_width);
        self.content.move_to(from.0, from.1);
        self.content.line_to(to.0, to.1);
        self.content.stroke();
    }

    /// Circle outline from four Bézier arcs
    pub fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32, line_width: f32, color: Rgb) {
        const K: f32 = 0.552_284_8;
        let k = r * K;
        self.content.set_stroke_rgb(color.0, color.1, color.2);
        self.content.set_line_width(line_width);
        self.content.move_to(cx + r, cy);
        self.content.cubic_to(cx + r, cy + k, cx + k, cy + r, cx, cy + r);
        self.content.cubic_to(cx - k, cy + r, cx - r, cy + k, cx - r, cy);
        self.content.cubic_to(cx - r, cy - k, cx - k, cy - r, cx, cy - r);
        self.content.cubic_to(cx + k, cy - r, cx + r, cy - k, cx + r, cy);
        self.content.close_path();
        self.content.stroke();
    }

    /// Draw an image into the box with lower-left corner `(x, y)`
    pub fn image(&mut self, image: RasterImage, x: f32, y: f32, width: f32, height: f32) {
        let name = format!("Im{}", self.images.len() + 1);
        self.content.save_state();
        self.content.transform([width, 0.0, 0.0, height, x, y]);
        self.content.x_object(Name(name.as_bytes()));
        self.content.restore_state();
        self.images.push(PlacedImage { name, image });
    }

    /// Assemble the document
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut next_id = 1;
        let mut alloc = || {
            let id = Ref::new(next_id);
            next_id += 1;
            id
        };

        let catalog_id = alloc();
        let page_tree_id = alloc();
        let page_id = alloc();
        let content_id = alloc();
        let font_ids: Vec<(Font, Ref)> = Font::ALL.iter().map(|font| (*font, alloc())).collect();

        struct ImageIds {
            image: Ref,
            mask: Option<Ref>,
        }
        let image_ids: Vec<ImageIds> = self
            .images
            .iter()
            .map(|placed| ImageIds {
                image: alloc(),
                mask: placed.image.alpha.as_ref().map(|_| alloc()),
            })
            .collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(page_tree_id);
        page.contents(content_id);
        {
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (font, id) in &font_ids {
                    fonts.pair(font.resource_name(), *id);
                }
            }
            if !self.images.is_empty() {
                let mut x_objects = resources.x_objects();
                for (placed, ids) in self.images.iter().zip(&image_ids) {
                    x_objects.pair(Name(placed.name.as_bytes()), ids.image);
                }
            }
        }
        page.finish();

        for (font, id) in &font_ids {
            pdf.type1_font(*id)
                .base_font(font.base_font())
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        for (placed, ids) in self.images.iter().zip(&image_ids) {
            let width = placed.image.width as i32;
            let height = placed.image.height as i32;

            let data = deflate(&placed.image.rgb)?;
            let mut xobject = pdf.image_xobject(ids.image, &data);
            xobject.filter(Filter::FlateDecode);
            xobject.width(width);
            xobject.height(height);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            if let Some(mask_id) = ids.mask {
                xobject.s_mask(mask_id);
            }
            xobject.finish();

            if let (Some(mask_id), Some(alpha)) = (ids.mask, placed.image.alpha.as_ref()) {
                let data = deflate(alpha)?;
                let mut mask = pdf.image_xobject(mask_id, &data);
                mask.filter(Filter::FlateDecode);
                mask.width(width);
                mask.height(height);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask.finish();
            }
        }

        let content = self.content.finish();
        pdf.stream(content_id, &content);

        Ok(pdf.finish())
    }
}
