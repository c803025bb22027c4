//! Text rasterization using the embedded Spleen bitmap faces.
//!
//! The requested font family is not resolved against system fonts; every
//! run is drawn with the Spleen face whose cell height is closest to the
//! requested pixel size, then scaled nearest-neighbour so edges stay crisp.

use crate::error::{AppError, Result};
use spleen_font::{PSF2Font, FONT_12X24, FONT_6X12, FONT_8X16};

/// Horizontal shift per row for italic runs, as a fraction of row height.
const ITALIC_SLANT: f32 = 0.2;

/// Upper bound on mask area; larger requests are scaled down to fit.
const MAX_MASK_PIXELS: f32 = 16_777_216.0;

/// Rasterized text as a coverage mask: 0 = empty, 255 = ink.
#[derive(Debug, Clone)]
pub struct TextMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl TextMask {
    pub fn coverage(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn ink_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Small,
    Medium,
    Large,
}

impl Face {
    fn for_pixel_height(px: f32) -> Self {
        if px <= 14.0 {
            Face::Small
        } else if px <= 20.0 {
            Face::Medium
        } else {
            Face::Large
        }
    }

    fn cell(self) -> (usize, usize) {
        match self {
            Face::Small => (6, 12),
            Face::Medium => (8, 16),
            Face::Large => (12, 24),
        }
    }

    fn font_data(self) -> &'static [u8] {
        match self {
            Face::Small => FONT_6X12,
            Face::Medium => FONT_8X16,
            Face::Large => FONT_12X24,
        }
    }
}

/// Rasterize a single line of text at `pixel_height`.
pub fn rasterize(text: &str, pixel_height: f32, bold: bool, italic: bool) -> Result<TextMask> {
    let pixel_height = pixel_height.max(1.0);
    let face = Face::for_pixel_height(pixel_height);
    let (cell_w, cell_h) = face.cell();

    let mut font = PSF2Font::new(face.font_data())
        .ok()
        .ok_or_else(|| AppError::Input("embedded font failed to load".to_string()))?;

    // Native-resolution bitmap, one cell per char.
    let chars: Vec<char> = text.chars().collect();
    let base_w = (chars.len() * cell_w).max(1);
    let mut base = vec![false; base_w * cell_h];
    for (i, ch) in chars.iter().enumerate() {
        let origin = i * cell_w;
        let utf8 = ch.to_string();
        match font.glyph_for_utf8(utf8.as_bytes()) {
            Some(glyph) => {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if on && row_y < cell_h && col_x < cell_w {
                            base[row_y * base_w + origin + col_x] = true;
                        }
                    }
                }
            }
            None if ch.is_whitespace() => {}
            None => draw_box(&mut base, base_w, origin, cell_w, cell_h),
        }
    }

    let native_area = (base_w * cell_h) as f32;
    let scale = (pixel_height / cell_h as f32).min((MAX_MASK_PIXELS / native_area).sqrt());
    let width = ((base_w as f32 * scale).round() as usize).max(1);
    let height = ((cell_h as f32 * scale).round() as usize).max(1);
    let mut scaled = vec![false; width * height];
    for y in 0..height {
        let sy = (y * cell_h / height).min(cell_h - 1);
        for x in 0..width {
            let sx = (x * base_w / width).min(base_w - 1);
            scaled[y * width + x] = base[sy * base_w + sx];
        }
    }

    let (mut bitmap, mut width) = (scaled, width);
    if bold {
        let stroke = (scale.round() as usize).max(1);
        (bitmap, width) = embolden(&bitmap, width, height, stroke);
    }
    if italic {
        (bitmap, width) = slant(&bitmap, width, height);
    }

    Ok(TextMask {
        width,
        height,
        data: bitmap.into_iter().map(|on| if on { 255 } else { 0 }).collect(),
    })
}

/// Smear each row rightward by `stroke` pixels.
fn embolden(src: &[bool], width: usize, height: usize, stroke: usize) -> (Vec<bool>, usize) {
    let out_w = width + stroke;
    let mut out = vec![false; out_w * height];
    for y in 0..height {
        for x in 0..width {
            if src[y * width + x] {
                for k in 0..=stroke {
                    out[y * out_w + x + k] = true;
                }
            }
        }
    }
    (out, out_w)
}

/// Shear rows so the top leans right; the bottom row stays put.
fn slant(src: &[bool], width: usize, height: usize) -> (Vec<bool>, usize) {
    let shift_for = |y: usize| ((height - 1 - y) as f32 * ITALIC_SLANT).round() as usize;
    let out_w = width + shift_for(0);
    let mut out = vec![false; out_w * height];
    for y in 0..height {
        let shift = shift_for(y);
        for x in 0..width {
            if src[y * width + x] {
                out[y * out_w + x + shift] = true;
            }
        }
    }
    (out, out_w)
}

/// Box outline for characters the face does not cover.
fn draw_box(bitmap: &mut [bool], stride: usize, origin: usize, w: usize, h: usize) {
    for x in origin + 1..origin + w - 1 {
        bitmap[stride + x] = true;
        bitmap[(h - 2) * stride + x] = true;
    }
    for y in 1..h - 1 {
        bitmap[y * stride + origin + 1] = true;
        bitmap[y * stride + origin + w - 2] = true;
    }
}
