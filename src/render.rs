//! Draws a single field onto a canvas.

use crate::canvas::Canvas;
use crate::color;
use crate::config::{try_format_date, DEFAULT_DATE_FORMAT};
use crate::decode::ImageDecoder;
use crate::error::Result;
use crate::model::{Field, FieldBody, TextStyle, DEFAULT_COLOR};
use crate::qr;
use crate::text;
use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use tracing::debug;

/// Per-row inputs that are not part of the field itself.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Date shown by date fields
    pub today: NaiveDate,
    /// Pattern for date fields that do not set their own
    pub date_format: &'a str,
    /// Payload for QR fields that have no row value
    pub qr_payload: &'a str,
}

/// What a field left on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawn {
    Text(String),
    Image,
    Qr { payload: String, raster: RgbaImage },
    Nothing,
}

/// Draws fields, resolving image references through `decoder`.
pub struct FieldRenderer<'d> {
    decoder: &'d dyn ImageDecoder,
}

impl<'d> FieldRenderer<'d> {
    pub fn new(decoder: &'d dyn ImageDecoder) -> Self {
        Self { decoder }
    }

    /// Draw `field` with the row's `value`. An `Err` means the field could
    /// not be drawn; the canvas is left untouched in that case.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        field: &Field,
        value: Option<&str>,
        ctx: &RenderContext<'_>,
    ) -> Result<Drawn> {
        let value = value
            .filter(|v| !v.is_empty())
            .or_else(|| field.default_value.as_deref().filter(|v| !v.is_empty()));

        match &field.body {
            FieldBody::Text { style } => {
                let display = value.map(str::to_string).unwrap_or_else(|| field.placeholder());
                draw_text(canvas, field, style, &display)?;
                Ok(Drawn::Text(display))
            }
            FieldBody::Date { style, format } => {
                let display = format_date(ctx.today, format.as_deref().unwrap_or(ctx.date_format));
                draw_text(canvas, field, style, &display)?;
                Ok(Drawn::Text(display))
            }
            FieldBody::Image { size } => {
                let Some(reference) = value else {
                    return Ok(Drawn::Nothing);
                };
                let img = self.decoder.decode(reference)?.to_rgba8();
                let (width, height) = (size.width.min(canvas.width()), size.height.min(canvas.height()));
                canvas.draw_image_centered(&img, field.position.x, field.position.y, width, height);
                Ok(Drawn::Image)
            }
            FieldBody::Qr { size } => {
                let payload = value.unwrap_or(ctx.qr_payload);
                let edge = size.width.min(canvas.width()).min(canvas.height());
                let raster = qr::encode(payload, edge)?;
                canvas.draw_image_centered(&raster, field.position.x, field.position.y, edge, edge);
                Ok(Drawn::Qr {
                    payload: payload.to_string(),
                    raster,
                })
            }
            FieldBody::Barcode {} | FieldBody::Signature {} => {
                debug!(field = %field.id, kind = ?field.kind(), "field kind has no renderer");
                Ok(Drawn::Nothing)
            }
        }
    }
}

fn draw_text(canvas: &mut Canvas, field: &Field, style: &TextStyle, display: &str) -> Result<()> {
    let ink = text_color(&style.color);
    // Capped at the canvas height.
    let pixel_height = style.font_size.min(canvas.height() as f32).max(1.0);
    let mask = text::rasterize(display, pixel_height, style.bold, style.italic)?;
    canvas.fill_text(&mask, field.position.x, field.position.y, style.text_align, ink);
    Ok(())
}

fn text_color(value: &str) -> Rgba<u8> {
    color::parse(value)
        .or_else(|| color::parse(DEFAULT_COLOR))
        .unwrap_or(Rgba([0, 0, 0, 255]))
}

/// Format `date` with `pattern`, falling back to the default pattern when
/// chrono cannot use it.
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    try_format_date(date, pattern)
        .or_else(|| try_format_date(date, DEFAULT_DATE_FORMAT))
        .unwrap_or_else(|| date.to_string())
}
