//! Template editing operations.
//!
//! Every successful mutation stamps `updated_at`.

use crate::decode::ImageDecoder;
use crate::error::{AppError, Result};
use crate::model::{Canvas, Field, FieldBody, FieldKind, Position, Size, Template, TextStyle};
use chrono::Utc;
use image::GenericImageView;
use tracing::{debug, info};

/// Partial update for an existing field. `None` leaves a property alone.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub required: Option<bool>,
    /// An empty string clears the default
    pub default_value: Option<String>,
    pub style: Option<TextStyle>,
    pub size: Option<Size>,
}

fn default_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Qr => "QR Code",
        FieldKind::Date => "Date",
        FieldKind::Image => "Photo",
        _ => "New Field",
    }
}

impl Template {
    /// Add a field of `kind` at the canvas center and return its id.
    pub fn add_field(&mut self, kind: FieldKind) -> String {
        let id = self.unique_field_id();
        let field = Field {
            id: id.clone(),
            name: default_name(kind).to_string(),
            required: kind != FieldKind::Qr,
            position: Position {
                x: self.canvas.width as f32 / 2.0,
                y: self.canvas.height as f32 / 2.0,
            },
            default_value: None,
            body: FieldBody::defaults_for(kind),
        };
        debug!(template = %self.id, field = %id, ?kind, "added field");
        self.fields.push(field);
        self.touch();
        id
    }

    pub fn remove_field(&mut self, field_id: &str) -> Result<()> {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != field_id);
        if self.fields.len() == before {
            return Err(self.missing_field(field_id));
        }
        self.touch();
        Ok(())
    }

    pub fn update_field(&mut self, field_id: &str, patch: FieldPatch) -> Result<()> {
        let missing = self.missing_field(field_id);
        let field = self.field_mut(field_id).ok_or(missing)?;

        if let Some(name) = patch.name {
            field.name = name;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        if let Some(value) = patch.default_value {
            field.default_value = Some(value).filter(|v| !v.is_empty());
        }
        if let Some(new_style) = patch.style {
            match &mut field.body {
                FieldBody::Text { style } | FieldBody::Date { style, .. } => *style = new_style,
                _ => {
                    return Err(AppError::Input(format!(
                        "field '{}' has no text style",
                        field_id
                    )))
                }
            }
        }
        if let Some(new_size) = patch.size {
            match &mut field.body {
                FieldBody::Image { size } | FieldBody::Qr { size } => *size = new_size,
                _ => return Err(AppError::Input(format!("field '{}' has no size", field_id))),
            }
        }
        self.touch();
        Ok(())
    }

    /// Move a field, clamping the position to the canvas.
    pub fn move_field(&mut self, field_id: &str, x: f32, y: f32) -> Result<Position> {
        let Canvas { width, height } = self.canvas;
        let missing = self.missing_field(field_id);
        let field = self.field_mut(field_id).ok_or(missing)?;
        field.position = Position {
            x: x.clamp(0.0, width as f32),
            y: y.clamp(0.0, height as f32),
        };
        let position = field.position;
        self.touch();
        Ok(position)
    }

    /// Attach a background and adopt its pixel dimensions as the canvas.
    pub fn set_background(&mut self, reference: String, decoder: &dyn ImageDecoder) -> Result<Canvas> {
        let (width, height) = decoder.decode(&reference)?.dimensions();
        self.canvas = Canvas { width, height };
        self.background_image = Some(reference);
        self.touch();
        info!(template = %self.id, width, height, "background set");
        Ok(self.canvas)
    }

    pub fn clear_background(&mut self) {
        self.background_image = None;
        self.touch();
    }

    fn field_mut(&mut self, field_id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == field_id)
    }

    fn missing_field(&self, field_id: &str) -> AppError {
        AppError::NotFound(format!("field '{}' in template '{}'", field_id, self.id))
    }

    fn unique_field_id(&self) -> String {
        let base = format!("field_{}", Utc::now().timestamp_millis());
        let mut id = base.clone();
        let mut n = 1;
        while self.field(&id).is_some() {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        id
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
