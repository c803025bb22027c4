//! Templates, fields, rows and generated results.
//!
//! The JSON shape (camelCase, `type`-tagged fields) matches what the
//! template editor persists, so stored templates load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_FONT_SIZE: f32 = 24.0;
pub const DEFAULT_FONT_FAMILY: &str = "Georgia, serif";
pub const DEFAULT_COLOR: &str = "#1a1a1a";

/// Edge length used by image and QR fields without an explicit size
pub const DEFAULT_FIELD_SIZE: u32 = 100;

/// Prefix for result names when a row has no text value
pub const SYNTHETIC_NAME_PREFIX: &str = "Asset_";

// ============================================================================
// Template
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Certificate,
    BusinessCard,
    Lanyard,
    Badge,
    Custom,
}

impl TemplateKind {
    pub fn preset(self) -> Canvas {
        let (width, height) = match self {
            TemplateKind::Certificate => (2480, 1754),
            TemplateKind::BusinessCard => (1050, 600),
            TemplateKind::Lanyard => (638, 1013),
            TemplateKind::Badge => (800, 800),
            TemplateKind::Custom => (1920, 1080),
        };
        Canvas { width, height }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateKind::Certificate => "Certificate",
            TemplateKind::BusinessCard => "Business Card",
            TemplateKind::Lanyard => "Lanyard / ID Card",
            TemplateKind::Badge => "Badge",
            TemplateKind::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub canvas: Canvas,
    /// Image reference: data URL, file path or http(s) URL
    pub background_image: Option<String>,
    pub fields: Vec<Field>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Create a template sized from the kind's preset with a single
    /// required "Name" text field.
    pub fn new(kind: TemplateKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        let canvas = kind.preset();
        let name_field = Field {
            id: "name".to_string(),
            name: "Name".to_string(),
            required: true,
            position: Position {
                x: canvas.width as f32 / 2.0,
                y: canvas.height as f32 * 0.45,
            },
            default_value: None,
            body: FieldBody::Text {
                style: TextStyle::for_text(),
            },
        };

        Self {
            id: format!("template_{}", now.timestamp_millis()),
            name: name.into(),
            kind,
            description: None,
            canvas,
            background_image: None,
            fields: vec![name_field],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// First text-type field; its value names each generated result.
    pub fn name_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| matches!(f.body, FieldBody::Text { .. }))
    }
}

// ============================================================================
// Fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: DEFAULT_FIELD_SIZE,
            height: DEFAULT_FIELD_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub font_size: f32,
    pub font_family: String,
    pub color: String,
    pub text_align: TextAlign,
    pub bold: bool,
    pub italic: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            color: DEFAULT_COLOR.to_string(),
            text_align: TextAlign::Center,
            bold: false,
            italic: false,
        }
    }
}

impl TextStyle {
    /// Style given to newly added text fields.
    pub fn for_text() -> Self {
        Self {
            font_size: 48.0,
            ..Self::default()
        }
    }

    /// Style given to newly added date fields.
    pub fn for_date() -> Self {
        Self {
            font_size: 18.0,
            color: "#4a4a4a".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Image,
    Qr,
    Barcode,
    Signature,
}

/// Per-kind properties of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldBody {
    Text {
        #[serde(default)]
        style: TextStyle,
    },
    Date {
        #[serde(default)]
        style: TextStyle,
        /// strftime pattern; the configured default applies when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Image {
        #[serde(default)]
        size: Size,
    },
    Qr {
        #[serde(default)]
        size: Size,
    },
    // Declared by the editor but never drawn.
    Barcode {},
    Signature {},
}

impl FieldBody {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldBody::Text { .. } => FieldKind::Text,
            FieldBody::Date { .. } => FieldKind::Date,
            FieldBody::Image { .. } => FieldKind::Image,
            FieldBody::Qr { .. } => FieldKind::Qr,
            FieldBody::Barcode {} => FieldKind::Barcode,
            FieldBody::Signature {} => FieldKind::Signature,
        }
    }

    pub fn defaults_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldBody::Text {
                style: TextStyle::for_text(),
            },
            FieldKind::Date => FieldBody::Date {
                style: TextStyle::for_date(),
                format: None,
            },
            FieldKind::Image => FieldBody::Image {
                size: Size::default(),
            },
            FieldKind::Qr => FieldBody::Qr {
                size: Size::default(),
            },
            FieldKind::Barcode => FieldBody::Barcode {},
            FieldKind::Signature => FieldBody::Signature {},
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(flatten)]
    pub body: FieldBody,
}

impl Field {
    pub fn kind(&self) -> FieldKind {
        self.body.kind()
    }

    pub fn takes_input(&self) -> bool {
        matches!(
            self.body,
            FieldBody::Text { .. } | FieldBody::Date { .. } | FieldBody::Image { .. }
        )
    }

    /// Placeholder drawn when a text field has neither value nor default.
    pub fn placeholder(&self) -> String {
        format!("[{}]", self.name)
    }
}

// ============================================================================
// Rows and Results
// ============================================================================

/// One recipient's values, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRow(pub BTreeMap<String, String>);

impl DataRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field_id, value);
        self
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field_id.into(), value.into());
    }

    /// Non-empty value for a field; empty strings count as absent.
    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.0
            .get(field_id)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResult {
    pub id: String,
    pub name: String,
    #[serde(rename = "datasetEntryIndex")]
    pub row_index: usize,
    #[serde(rename = "dataUrl", with = "crate::decode::png_data_url")]
    pub png: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<String>,
    #[serde(
        rename = "qrDataUrl",
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::decode::optional_png_data_url"
    )]
    pub qr_png: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBatch {
    pub id: String,
    pub template_id: String,
    pub template_name: String,
    pub assets: Vec<GeneratedResult>,
    pub created_at: DateTime<Utc>,
}

impl AssetBatch {
    pub fn new(template: &Template, assets: Vec<GeneratedResult>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("batch_{}", now.timestamp_millis()),
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            assets,
            created_at: now,
        }
    }
}
