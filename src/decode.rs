//! Image reference resolution.
//!
//! A reference is a `data:` URL, an `http(s)://` URL or a filesystem path.
//! Decoding is a plain call returning `Result`, so a caller always holds the
//! decoded raster (or the failure) before it draws anything that depends on it.

use crate::error::{AppError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::{Cursor, Read};
use std::path::Path;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Turns an image reference into a decoded raster.
pub trait ImageDecoder {
    fn decode(&self, reference: &str) -> Result<DynamicImage>;
}

/// Resolves data URLs, http(s) URLs and file paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDecoder;

impl ImageDecoder for DefaultDecoder {
    fn decode(&self, reference: &str) -> Result<DynamicImage> {
        let bytes = load_bytes(reference)?;
        image::load_from_memory(&bytes)
            .map_err(|e| AppError::Decode(format!("{}: {}", describe(reference), e)))
    }
}

/// Raw bytes behind an image reference.
pub fn load_bytes(reference: &str) -> Result<Vec<u8>> {
    if reference.starts_with("data:") {
        decode_data_url(reference)
    } else if reference.starts_with("http://") || reference.starts_with("https://") {
        let response = ureq::get(reference)
            .call()
            .map_err(|e| AppError::Decode(format!("Failed to fetch URL: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::Decode(format!("Failed to read response: {}", e)))?;
        Ok(bytes)
    } else {
        std::fs::read(reference).map_err(|e| AppError::Decode(format!("{}: {}", reference, e)))
    }
}

/// Bytes carried by a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| AppError::Decode("data URL has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(AppError::Decode(format!(
            "unsupported data URL encoding: {}",
            header
        )));
    }
    BASE64
        .decode(payload.trim())
        .map_err(|e| AppError::Decode(format!("invalid base64 payload: {}", e)))
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Read an image file into a data URL, typing it from the extension.
pub fn file_to_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Input(format!("{}: {}", path.display(), e)))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(to_data_url(mime.essence_str(), &bytes))
}

/// Turns a finished raster into file bytes.
pub trait ImageEncoder {
    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        encode_png(image)
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AppError::Encode(e.to_string()))?;
    Ok(bytes)
}

// Keep log lines short when the reference is an inline payload.
fn describe(reference: &str) -> &str {
    if reference.starts_with("data:") {
        reference.split(',').next().unwrap_or("data URL")
    } else {
        reference
    }
}

/// Serde adapter storing PNG bytes as a `data:image/png;base64,` string.
pub mod png_data_url {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_data_url("image/png", bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let url = String::deserialize(deserializer)?;
        if !url.starts_with(PNG_DATA_URL_PREFIX) {
            return Err(serde::de::Error::custom("expected a PNG data URL"));
        }
        decode_data_url(&url).map_err(serde::de::Error::custom)
    }
}

pub mod optional_png_data_url {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&to_data_url("image/png", bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(url) => decode_data_url(&url)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
