//! QR code generation.

use crate::error::{AppError, Result};
use image::{imageops, Luma, Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};

/// Smallest edge the encoder will produce; below this modules blur together.
pub const MIN_QR_SIZE: u32 = 21;

/// Light modules kept on each side of the code, at minimum.
const MIN_QUIET_MODULES: u32 = 2;

/// Encode `payload` into a square RGBA image exactly `size` pixels wide.
///
/// Every module is the same whole number of pixels; the leftover border is
/// white quiet zone around the centred code. Identical payloads always
/// produce identical images.
pub fn encode(payload: &str, size: u32) -> Result<RgbaImage> {
    let size = size.max(MIN_QR_SIZE);
    let (code, scale) = layout(payload, size)?;

    let modules = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(scale, scale)
        .build();
    let offset = ((size - modules.width()) / 2) as i64;

    let mut rgba = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));
    let code_rgba = RgbaImage::from_fn(modules.width(), modules.height(), |x, y| {
        let v = modules.get_pixel(x, y).0[0];
        Rgba([v, v, v, 255])
    });
    imageops::replace(&mut rgba, &code_rgba, offset, offset);
    Ok(rgba)
}

/// Pick the error correction level and pixels per module for `size`.
///
/// Medium correction is preferred; low correction is used when it lets
/// modules grow past a single pixel.
fn layout(payload: &str, size: u32) -> Result<(QrCode, u32)> {
    let mut fitted = None;
    let mut last_error = None;
    for level in [EcLevel::M, EcLevel::L] {
        match QrCode::with_error_correction_level(payload.as_bytes(), level) {
            Ok(code) => {
                let scale = module_scale(code.width() as u32, size);
                if scale >= 2 {
                    return Ok((code, scale));
                }
                fitted.get_or_insert((code, scale));
            }
            Err(e) => last_error = Some(e),
        }
    }

    match (fitted, last_error) {
        (Some((code, scale)), _) if code.width() as u32 * scale <= size => Ok((code, scale)),
        (Some((code, _)), _) => Err(AppError::Qr(format!(
            "{} modules do not fit in {}px",
            code.width(),
            size
        ))),
        (None, Some(e)) => Err(AppError::Qr(e.to_string())),
        (None, None) => Err(AppError::Qr("no QR layout".to_string())),
    }
}

fn module_scale(modules: u32, size: u32) -> u32 {
    (size / (modules + 2 * MIN_QUIET_MODULES)).max(1)
}

/// Verification code carried by the QR field of one generated asset.
///
/// Combines a namespace prefix, the 1-based row number and the batch start
/// time so no two assets share a code.
pub fn verification_payload(prefix: &str, row_index: usize, batch_millis: i64) -> String {
    format!("{}-{}-{}", prefix, row_index + 1, batch_millis)
}
