use std::path::Path;

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::error::{ReelError, ReelResult};

/// Decode encoded image bytes into straight RGBA8.
///
/// The container format is sniffed from the bytes, so file extensions do not matter.
pub fn decode_image(bytes: &[u8]) -> ReelResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(ReelError::validation("decoded image has zero width or height"));
    }
    Ok(rgba)
}

/// Read and decode the source image at `path`.
///
/// Every failure (missing file, unreadable file, unsupported or corrupt data) is reported as
/// [`ReelError::ImageLoad`] naming `path`.
#[tracing::instrument]
pub fn load_source_image(path: &Path) -> ReelResult<RgbaImage> {
    let bytes = std::fs::read(path).map_err(|e| ReelError::image_load(path, e.to_string()))?;
    let img = decode_image(&bytes).map_err(|e| ReelError::image_load(path, format!("{e:#}")))?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        "decoded source image"
    );
    Ok(img)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
