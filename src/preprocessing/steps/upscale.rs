use crate::error::PrepError;
use image::{imageops::FilterType, RgbImage};

/// Largest supported integer factor
pub const MAX_FACTOR: u32 = 4;
/// Maximum output dimension to avoid memory issues
const MAX_DIMENSION: u32 = 16_384;

/// Integer-factor bicubic upscale so small glyphs survive recognition.
///
/// The factor is clamped to `1..=MAX_FACTOR` and lowered further if the
/// output would exceed `MAX_DIMENSION` on either side.
pub fn apply(image: RgbImage, factor: u32) -> Result<RgbImage, PrepError> {
    let (width, height) = image.dimensions();
    let mut factor = factor.clamp(1, MAX_FACTOR);

    while factor > 1 && (width * factor > MAX_DIMENSION || height * factor > MAX_DIMENSION) {
        factor -= 1;
    }

    if factor == 1 {
        return Ok(image);
    }

    tracing::debug!("Upscaling {}x{} by {}", width, height, factor);
    Ok(image::imageops::resize(
        &image,
        width * factor,
        height * factor,
        FilterType::CatmullRom,
    ))
}
