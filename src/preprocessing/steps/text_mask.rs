use crate::error::PrepError;
use crate::profile::Profile;
use image::{GrayImage, Luma, RgbImage};

/// Saturation/value cut-offs, all in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvThresholds {
    pub sat_color: f32,
    pub val_color: f32,
    pub sat_gray: f32,
    pub val_gray: f32,
}

impl From<&Profile> for HsvThresholds {
    fn from(profile: &Profile) -> Self {
        Self {
            sat_color: profile.hsv_sat_color as f32,
            val_color: profile.hsv_val_color as f32,
            sat_gray: profile.hsv_sat_gray as f32,
            val_gray: profile.hsv_val_gray as f32,
        }
    }
}

impl HsvThresholds {
    /// Saturated and bright (colored text) or neutral and bright (gray
    /// timestamps)
    pub fn is_text(&self, saturation: f32, value: f32) -> bool {
        (saturation >= self.sat_color && value >= self.val_color)
            || (saturation <= self.sat_gray && value >= self.val_gray)
    }
}

/// RGB to (hue degrees, saturation, value)
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    let hue = if chroma == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / chroma + 2.0)
    } else {
        60.0 * ((r - g) / chroma + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { chroma / max };

    (hue, saturation, max)
}

/// Binary mask, 255 where a pixel looks like text
pub fn build(image: &RgbImage, thresholds: &HsvThresholds) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let (_, s, v) = rgb_to_hsv(r, g, b);
        if thresholds.is_text(s, v) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Zero grayscale pixels the mask marks as background
pub fn apply_mask(gray: GrayImage, mask: &GrayImage) -> Result<GrayImage, PrepError> {
    if gray.dimensions() != mask.dimensions() {
        return Err(PrepError::PreprocessingError(format!(
            "mask is {:?} but image is {:?}",
            mask.dimensions(),
            gray.dimensions()
        )));
    }

    let mut masked = gray;
    for (value, keep) in masked.iter_mut().zip(mask.iter()) {
        if *keep == 0 {
            *value = 0;
        }
    }
    Ok(masked)
}
