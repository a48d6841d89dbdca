use crate::profile::Profile;
use image::GrayImage;

/// Mean below which a capture is treated as light text on a dark background
const DARK_BACKGROUND_MEAN: f64 = 128.0;

/// Tone adjustments applied to the grayscale image before binarization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelsParams {
    /// Contrast multiplier around mid-gray
    pub contrast: f64,
    pub gamma: f64,
    /// Flip light-on-dark captures so text ends up dark on light
    pub auto_polarity: bool,
    /// Unconditional flip after the automatic one
    pub invert: bool,
}

impl From<&Profile> for LevelsParams {
    fn from(profile: &Profile) -> Self {
        Self {
            contrast: profile.contrast,
            gamma: profile.gamma,
            auto_polarity: profile.auto_polarity,
            invert: profile.invert,
        }
    }
}

/// Contrast + gamma through a single LUT, then polarity.
///
/// The binarizers and morphology expect dark ink on a light background;
/// the recognition engine wants the same.
pub fn apply(gray: GrayImage, params: &LevelsParams) -> GrayImage {
    let mut out = gray;

    let lut = build_lut(params.contrast, params.gamma);
    if lut.iter().enumerate().any(|(i, &v)| v as usize != i) {
        for value in out.iter_mut() {
            *value = lut[*value as usize];
        }
    }

    let mut flip = params.invert;
    if params.auto_polarity && mean(&out) < DARK_BACKGROUND_MEAN {
        tracing::debug!("Dark background detected, inverting");
        flip = !flip;
    }
    if flip {
        image::imageops::invert(&mut out);
    }

    out
}

/// `v' = 255 * (clamp((v - 128) * contrast + 128) / 255)^(1 / gamma)`
fn build_lut(contrast: f64, gamma: f64) -> [u8; 256] {
    let inv_gamma = if gamma > 0.0 { 1.0 / gamma } else { 1.0 };
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let stretched = ((i as f64 - 128.0) * contrast + 128.0).clamp(0.0, 255.0);
        let corrected = 255.0 * (stretched / 255.0).powf(inv_gamma);
        *entry = corrected.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn mean(gray: &GrayImage) -> f64 {
    let raw = gray.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|&v| v as u64).sum::<u64>() as f64 / raw.len() as f64
}
