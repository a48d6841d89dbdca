use crate::profile::Profile;
use image::RgbImage;

/// Histogram-driven highlight compression settings.
///
/// The defaults were tuned by eye on overexposed captures and have no
/// derivation behind them; they are profile knobs so they can be recalibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapParams {
    /// Compress when the 95th percentile of max(R,G,B) exceeds this
    pub p95_limit: u8,
    /// Where the 95th percentile lands after compression
    pub target: u8,
    /// Apply gamma when mean channel brightness exceeds this
    pub mean_limit: u8,
    pub gamma: f64,
}

impl Default for ToneMapParams {
    fn default() -> Self {
        Self {
            p95_limit: 235,
            target: 220,
            mean_limit: 160,
            gamma: 1.3,
        }
    }
}

impl From<&Profile> for ToneMapParams {
    fn from(profile: &Profile) -> Self {
        Self {
            p95_limit: profile.tone_map_p95_limit.clamp(0, 255) as u8,
            target: profile.tone_map_target.clamp(1, 255) as u8,
            mean_limit: profile.tone_map_mean_limit.clamp(0, 255) as u8,
            gamma: profile.tone_map_gamma,
        }
    }
}

/// Brightness statistics of a capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneStats {
    /// Value below which 95% of per-pixel max(R,G,B) samples fall
    pub p95: u8,
    /// Mean over every channel of every pixel
    pub mean: f64,
}

/// Scale and gamma chosen for a capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneCurve {
    pub scale: f64,
    pub gamma: f64,
}

impl ToneCurve {
    pub fn is_identity(&self) -> bool {
        (self.scale - 1.0).abs() < 0.01 && (self.gamma - 1.0).abs() < 0.01
    }

    /// `lut[i] = round(255 * min(1, i/255 * scale)^gamma)`
    pub fn lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            let x = (i as f64 / 255.0 * self.scale).min(1.0);
            *entry = (255.0 * x.powf(self.gamma)).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

pub fn analyze(image: &RgbImage) -> ToneStats {
    let mut hist = [0u64; 256];
    let mut channel_sum = 0u64;

    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        hist[r.max(g).max(b) as usize] += 1;
        channel_sum += r as u64 + g as u64 + b as u64;
    }

    let samples = image.width() as u64 * image.height() as u64;
    let mean = if samples == 0 {
        0.0
    } else {
        channel_sum as f64 / (samples * 3) as f64
    };

    let needed = (samples as f64 * 0.95).ceil() as u64;
    let mut cumulative = 0u64;
    let mut p95 = 255u8;
    for (value, &count) in hist.iter().enumerate() {
        cumulative += count;
        if cumulative >= needed {
            p95 = value as u8;
            break;
        }
    }

    ToneStats { p95, mean }
}

pub fn curve(stats: &ToneStats, params: &ToneMapParams) -> ToneCurve {
    let scale = if stats.p95 > params.p95_limit {
        params.target as f64 / stats.p95 as f64
    } else {
        1.0
    };
    let gamma = if stats.mean > params.mean_limit as f64 {
        params.gamma
    } else {
        1.0
    };
    ToneCurve { scale, gamma }
}

/// Compress blown highlights. Well-exposed input comes back untouched.
pub fn apply(image: RgbImage, params: &ToneMapParams) -> RgbImage {
    let stats = analyze(&image);
    let curve = curve(&stats, params);
    tracing::debug!(
        "Tone map: p95={} mean={:.1} scale={:.3} gamma={:.2}",
        stats.p95,
        stats.mean,
        curve.scale,
        curve.gamma
    );

    if curve.is_identity() {
        return image;
    }

    let lut = curve.lut();
    let mut mapped = image;
    for value in mapped.iter_mut() {
        *value = lut[*value as usize];
    }
    mapped
}
