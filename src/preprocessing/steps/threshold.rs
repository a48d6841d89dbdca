use super::integral::IntegralImage;
use crate::profile::{BinarizerKind, Profile};
use image::{GrayImage, Luma};

/// Threshold used when the histogram has a single populated class
const DEGENERATE_OTSU_THRESHOLD: u8 = 127;

/// Binarization algorithms. Every variant maps a grayscale image to a
/// strictly 0/255 image of the same size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binarizer {
    /// 255 where `intensity > local_mean - bias`
    AdaptiveMean { window: u32, bias: f64 },
    /// Single global threshold maximizing inter-class variance
    Otsu,
    /// 255 where `intensity > mean * (1 + k * (std_dev / r - 1))`
    Sauvola { window: u32, k: f64, r: f64 },
}

impl Binarizer {
    pub fn from_profile(profile: &Profile) -> Self {
        match profile.effective_binarizer() {
            BinarizerKind::Mean => Binarizer::AdaptiveMean {
                window: profile.adaptive_window as u32,
                bias: profile.adaptive_bias,
            },
            BinarizerKind::Sauvola => Binarizer::Sauvola {
                window: profile.sauvola_window as u32,
                k: profile.sauvola_k,
                r: profile.sauvola_r,
            },
            BinarizerKind::Otsu => Binarizer::Otsu,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Binarizer::AdaptiveMean { .. } => "adaptive_mean",
            Binarizer::Otsu => "otsu",
            Binarizer::Sauvola { .. } => "sauvola",
        }
    }

    pub fn apply(&self, gray: &GrayImage) -> GrayImage {
        match *self {
            Binarizer::AdaptiveMean { window, bias } => adaptive_mean(gray, window, bias),
            Binarizer::Otsu => otsu(gray),
            Binarizer::Sauvola { window, k, r } => sauvola(gray, window, k, r),
        }
    }
}

/// Local mean thresholding over a `(2r+1)^2` window via one integral image
pub fn adaptive_mean(gray: &GrayImage, window: u32, bias: f64) -> GrayImage {
    let radius = (window / 2) as usize;
    let integral = IntegralImage::new(gray);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let w = integral.window(x as usize, y as usize, radius);
        let mean = integral.sum(w) as f64 / w.area() as f64;
        let pixel = gray.get_pixel(x, y).0[0] as f64;
        binary(pixel > mean - bias)
    })
}

/// Sauvola adaptive thresholding
///
/// For each pixel, threshold = mean * (1 + k * (std_dev / R - 1)), with the
/// window statistics taken from integral images of values and squares.
pub fn sauvola(gray: &GrayImage, window: u32, k: f64, r: f64) -> GrayImage {
    let radius = (window / 2) as usize;
    let integral = IntegralImage::with_squares(gray);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let (mean, std_dev) = integral.stats(integral.window(x as usize, y as usize, radius));
        let threshold = mean * (1.0 + k * (std_dev / r - 1.0));
        let pixel = gray.get_pixel(x, y).0[0] as f64;
        binary(pixel > threshold)
    })
}

/// Global Otsu thresholding; pixels above the threshold become 255
pub fn otsu(gray: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(&histogram(gray));
    tracing::debug!("Otsu threshold: {}", threshold);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        binary(gray.get_pixel(x, y).0[0] > threshold)
    })
}

pub fn histogram(gray: &GrayImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for pixel in gray.as_raw() {
        hist[*pixel as usize] += 1;
    }
    hist
}

/// Threshold maximizing between-class variance.
///
/// When a range of thresholds ties for the maximum (an empty gap between
/// two modes) the midpoint of that range is returned.
pub fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_b = 0.0;
    let mut sum_b = 0.0;
    let mut max_variance = 0.0;
    let mut first = None;
    let mut last = 0usize;

    for (t, &count) in hist.iter().enumerate() {
        weight_b += count as f64;
        if weight_b == 0.0 {
            continue;
        }
        let weight_f = total - weight_b;
        if weight_f == 0.0 {
            break;
        }

        sum_b += t as f64 * count as f64;
        let mean_b = sum_b / weight_b;
        let mean_f = (sum_total - sum_b) / weight_f;
        let variance = weight_b * weight_f * (mean_b - mean_f).powi(2);

        let tolerance = max_variance * 1e-12;
        if variance > max_variance + tolerance {
            max_variance = variance;
            first = Some(t);
            last = t;
        } else if first.is_some() && variance >= max_variance - tolerance {
            last = t;
        }
    }

    match first {
        Some(first) if max_variance > 0.0 => ((first + last) / 2) as u8,
        _ => DEGENERATE_OTSU_THRESHOLD,
    }
}

fn binary(foreground: bool) -> Luma<u8> {
    if foreground {
        Luma([255u8])
    } else {
        Luma([0u8])
    }
}
