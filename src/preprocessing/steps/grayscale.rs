use image::{GrayImage, Luma, RgbImage};

/// BT.709 luma, rounded to nearest
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.0722 * b as f32 + 0.7152 * g as f32 + 0.2126 * r as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// Convert to grayscale with BT.709 weights, which keep colored UI text
/// distinct from dark backgrounds better than a flat average
pub fn apply(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}
