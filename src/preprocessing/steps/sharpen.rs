use image::GrayImage;
use imageproc::filter::filter3x3;

/// Center weight 5, four neighbors -1 each
const KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Laplacian-based sharpening.
///
/// The one-pixel border keeps its original values; captured crops already
/// carry a margin, so edge handling there does not matter.
pub fn apply(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return gray.clone();
    }

    let mut sharpened: GrayImage = filter3x3(gray, &KERNEL);

    for x in 0..width {
        sharpened.put_pixel(x, 0, *gray.get_pixel(x, 0));
        sharpened.put_pixel(x, height - 1, *gray.get_pixel(x, height - 1));
    }
    for y in 0..height {
        sharpened.put_pixel(0, y, *gray.get_pixel(0, y));
        sharpened.put_pixel(width - 1, y, *gray.get_pixel(width - 1, y));
    }

    sharpened
}
