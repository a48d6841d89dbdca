//! Owned 3-channel raster passed between the capture side, the pipeline and
//! the recognition engine.

use crate::error::PrepError;
use image::{GrayImage, RgbImage};

/// Channels per pixel (R, G, B)
pub const CHANNELS: usize = 3;

/// Row-major, tightly packed RGB buffer.
///
/// The constructor is the only place the `width * height * CHANNELS`
/// invariant is checked; every stage can index the buffer without
/// re-validating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PrepError> {
        if width == 0 || height == 0 {
            return Err(PrepError::InvalidImage(format!(
                "zero dimension ({}x{})",
                width, height
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or_else(|| {
                PrepError::InvalidImage(format!("dimensions overflow ({}x{})", width, height))
            })?;

        if data.len() != expected {
            return Err(PrepError::InvalidImage(format!(
                "buffer length {} does not match {}x{}x{} = {}",
                data.len(),
                width,
                height,
                CHANNELS,
                expected
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a raster by evaluating `f` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self, PrepError>
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Iterate pixels as `[r, g, b]` triples in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(CHANNELS)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Replicate a single-channel image into R=G=B
    pub fn from_gray(gray: &GrayImage) -> Result<Self, PrepError> {
        let data = gray
            .as_raw()
            .iter()
            .flat_map(|&v| [v, v, v])
            .collect::<Vec<_>>();
        Self::new(gray.width(), gray.height(), data)
    }

    pub fn from_rgb_image(img: RgbImage) -> Result<Self, PrepError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage, PrepError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            PrepError::PreprocessingError("raster buffer rejected by image crate".to_string())
        })
    }

    /// True when every pixel is 0 or 255 with R=G=B
    pub fn is_binary(&self) -> bool {
        self.pixels()
            .all(|p| p[0] == p[1] && p[1] == p[2] && (p[0] == 0 || p[0] == 255))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_rejects_zero_dimensions() {
        let err = RasterImage::new(0, 10, vec![]).unwrap_err();
        assert!(matches!(err, PrepError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        let err = RasterImage::new(4, 4, vec![0; 4 * 4 * 3 - 1]).unwrap_err();
        assert!(matches!(err, PrepError::InvalidImage(_)));
    }

    #[test]
    fn test_gray_replicates_channels() {
        let gray = GrayImage::from_pixel(3, 2, Luma([77]));
        let raster = RasterImage::from_gray(&gray).unwrap();
        assert_eq!(raster.dimensions(), (3, 2));
        assert!(raster.pixels().all(|p| p == [77, 77, 77]));
    }

    #[test]
    fn test_is_binary() {
        let raster = RasterImage::from_fn(4, 1, |x, _| if x % 2 == 0 { [0; 3] } else { [255; 3] })
            .unwrap();
        assert!(raster.is_binary());

        let raster = RasterImage::from_fn(1, 1, |_, _| [255, 0, 255]).unwrap();
        assert!(!raster.is_binary());
    }
}
