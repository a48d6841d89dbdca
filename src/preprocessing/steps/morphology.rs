use crate::profile::{MorphKernel, Profile};
use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};

/// Close settings: ink is grown `dilate` times then shrunk `erode` times
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseParams {
    pub kernel: MorphKernel,
    pub dilate: u8,
    pub erode: u8,
}

impl From<&Profile> for CloseParams {
    fn from(profile: &Profile) -> Self {
        Self {
            kernel: profile.morph_kernel,
            dilate: profile.morph_dilate.clamp(0, u8::MAX as i32) as u8,
            erode: profile.morph_erode.clamp(0, u8::MAX as i32) as u8,
        }
    }
}

/// A radius-k ball in the L1 norm is k iterations of the 3x3 cross, in the
/// L-infinity norm k iterations of the 3x3 square.
fn norm(kernel: MorphKernel) -> Norm {
    match kernel {
        MorphKernel::Cross => Norm::L1,
        MorphKernel::Square => Norm::LInf,
    }
}

/// Morphological close of the ink (0 pixels) in a binary image.
///
/// Growing ink is eroding paper and vice versa, so the close of the ink is
/// an erode-then-dilate of the 255 pixels. Bridges broken strokes without
/// growing isolated specks past the structuring element.
pub fn close(binary: &GrayImage, params: &CloseParams) -> GrayImage {
    let norm = norm(params.kernel);

    let grown = if params.dilate > 0 {
        erode(binary, norm, params.dilate)
    } else {
        binary.clone()
    };

    if params.erode > 0 {
        dilate(&grown, norm, params.erode)
    } else {
        grown
    }
}
