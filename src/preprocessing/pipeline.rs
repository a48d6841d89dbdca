use crate::error::PrepError;
use crate::profile::Profile;
use crate::raster::RasterImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;
use super::steps::levels::LevelsParams;
use super::steps::morphology::CloseParams;
use super::steps::text_mask::HsvThresholds;
use super::steps::threshold::Binarizer;
use super::steps::tone_map::ToneMapParams;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Binary output (not serialized)
    #[serde(skip)]
    pub image: RasterImage,
    /// Tone-mapped capture, kept only when intermediates are requested
    #[serde(skip)]
    pub tone_mapped: Option<RasterImage>,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Binarization algorithm used
    pub binarizer: String,
    pub width: u32,
    pub height: u32,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Stateless capture-to-binary pipeline.
///
/// Stages run in a fixed order, each switched and parameterized by the
/// profile: upscale, tone map, text mask, grayscale, apply mask, levels,
/// binarize, close, sharpen. Every stage allocates its own output, so
/// independent calls can run on separate threads.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    keep_intermediates: bool,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the tone-mapped raster in the result for debug export
    pub fn with_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    /// Validate a raw buffer and process it
    pub fn process_raw(
        &self,
        width: u32,
        height: u32,
        data: Vec<u8>,
        profile: &Profile,
    ) -> Result<PipelineResult, PrepError> {
        let raster = RasterImage::new(width, height, data)?;
        self.process(&raster, profile)
    }

    /// Process a capture with the given profile
    pub fn process(
        &self,
        input: &RasterImage,
        profile: &Profile,
    ) -> Result<PipelineResult, PrepError> {
        // Snapshot: nothing the caller does to its profile afterwards matters
        let profile = profile.clone().sanitized();
        let start = Instant::now();
        let mut timings = Vec::new();

        let rgb = input.to_rgb_image()?;

        let rgb = self.run_step("upscale", rgb, &mut timings, |img| {
            steps::upscale::apply(img, profile.upscale as u32)
        })?;

        let rgb = if profile.tone_map {
            let params = ToneMapParams::from(&profile);
            self.run_step("tone_map", rgb, &mut timings, |img| {
                Ok(steps::tone_map::apply(img, &params))
            })?
        } else {
            rgb
        };

        let tone_mapped = if self.keep_intermediates {
            Some(RasterImage::from_rgb_image(rgb.clone())?)
        } else {
            None
        };

        let mask = if profile.hsv_mask {
            let thresholds = HsvThresholds::from(&profile);
            Some(self.run_step("text_mask", &rgb, &mut timings, |img| {
                Ok(steps::text_mask::build(img, &thresholds))
            })?)
        } else {
            None
        };

        let mut gray = self.run_step("grayscale", &rgb, &mut timings, |img| {
            Ok(steps::grayscale::apply(img))
        })?;
        drop(rgb);

        if let Some(mask) = mask {
            gray = self.run_step("apply_mask", gray, &mut timings, |g| {
                steps::text_mask::apply_mask(g, &mask)
            })?;
        }

        let levels = LevelsParams::from(&profile);
        gray = self.run_step("levels", gray, &mut timings, |g| {
            Ok(steps::levels::apply(g, &levels))
        })?;

        let binarizer = Binarizer::from_profile(&profile);
        let mut binary = self.run_step("binarize", &gray, &mut timings, |g| {
            Ok(binarizer.apply(g))
        })?;

        if profile.morph {
            let params = CloseParams::from(&profile);
            binary = self.run_step("close", &binary, &mut timings, |b| {
                Ok(steps::morphology::close(b, &params))
            })?;
        }

        if profile.sharpen {
            binary = self.run_step("sharpen", &binary, &mut timings, |b| {
                Ok(steps::sharpen::apply(b))
            })?;
        }

        let image = RasterImage::from_gray(&binary)?;
        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Preprocessed {}x{} -> {}x{} with {} in {}ms",
            input.width(),
            input.height(),
            image.width(),
            image.height(),
            binarizer.name(),
            total_time_ms
        );

        Ok(PipelineResult {
            width: image.width(),
            height: image.height(),
            image,
            tone_mapped,
            total_time_ms,
            binarizer: binarizer.name().to_string(),
            steps: timings,
        })
    }

    fn run_step<I, O, F>(
        &self,
        name: &str,
        input: I,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<O, PrepError>
    where
        F: FnOnce(I) -> Result<O, PrepError>,
    {
        let step_start = Instant::now();
        let result = step_fn(input)?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::trace!("Step {} took {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
