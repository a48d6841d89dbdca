//! Capture preprocessing for tribe-log OCR.
//!
//! A [`Pipeline`] turns a raw RGB capture into a high-contrast binary image
//! (black text on white) using the knobs of a named [`Profile`]. Profiles
//! live in a JSON document managed by a [`ProfileStore`].

pub mod debug;
pub mod error;
pub mod preprocessing;
pub mod profile;
pub mod raster;

pub use error::PrepError;
pub use preprocessing::{Binarizer, Pipeline, PipelineResult, StepTiming};
pub use profile::{InitOptions, Profile, ProfileEvent, ProfileStore};
pub use raster::RasterImage;
