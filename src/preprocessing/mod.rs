//! Image preprocessing for tribe-log OCR
//!
//! Turns a raw capture into a binary image for the recognition engine.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PipelineResult, StepTiming};
pub use steps::threshold::Binarizer;
