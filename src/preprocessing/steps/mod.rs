//! Individual preprocessing steps

pub mod grayscale;
pub mod integral;
pub mod levels;
pub mod morphology;
pub mod sharpen;
pub mod text_mask;
pub mod threshold;
pub mod tone_map;
pub mod upscale;
