//! Named preprocessing profiles and their persistence
//!
//! A [`ProfileStore`] owns the profile document on disk. It reseeds from the
//! built-in defaults whenever their content hash changes between releases.

pub mod model;
pub mod set;
pub mod store;

pub use model::{BinarizerKind, KnobValue, MorphKernel, Profile, HDR, SDR};
pub use set::ProfileSet;
pub use store::{InitOptions, ProfileEvent, ProfileStore};
