use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Failed to access profile file {path:?}: {source}")]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed profile document: {0}")]
    ProfileFormat(#[from] serde_json::Error),

    #[error("Unknown profile knob: {0}")]
    UnknownKnob(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidKnobValue { key: String, value: String },

    #[error("Image I/O failed: {0}")]
    ImageIo(#[from] image::ImageError),

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PrepError {
    pub(crate) fn profile_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::ProfileIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::Io {
            path: path.into(),
            source,
        }
    }
}
