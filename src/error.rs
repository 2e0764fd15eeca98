//! Error types for the diagnosis pipeline.
//!
//! Each stage owns a small `thiserror` enum; the orchestrator folds them into
//! [`DetectError`], which is what callers of the library see.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::mapping::DiseaseLabel;

/// The input bytes could not be turned into a raster.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty image buffer")]
    Empty,

    #[error("unrecognised image data: {0}")]
    Format(#[from] image::ImageError),

    #[error("resampling failed: {0}")]
    Resize(String),
}

/// Failures while building or querying the disease catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The classifier produced a label the catalog has no profile for.
    #[error("Unknown disease detected: {0}")]
    UnknownLabel(DiseaseLabel),

    #[error("catalog is missing a profile for '{0}'")]
    MissingProfile(DiseaseLabel),

    #[error("base confidence {1} for '{0}' is outside [0.5, 0.99]")]
    InvalidConfidence(DiseaseLabel, f64),

    #[error("failed to read catalog '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::Detector::diagnose`].
#[derive(Error, Debug)]
pub enum DetectError {
    /// Only produced under [`crate::DecodePolicy::Reject`].
    #[error("Invalid image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to process image: {0}")]
    Processing(String),
}

/// Rejections raised at the upload boundary, before the core runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("No image file provided")]
    Missing,

    #[error("File must be an image")]
    NotAnImage,

    #[error("Image exceeds the {limit} byte upload limit ({size} bytes)")]
    TooLarge { size: usize, limit: usize },
}

/// Everything the upload boundary can report back to the transport layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("Image processing timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    /// HTTP status the transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Upload(UploadError::TooLarge { .. }) => 413,
            ServiceError::Upload(_) | ServiceError::Detect(DetectError::Decode(_)) => 400,
            ServiceError::Detect(_) => 500,
            ServiceError::Timeout(_) => 504,
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
