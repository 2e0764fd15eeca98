pub mod preprocess;
pub mod features;
pub mod classifier;
pub mod mapping;
pub mod detector;
pub mod service;
pub mod error;
pub mod logging;
pub mod helpers;
pub mod cli;

pub use crate::preprocess::{Decoded, PreprocessConfig, Processor, RasterImage, ResampleFilter, RASTER_SIZE};
pub use crate::features::{extract_features, FeatureVector};
pub use crate::classifier::{classify, Classification, NormalizedFeatures, RULES};
pub use crate::mapping::{load_catalog, DiseaseCatalog, DiseaseLabel, DiseaseProfile, Severity};
pub use crate::detector::{DecodePolicy, DetectionResult, Detector, DetectorConfig};
pub use crate::service::{DiagnosisService, ErrorBody, ServiceConfig, Upload, MAX_UPLOAD_BYTES};
pub use crate::error::{CatalogError, DecodeError, DetectError, ServiceError, UploadError};
pub use crate::cli::Args;
