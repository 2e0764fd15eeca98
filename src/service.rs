use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info};

use crate::detector::{DetectionResult, Detector};
use crate::error::{DetectError, ServiceError, UploadError};

/// Upload size cap enforced before any decoding happens.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_upload_bytes: usize,
    /// Deadline for answering a single request. It bounds the response only:
    /// a blocking task that overruns keeps running and its result is dropped.
    pub decode_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            decode_timeout: Duration::from_secs(5),
        }
    }
}

/// A file handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }
}

/// `{ "error": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(e: &ServiceError) -> Self {
        Self { error: e.to_string() }
    }
}

pub fn validate_upload(upload: Option<Upload>, max_bytes: usize) -> Result<Upload, UploadError> {
    let upload = upload.ok_or(UploadError::Missing)?;
    if !upload.content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(UploadError::NotAnImage);
    }
    if upload.bytes.len() > max_bytes {
        return Err(UploadError::TooLarge {
            size: upload.bytes.len(),
            limit: max_bytes,
        });
    }
    Ok(upload)
}

/// Async front of the detector. Each request runs on the blocking pool; the
/// detector itself is shared read-only.
#[derive(Debug, Clone)]
pub struct DiagnosisService {
    detector: Arc<Detector>,
    config: ServiceConfig,
}

impl DiagnosisService {
    pub fn new(detector: Arc<Detector>, config: ServiceConfig) -> Self {
        Self { detector, config }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub async fn diagnose(&self, upload: Option<Upload>) -> Result<DetectionResult, ServiceError> {
        let Upload { bytes, .. } = validate_upload(upload, self.config.max_upload_bytes)?;
        self.run(bytes).await
    }

    async fn run(&self, bytes: Vec<u8>) -> Result<DetectionResult, ServiceError> {
        let t = Instant::now();
        let detector = Arc::clone(&self.detector);
        let task = tokio::task::spawn_blocking(move || detector.diagnose(&bytes));

        let result = match tokio::time::timeout(self.config.decode_timeout, task).await {
            Err(_) => Err(ServiceError::Timeout(self.config.decode_timeout)),
            Ok(Err(join_error)) => Err(ServiceError::Detect(DetectError::Processing(join_error.to_string()))),
            Ok(Ok(result)) => result.map_err(ServiceError::from),
        };

        match &result {
            Ok(r) => info!(disease = %r.disease, confidence = r.confidence, elapsed = ?t.elapsed(), "diagnosis complete"),
            Err(e) => error!(error = %e, "diagnosis failed"),
        }
        result
    }

    /// Runs a request and renders the status code and JSON body the HTTP
    /// layer should send back.
    pub async fn handle(&self, upload: Option<Upload>) -> (u16, String) {
        let rendered = match self.diagnose(upload).await {
            Ok(result) => serde_json::to_string(&result).map(|body| (200, body)),
            Err(e) => serde_json::to_string(&ErrorBody::from(&e)).map(|body| (e.status_code(), body)),
        };
        rendered.unwrap_or_else(|e| {
            error!(error = %e, "failed to serialise response");
            (500, r#"{"error":"Failed to process image"}"#.to_string())
        })
    }
}

impl Default for DiagnosisService {
    fn default() -> Self {
        Self::new(Arc::new(Detector::default()), ServiceConfig::default())
    }
}
