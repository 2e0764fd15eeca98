use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{debug, error, warn};

use crate::classifier::{classify, Classification};
use crate::error::{DetectError, Result};
use crate::features::{extract_features, FeatureVector};
use crate::mapping::{DiseaseCatalog, DiseaseLabel, Severity};
use crate::preprocess::{Decoded, PreprocessConfig, Processor};

/// What to do when the input bytes are not a decodable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DecodePolicy {
    /// Classify the all-zero feature vector, which lands on Healthy Leaf at 0.5.
    #[default]
    Fallback,
    /// Report the decode failure to the caller.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    pub preprocess: PreprocessConfig,
    pub decode_policy: DecodePolicy,
}

/// A finished diagnosis, serialised in the shape the upload endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub disease: DiseaseLabel,
    pub confidence: f64,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
    pub severity: Severity,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl DetectionResult {
    /// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T09:30:00.000Z`.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn serialize_timestamp<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Bytes in, diagnosis out. Holds no per-request state, so one instance can
/// be shared across threads.
#[derive(Debug, Clone)]
pub struct Detector {
    processor: Processor,
    catalog: Arc<DiseaseCatalog>,
    decode_policy: DecodePolicy,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectorConfig::default(), Arc::new(DiseaseCatalog::builtin()))
    }
}

impl Detector {
    pub fn new(config: DetectorConfig, catalog: Arc<DiseaseCatalog>) -> Self {
        Self {
            processor: Processor::new(config.preprocess),
            catalog,
            decode_policy: config.decode_policy,
        }
    }

    pub fn catalog(&self) -> &DiseaseCatalog {
        &self.catalog
    }

    pub fn decode_policy(&self) -> DecodePolicy {
        self.decode_policy
    }

    /// Decodes and measures the image, applying the decode policy on failure.
    pub fn extract(&self, bytes: &[u8]) -> Result<FeatureVector> {
        match self.processor.decode(bytes) {
            Decoded::Ok(raster) => {
                let t = Instant::now();
                let features = extract_features(&raster);
                debug!(?features, elapsed = ?t.elapsed(), "extracted features");
                Ok(features)
            }
            Decoded::Failed(e) => match self.decode_policy {
                DecodePolicy::Fallback => {
                    warn!(error = %e, "image could not be decoded, using zero features");
                    Ok(FeatureVector::ZERO)
                }
                DecodePolicy::Reject => Err(DetectError::Decode(e)),
            },
        }
    }

    pub fn diagnose(&self, bytes: &[u8]) -> Result<DetectionResult> {
        let features = self.extract(bytes)?;
        self.diagnose_features(&features)
    }

    /// Classifies an already computed feature vector and attaches the
    /// catalog profile.
    pub fn diagnose_features(&self, features: &FeatureVector) -> Result<DetectionResult> {
        let Classification { label, confidence } = classify(features);
        let profile = self.catalog.lookup(label).map_err(|e| {
            error!(error = %e, "classifier produced a label outside the catalog");
            DetectError::Processing(e.to_string())
        })?;

        let confidence = confidence.min(profile.base_confidence);
        debug!(disease = %label, confidence, "classified");

        Ok(DetectionResult {
            disease: label,
            confidence,
            treatment: profile.treatment.clone(),
            prevention: profile.prevention.clone(),
            severity: profile.severity,
            timestamp: Utc::now(),
        })
    }

    /// Diagnoses each image independently on the rayon pool. Output order
    /// matches input order.
    pub fn diagnose_batch<B: AsRef<[u8]> + Sync>(&self, images: &[B]) -> Vec<Result<DetectionResult>> {
        images.par_iter().map(|bytes| self.diagnose(bytes.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DiseaseProfile;

    fn healthy_only() -> Arc<DiseaseCatalog> {
        let builtin = DiseaseCatalog::builtin();
        let profile: DiseaseProfile = builtin.lookup(DiseaseLabel::HealthyLeaf).unwrap().clone();
        Arc::new(DiseaseCatalog::from_profiles([(DiseaseLabel::HealthyLeaf, profile)]))
    }

    #[test]
    fn undecodable_bytes_fall_back_to_healthy() {
        let detector = Detector::default();
        let result = detector.diagnose(b"<html>not an image</html>").unwrap();
        assert_eq!(result.disease, DiseaseLabel::HealthyLeaf);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.severity, Severity::Low);
    }

    #[test]
    fn reject_policy_surfaces_decode_errors() {
        let config = DetectorConfig {
            decode_policy: DecodePolicy::Reject,
            ..Default::default()
        };
        let detector = Detector::new(config, Arc::new(DiseaseCatalog::builtin()));
        assert!(matches!(detector.diagnose(b"garbage"), Err(DetectError::Decode(_))));
    }

    #[test]
    fn confidence_is_capped_by_catalog() {
        // Late Blight computes 0.99 but the catalog caps it at 0.88.
        let detector = Detector::default();
        let result = detector
            .diagnose_features(&FeatureVector::new(0.0, 150.0, 150.0, 200.0))
            .unwrap();
        assert_eq!(result.disease, DiseaseLabel::LateBlight);
        assert_eq!(result.confidence, 0.88);
        assert_eq!(result.severity, Severity::High);
    }

    #[test]
    fn green_override_reaches_high_confidence() {
        let detector = Detector::default();
        let result = detector
            .diagnose_features(&FeatureVector::new(1.0, 0.2, 0.2, 0.1))
            .unwrap();
        assert_eq!(result.disease, DiseaseLabel::HealthyLeaf);
        assert!(result.confidence >= 0.85);
        assert!(result.confidence <= 0.92);
        assert_eq!(result.severity, Severity::Low);
    }

    #[test]
    fn missing_profile_is_a_processing_error() {
        let detector = Detector::new(DetectorConfig::default(), healthy_only());
        let err = detector
            .diagnose_features(&FeatureVector::new(0.0, 150.0, 150.0, 200.0))
            .unwrap_err();
        match err {
            DetectError::Processing(msg) => assert!(msg.contains("Late Blight"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        // The zero vector still resolves because Healthy Leaf is present.
        assert!(detector.diagnose_features(&FeatureVector::ZERO).is_ok());
    }

    #[test]
    fn result_serializes_to_the_wire_shape() {
        let detector = Detector::default();
        let result = detector.diagnose_features(&FeatureVector::ZERO).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        let object = json.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["confidence", "disease", "prevention", "severity", "timestamp", "treatment"]);
        assert_eq!(json["disease"], "Healthy Leaf");
        assert_eq!(json["severity"], "low");
        assert_eq!(json["confidence"], 0.5);

        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'), "{timestamp}");
        assert_eq!(timestamp, result.timestamp_iso());
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn batch_preserves_order() {
        let detector = Detector::default();
        let inputs: Vec<Vec<u8>> = vec![b"one".to_vec(), Vec::new(), b"three".to_vec()];
        let results = detector.diagnose_batch(&inputs);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r, Ok(d) if d.disease == DiseaseLabel::HealthyLeaf)));
    }
}
