use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// The closed set of diagnoses the classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseLabel {
    #[serde(rename = "Early Blight")]
    EarlyBlight,
    #[serde(rename = "Late Blight")]
    LateBlight,
    #[serde(rename = "Powdery Mildew")]
    PowderyMildew,
    #[serde(rename = "Leaf Spot")]
    LeafSpot,
    #[serde(rename = "Rust")]
    Rust,
    #[serde(rename = "Root Rot")]
    RootRot,
    #[serde(rename = "Healthy Leaf")]
    HealthyLeaf,
}

impl DiseaseLabel {
    pub const ALL: [DiseaseLabel; 7] = [
        DiseaseLabel::EarlyBlight,
        DiseaseLabel::LateBlight,
        DiseaseLabel::PowderyMildew,
        DiseaseLabel::LeafSpot,
        DiseaseLabel::Rust,
        DiseaseLabel::RootRot,
        DiseaseLabel::HealthyLeaf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseLabel::EarlyBlight => "Early Blight",
            DiseaseLabel::LateBlight => "Late Blight",
            DiseaseLabel::PowderyMildew => "Powdery Mildew",
            DiseaseLabel::LeafSpot => "Leaf Spot",
            DiseaseLabel::Rust => "Rust",
            DiseaseLabel::RootRot => "Root Rot",
            DiseaseLabel::HealthyLeaf => "Healthy Leaf",
        }
    }
}

impl fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

/// Remediation content attached to one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
    pub severity: Severity,
    /// Upper bound applied to the classifier's confidence for this label.
    #[serde(rename = "confidence")]
    pub base_confidence: f64,
}

impl DiseaseProfile {
    fn new(treatment: &[&str], prevention: &[&str], severity: Severity, base_confidence: f64) -> Self {
        Self {
            treatment: treatment.iter().map(|s| s.to_string()).collect(),
            prevention: prevention.iter().map(|s| s.to_string()).collect(),
            severity,
            base_confidence,
        }
    }
}

/// Read-only label -> profile table, built once and shared by every request.
#[derive(Debug, Clone)]
pub struct DiseaseCatalog {
    profiles: HashMap<DiseaseLabel, DiseaseProfile>,
}

impl DiseaseCatalog {
    /// Builds a catalog from arbitrary profiles without checking coverage.
    pub fn from_profiles(profiles: impl IntoIterator<Item = (DiseaseLabel, DiseaseProfile)>) -> Self {
        Self {
            profiles: profiles.into_iter().collect(),
        }
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Self {
        use DiseaseLabel::*;
        use Severity::*;

        Self::from_profiles([
            (
                EarlyBlight,
                DiseaseProfile::new(
                    &[
                        "Remove infected leaves immediately",
                        "Apply fungicide spray (copper-based or mancozeb)",
                        "Increase air circulation around plants",
                        "Water plants at soil level, avoid wetting foliage",
                        "Repeat fungicide application every 7-10 days",
                    ],
                    &[
                        "Use disease-resistant plant varieties",
                        "Ensure proper plant spacing for airflow",
                        "Water in early morning at soil level",
                        "Mulch around plants to prevent soil splash",
                        "Clean up fallen leaves promptly",
                        "Rotate crops annually",
                    ],
                    High,
                    0.85,
                ),
            ),
            (
                LateBlight,
                DiseaseProfile::new(
                    &[
                        "Remove and destroy infected leaves and stems",
                        "Apply systemic fungicide immediately",
                        "Improve air circulation",
                        "Reduce watering frequency",
                        "Apply sulfur-based or copper fungicides weekly",
                    ],
                    &[
                        "Avoid overhead watering",
                        "Remove lower leaves",
                        "Plant in well-draining soil",
                        "Apply preventive fungicide during humid conditions",
                        "Store seed potatoes in cool, dry place",
                    ],
                    High,
                    0.88,
                ),
            ),
            (
                PowderyMildew,
                DiseaseProfile::new(
                    &[
                        "Apply sulfur dust or spray",
                        "Use neem oil solution",
                        "Increase air circulation by pruning",
                        "Reduce humidity in growing area",
                        "Apply treatment every 7-14 days",
                    ],
                    &[
                        "Ensure good plant spacing",
                        "Avoid overhead watering",
                        "Maintain optimal humidity levels",
                        "Remove infected leaves",
                        "Apply preventive sulfur spray in early season",
                    ],
                    Medium,
                    0.82,
                ),
            ),
            (
                LeafSpot,
                DiseaseProfile::new(
                    &[
                        "Remove affected leaves immediately",
                        "Apply copper fungicide spray",
                        "Improve plant spacing",
                        "Reduce leaf wetness",
                        "Repeat treatment every 10-14 days",
                    ],
                    &[
                        "Avoid wetting foliage",
                        "Use disease-free seeds",
                        "Clean tools between plants",
                        "Remove fallen leaves",
                        "Apply preventive spray when conditions are humid",
                    ],
                    Medium,
                    0.79,
                ),
            ),
            (
                Rust,
                DiseaseProfile::new(
                    &[
                        "Remove heavily infected leaves",
                        "Apply sulfur or copper-based fungicide",
                        "Improve air circulation",
                        "Reduce humidity",
                        "Repeat treatments every 7-10 days",
                    ],
                    &[
                        "Select rust-resistant varieties",
                        "Ensure adequate spacing",
                        "Avoid overhead irrigation",
                        "Keep area clean and weed-free",
                        "Monitor plants regularly",
                    ],
                    Medium,
                    0.81,
                ),
            ),
            (
                RootRot,
                DiseaseProfile::new(
                    &[
                        "Repot plant in fresh, sterile soil",
                        "Trim away black, mushy roots",
                        "Improve drainage significantly",
                        "Reduce watering frequency",
                        "Apply fungicide to remaining healthy roots",
                    ],
                    &[
                        "Use well-draining potting mix",
                        "Ensure pots have drainage holes",
                        "Water only when top inch of soil is dry",
                        "Avoid standing water",
                        "Use proper soil pH",
                    ],
                    High,
                    0.86,
                ),
            ),
            (
                HealthyLeaf,
                DiseaseProfile::new(
                    &[
                        "Continue regular plant care",
                        "Water appropriately based on plant needs",
                        "Provide adequate sunlight",
                        "Monitor regularly for any changes",
                    ],
                    &[
                        "Maintain consistent watering schedule",
                        "Ensure proper drainage",
                        "Provide appropriate light conditions",
                        "Apply balanced fertilizer monthly",
                        "Clean leaves regularly",
                    ],
                    Low,
                    0.92,
                ),
            ),
        ])
    }

    /// Parses a JSON object keyed by display label and checks that every
    /// label has a usable profile.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let profiles: HashMap<DiseaseLabel, DiseaseProfile> = serde_json::from_str(json)?;
        let catalog = Self { profiles };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for label in DiseaseLabel::ALL {
            let profile = self.lookup(label).map_err(|_| CatalogError::MissingProfile(label))?;
            if !(0.5..=0.99).contains(&profile.base_confidence) {
                return Err(CatalogError::InvalidConfidence(label, profile.base_confidence));
            }
        }
        Ok(())
    }

    pub fn lookup(&self, label: DiseaseLabel) -> Result<&DiseaseProfile, CatalogError> {
        self.profiles.get(&label).ok_or(CatalogError::UnknownLabel(label))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for DiseaseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Reads a catalog override from disk.
pub fn load_catalog(file_path: impl AsRef<Path>) -> Result<DiseaseCatalog, CatalogError> {
    let path = file_path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| CatalogError::Io(path.to_path_buf(), e))?;
    DiseaseCatalog::from_json(&json)
}
