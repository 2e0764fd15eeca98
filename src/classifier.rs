//! Rule-based disease classifier.
//!
//! The feature vector is scaled by its largest component and then run through
//! a fixed cascade of rules. Every matching rule overwrites the previous
//! verdict, so the order of [`RULES`] decides the outcome when conditions
//! overlap (a later Root Rot or Late Blight match replaces an earlier Early
//! Blight call, for instance). Do not turn this into first-match-wins.

use tracing::trace;

use crate::features::FeatureVector;
use crate::mapping::DiseaseLabel;

pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 0.99;

/// Features divided by the largest component, so each lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedFeatures {
    pub green: f64,
    pub brown: f64,
    pub yellow: f64,
    pub spots: f64,
}

impl NormalizedFeatures {
    pub fn from_features(features: &FeatureVector) -> Self {
        let max = features.max_component();
        // An all-zero vector would divide by zero; scale by 1 instead.
        let max = if max > 0.0 { max } else { 1.0 };
        Self {
            green: features.greenness / max,
            brown: features.brownness / max,
            yellow: features.yellowness / max,
            spots: features.spotiness / max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: DiseaseLabel,
    pub confidence: f64,
}

impl Classification {
    pub const fn new(label: DiseaseLabel, confidence: f64) -> Self {
        Self { label, confidence }
    }
}

/// One step of the cascade: when `applies` holds, `verdict` replaces
/// whatever earlier steps decided.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&NormalizedFeatures) -> bool,
    pub verdict: fn(&NormalizedFeatures) -> Classification,
}

impl Rule {
    pub fn evaluate(&self, n: &NormalizedFeatures) -> Option<Classification> {
        (self.applies)(n).then(|| (self.verdict)(n))
    }
}

const DEFAULT: Classification = Classification::new(DiseaseLabel::HealthyLeaf, 0.5);

fn spotted(n: &NormalizedFeatures) -> bool {
    n.spots > 0.6 && n.green < 0.5
}

fn spotted_verdict(n: &NormalizedFeatures) -> Classification {
    if n.brown > n.yellow {
        Classification::new(DiseaseLabel::EarlyBlight, 0.75 + (n.spots - 0.6) * 0.3)
    } else {
        Classification::new(DiseaseLabel::LeafSpot, 0.72 + (n.spots - 0.6) * 0.25)
    }
}

fn yellowed(n: &NormalizedFeatures) -> bool {
    n.yellow > 0.5 && n.green < 0.6 && n.spots < 0.5
}

fn yellowed_verdict(n: &NormalizedFeatures) -> Classification {
    if n.yellow > n.brown {
        Classification::new(DiseaseLabel::PowderyMildew, 0.78 + (n.yellow - 0.5) * 0.2)
    } else {
        Classification::new(DiseaseLabel::Rust, 0.75 + (n.yellow - 0.5) * 0.2)
    }
}

fn browned(n: &NormalizedFeatures) -> bool {
    n.brown > 0.65 && n.green < 0.4
}

fn browned_verdict(n: &NormalizedFeatures) -> Classification {
    Classification::new(DiseaseLabel::RootRot, 0.81 + (n.brown - 0.65) * 0.18)
}

fn blighted(n: &NormalizedFeatures) -> bool {
    n.brown > 0.55 && n.spots > 0.55 && n.green < 0.45
}

fn blighted_verdict(n: &NormalizedFeatures) -> Classification {
    Classification::new(DiseaseLabel::LateBlight, 0.83 + (n.spots + n.brown) * 0.1)
}

fn green_dominant(n: &NormalizedFeatures) -> bool {
    n.green > 0.65 && n.spots < 0.3
}

fn green_dominant_verdict(n: &NormalizedFeatures) -> Classification {
    Classification::new(DiseaseLabel::HealthyLeaf, 0.85 + (n.green - 0.65) * 0.15)
}

/// Evaluated top to bottom; later matches win.
pub const RULES: [Rule; 5] = [
    Rule {
        name: "spotted",
        applies: spotted,
        verdict: spotted_verdict,
    },
    Rule {
        name: "yellowed",
        applies: yellowed,
        verdict: yellowed_verdict,
    },
    Rule {
        name: "browned",
        applies: browned,
        verdict: browned_verdict,
    },
    Rule {
        name: "blighted",
        applies: blighted,
        verdict: blighted_verdict,
    },
    Rule {
        name: "green-dominant",
        applies: green_dominant,
        verdict: green_dominant_verdict,
    },
];

pub fn classify(features: &FeatureVector) -> Classification {
    let normalized = NormalizedFeatures::from_features(features);

    let mut result = DEFAULT;
    for rule in RULES.iter() {
        if let Some(verdict) = rule.evaluate(&normalized) {
            trace!(rule = rule.name, label = %verdict.label, confidence = verdict.confidence, "rule matched");
            result = verdict;
        }
    }

    result.confidence = result.confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
    result
}
