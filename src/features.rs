//! Colour statistics over a raster.
//!
//! Every pixel is visited once, in raster order, and four non-negative
//! per-pixel scores are averaged over the whole image.

use serde::{Deserialize, Serialize};

use crate::preprocess::RasterImage;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub greenness: f64,
    pub brownness: f64,
    pub yellowness: f64,
    pub spotiness: f64,
}

impl FeatureVector {
    /// All-zero vector used when an image could not be decoded.
    pub const ZERO: FeatureVector = FeatureVector {
        greenness: 0.0,
        brownness: 0.0,
        yellowness: 0.0,
        spotiness: 0.0,
    };

    pub fn new(greenness: f64, brownness: f64, yellowness: f64, spotiness: f64) -> Self {
        Self {
            greenness,
            brownness,
            yellowness,
            spotiness,
        }
    }

    /// `[greenness, brownness, yellowness, spotiness]`
    pub fn overall(&self) -> [f64; 4] {
        [self.greenness, self.brownness, self.yellowness, self.spotiness]
    }

    pub fn max_component(&self) -> f64 {
        self.overall().into_iter().fold(0.0, f64::max)
    }
}

/// Per-pixel scores, each clamped at zero.
fn pixel_scores([r, g, b]: [u8; 3]) -> [f64; 4] {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let green = g - (r + b) / 2.0;
    let brown = (r + g) / 2.0 - b;
    // Same expression as brown; the yellow/brown tie-break downstream relies on it.
    let yellow = (r + g) / 2.0 - b;
    let spots = (r - g).abs() + (g - b).abs();
    [green.max(0.0), brown.max(0.0), yellow.max(0.0), spots.max(0.0)]
}

pub fn extract_features(raster: &RasterImage) -> FeatureVector {
    let count = raster.pixel_count();
    if count == 0 {
        return FeatureVector::ZERO;
    }

    let mut sums = [0.0f64; 4];
    for pixel in raster.pixels() {
        let scores = pixel_scores(pixel);
        for (sum, score) in sums.iter_mut().zip(scores) {
            *sum += score;
        }
    }

    let n = count as f64;
    FeatureVector::new(sums[0] / n, sums[1] / n, sums[2] / n, sums[3] / n)
}
