use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use leaf_doctor::{
    DecodePolicy, DetectError, Detector, DetectorConfig, DiseaseCatalog, DiseaseLabel, Severity,
};

fn encode(image: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn png(image: RgbImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}

/// Brown patches of varying darkness on a black background.
fn mottled_brown(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(448, 448, |_, _| {
        if rng.gen_bool(0.35) {
            Rgb([0, 0, 0])
        } else {
            let g: u8 = rng.gen_range(30..=100);
            Rgb([g * 2, g, 0])
        }
    })
}

#[test]
fn uniform_green_leaf_is_healthy() {
    // Green-dominant pixels give greenness exactly half of spotiness, so the
    // verdict comes from the default branch rather than the green override.
    let bytes = png(RgbImage::from_pixel(224, 224, Rgb([0, 200, 0])));
    let result = Detector::default().diagnose(&bytes).unwrap();

    assert_eq!(result.disease, DiseaseLabel::HealthyLeaf);
    assert_eq!(result.severity, Severity::Low);
    assert_eq!(result.confidence, 0.5);
}

#[test]
fn brown_mottling_is_late_blight() {
    let bytes = png(mottled_brown(1));
    let result = Detector::default().diagnose(&bytes).unwrap();

    assert_eq!(result.disease, DiseaseLabel::LateBlight);
    assert_eq!(result.severity, Severity::High);
    assert!(result.confidence >= 0.83);
    assert_eq!(result.confidence, 0.88);
}

#[test]
fn mixed_green_and_brown_is_leaf_spot() {
    let image = RgbImage::from_fn(224, 224, |x, _| if x < 112 { Rgb([0, 200, 0]) } else { Rgb([200, 100, 0]) });
    let result = Detector::default().diagnose(&png(image)).unwrap();

    assert_eq!(result.disease, DiseaseLabel::LeafSpot);
    assert_eq!(result.severity, Severity::Medium);
    // Classifier says 0.82; the catalog caps Leaf Spot at 0.79.
    assert_eq!(result.confidence, 0.79);
}

#[test]
fn non_square_photo_is_judged_on_its_centre() {
    // Brown margins, green middle. Stretching would keep the margins and
    // call Leaf Spot; the centred 100x100 window is all green.
    let image = RgbImage::from_fn(400, 100, |x, _| {
        if (130..270).contains(&x) { Rgb([0, 200, 0]) } else { Rgb([200, 100, 0]) }
    });
    let result = Detector::default().diagnose(&png(image)).unwrap();

    assert_eq!(result.disease, DiseaseLabel::HealthyLeaf);
    assert_eq!(result.confidence, 0.5);
}

#[test]
fn black_and_grey_images_do_not_divide_by_zero() {
    for rgb in [[0, 0, 0], [77, 77, 77], [255, 255, 255]] {
        let bytes = png(RgbImage::from_pixel(100, 80, Rgb(rgb)));
        let result = Detector::default().diagnose(&bytes).unwrap();
        assert_eq!(result.disease, DiseaseLabel::HealthyLeaf, "{rgb:?}");
        assert_eq!(result.confidence, 0.5, "{rgb:?}");
    }
}

#[test]
fn non_image_bytes_use_the_fallback() {
    let result = Detector::default().diagnose(b"%PDF-1.4 not an image").unwrap();
    assert_eq!(result.disease, DiseaseLabel::HealthyLeaf);
    assert_eq!(result.confidence, 0.5);
}

#[test]
fn non_image_bytes_rejected_under_reject_policy() {
    let detector = Detector::new(
        DetectorConfig {
            decode_policy: DecodePolicy::Reject,
            ..DetectorConfig::default()
        },
        Arc::new(DiseaseCatalog::builtin()),
    );
    assert!(matches!(detector.diagnose(b"%PDF-1.4"), Err(DetectError::Decode(_))));

    // Valid images are unaffected by the policy.
    let bytes = png(RgbImage::from_pixel(224, 224, Rgb([0, 200, 0])));
    assert!(detector.diagnose(&bytes).is_ok());
}

#[test]
fn jpeg_input_is_accepted() {
    let bytes = encode(mottled_brown(9), ImageFormat::Jpeg);
    let result = Detector::default().diagnose(&bytes).unwrap();
    assert!(DiseaseLabel::ALL.contains(&result.disease));
}

#[test]
fn repeated_diagnosis_is_deterministic() {
    let detector = Detector::default();
    let bytes = png(mottled_brown(3));

    let first = detector.diagnose(&bytes).unwrap();
    for _ in 0..3 {
        let again = detector.diagnose(&bytes).unwrap();
        assert_eq!(again.disease, first.disease);
        assert_eq!(again.severity, first.severity);
        assert_eq!(again.treatment, first.treatment);
        assert_eq!(again.prevention, first.prevention);
        assert!((again.confidence - first.confidence).abs() < 1e-12);
    }
}

#[test]
fn random_images_respect_confidence_bounds() {
    let detector = Detector::default();
    let catalog = DiseaseCatalog::builtin();
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..24 {
        let (w, h) = (rng.gen_range(8..=96), rng.gen_range(8..=96));
        let image = RgbImage::from_fn(w, h, |_, _| Rgb([rng.gen_range(0..=255), rng.gen_range(0..=255), rng.gen_range(0..=255)]));
        let result = detector.diagnose(&png(image)).unwrap();

        let profile = catalog.lookup(result.disease).unwrap();
        assert!((0.5..=0.99).contains(&result.confidence), "{result:?}");
        assert!(result.confidence <= profile.base_confidence, "{result:?}");
        assert_eq!(result.treatment, profile.treatment);
        assert_eq!(result.severity, profile.severity);
    }
}

#[test]
fn batch_matches_single_diagnosis() {
    let detector = Detector::default();
    let images = vec![
        png(mottled_brown(5)),
        png(RgbImage::from_pixel(64, 64, Rgb([0, 200, 0]))),
        b"junk".to_vec(),
    ];

    let batch = detector.diagnose_batch(&images);
    for (bytes, result) in images.iter().zip(batch) {
        let single = detector.diagnose(bytes).unwrap();
        let result = result.unwrap();
        assert_eq!(result.disease, single.disease);
        assert_eq!(result.confidence, single.confidence);
    }
}
