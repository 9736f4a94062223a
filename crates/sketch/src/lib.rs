//! # Sketch Shape Recognition Library
//!
//! Classifies hand-drawn silhouettes (circle, square, triangle, ...) by
//! comparing rotation, scale and translation invariant features against a
//! database of labelled reference descriptors.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: binarizers, mask refiners, closure validators
//!   and feature extractors are all swappable trait objects
//! - **Pipeline System**: compose the analysis steps with a fluent builder
//! - **Closure Check**: flood fill from the border decides whether a stroke
//!   encloses a region and fills that region
//! - **Invariant Features**: log-scaled Hu moments plus a resampled radial
//!   signature of the outer contour
//! - **1-NN Classification**: weighted Hu + signature distance against a
//!   hot-swappable descriptor database
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sketch::{ShapeRecognizer, load_image};
//!
//! let recognizer = ShapeRecognizer::new();
//! recognizer.load_file("descriptors.txt")?;
//!
//! let drawing = load_image("drawing.png")?;
//! let result = recognizer.classify(&drawing)?;
//! println!("{} (closed: {})", result.predicted_label, result.closed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use sketch::{Pipeline, ShapeRecognizer, algorithms::*};
//!
//! let pipeline = Pipeline::builder()
//!     .set_binarizer(OtsuBinarizer { blur_sigma: 1.5, dark_foreground: true })
//!     .with_morphological_close(3, 2)
//!     .with_largest_component()
//!     .set_closure_validator(FloodFillClosureValidator {
//!         connectivity: FillConnectivity::Four,
//!         solid_core_radius: 6,
//!         solid_core_ratio: 0.2,
//!     })
//!     .with_signature_len(128)
//!     .build();
//! let recognizer = ShapeRecognizer::with_pipeline(pipeline);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod classifier;
pub mod database;
pub mod io;
pub mod manager;
pub mod config;
pub mod report;

// Re-exports for convenience
pub use error::{SketchError, Result};
pub use types::{BinaryMask, ClassificationResult, Descriptor, FeatureVector, HU_MOMENT_COUNT, NO_FIGURE_LABEL};
pub use traits::*;
pub use pipeline::{Analysis, Pipeline, DEFAULT_SIGNATURE_LEN, builder::PipelineBuilder};
pub use classifier::{Classifier, DistanceWeights, HuNorm, Match, SignatureMetric};
pub use database::{DescriptorDatabase, DescriptorStore};
pub use io::*;
pub use manager::{ShapeRecognizer, load_image, load_image_from_bytes};
pub use config::RecognizerConfig;
pub use report::ConfusionMatrix;


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::*;

    const CANVAS_SIZE: u32 = 256;

    fn reference_drawings() -> Vec<(&'static str, image::RgbaImage)> {
        vec![
            ("Circle", ring(CANVAS_SIZE, 128, 128, 80.0, 86.0)),
            ("Square", square(CANVAS_SIZE, 128, 128, 80, 3)),
            (
                "Triangle",
                polygon(CANVAS_SIZE, &[[128.0, 40.0], [210.0, 200.0], [46.0, 200.0]], 3.0),
            ),
        ]
    }

    /// Reference database built with the same pipeline as the queries
    fn trained_recognizer() -> ShapeRecognizer {
        let recognizer = ShapeRecognizer::new();
        let mut labels = Vec::new();
        let mut hu_table = Vec::new();
        let mut signature_table = Vec::new();
        for (label, drawing) in reference_drawings() {
            let features = recognizer.extract_features(&drawing).expect("Should extract reference");
            labels.push(label.to_string());
            hu_table.push(features.hu_moments);
            signature_table.push(features.signature);
        }
        recognizer
            .load_tables(labels, hu_table, signature_table)
            .expect("Should load tables");
        recognizer
    }

    #[test]
    fn test_classify_before_load() {
        let recognizer = ShapeRecognizer::new();
        let result = recognizer.classify(&ring(CANVAS_SIZE, 128, 128, 40.0, 46.0));
        assert!(matches!(result, Err(SketchError::NotInitialized)));
    }

    #[test]
    fn test_empty_raster() {
        let recognizer = trained_recognizer();
        let result = recognizer.classify(&blank(CANVAS_SIZE));
        assert!(matches!(result, Err(SketchError::NoShapeDetected)));
    }

    #[test]
    fn test_circle_query_matches_circle() {
        let recognizer = trained_recognizer();
        let database = recognizer.store().snapshot().expect("Should be initialized");
        let circle = &database.descriptors()[0];

        // Smaller circle, drawn off-centre
        let result = recognizer
            .classify(&ring(CANVAS_SIZE, 100, 140, 50.0, 55.0))
            .expect("Should classify");

        assert_eq!(result.predicted_label, "Circle");
        assert!(result.closed);
        assert_eq!(recognizer.last_closed(), Some(true));
        for (query, reference) in result.features.hu_moments.iter().zip(circle.hu_moments.iter()) {
            assert!((query - reference).abs() < 0.01);
        }
        for (query, reference) in result.features.signature.iter().zip(circle.effective_signature()) {
            assert!((query - reference).abs() < 0.05);
        }
    }

    #[test]
    fn test_square_and_triangle_queries() {
        let recognizer = trained_recognizer();

        let square_result = recognizer
            .classify(&square(CANVAS_SIZE, 90, 110, 50, 3))
            .expect("Should classify");
        assert_eq!(square_result.predicted_label, "Square");

        let triangle_result = recognizer
            .classify(&polygon(CANVAS_SIZE, &[[80.0, 30.0], [140.0, 150.0], [20.0, 150.0]], 2.0))
            .expect("Should classify");
        assert_eq!(triangle_result.predicted_label, "Triangle");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let recognizer = trained_recognizer();
        let drawing = ring(CANVAS_SIZE, 120, 120, 60.0, 66.0);
        let first = recognizer.classify(&drawing).expect("Should classify");
        let second = recognizer.classify(&drawing).expect("Should classify");
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_descriptor_database() {
        let recognizer = ShapeRecognizer::new();
        let features = recognizer
            .extract_features(&square(CANVAS_SIZE, 128, 128, 60, 3))
            .expect("Should extract");
        recognizer.load_descriptors(DescriptorDatabase::new(vec![Descriptor::new(
            "Square",
            features.hu_moments,
            features.signature,
        )]));

        let result = recognizer
            .classify(&ring(CANVAS_SIZE, 128, 128, 40.0, 46.0))
            .expect("Should classify");
        assert_eq!(result.predicted_label, "Square");
    }

    #[test]
    fn test_open_stroke_is_classified_but_flagged() {
        let recognizer = trained_recognizer();
        let result = recognizer
            .classify(&stroke(CANVAS_SIZE, [40.0, 60.0], [200.0, 190.0], 3.0))
            .expect("Should classify");
        assert!(!result.closed);
        assert_eq!(recognizer.last_closed(), Some(false));
        assert!(result.distance.is_finite());
    }

    #[test]
    fn test_off_grid_circle_matches_circle() {
        let recognizer = trained_recognizer();
        let database = recognizer.store().snapshot().expect("Should be initialized");
        let circle = &database.descriptors()[0];

        let result = recognizer
            .classify(&ring_at(CANVAS_SIZE, 128.25, 127.6, 50.0, 55.0))
            .expect("Should classify");
        assert_eq!(result.predicted_label, "Circle");
        for (query, reference) in result.features.hu_moments.iter().zip(circle.hu_moments.iter()) {
            assert!((query - reference).abs() < 0.01, "{query} vs {reference}");
        }
    }

    #[test]
    fn test_thick_open_stroke_is_not_closed() {
        let recognizer = trained_recognizer();
        let result = recognizer
            .classify(&stroke(CANVAS_SIZE, [40.0, 60.0], [200.0, 190.0], 6.0))
            .expect("Should classify");
        assert!(!result.closed);
        assert_eq!(recognizer.last_closed(), Some(false));
    }

    #[test]
    fn test_non_finite_row_leaves_database_untouched() {
        let recognizer = trained_recognizer();
        let mut bogus = [30.0; HU_MOMENT_COUNT];
        bogus[1] = f64::NAN;

        let result = recognizer.load_tables(vec!["Bogus".to_string()], vec![bogus], vec![vec![1.0; 4]]);
        assert!(matches!(result, Err(SketchError::MalformedDescriptorRecord { line: 1, .. })));

        let classified = recognizer
            .classify(&ring(CANVAS_SIZE, 128, 128, 50.0, 55.0))
            .expect("Should classify");
        assert_eq!(classified.predicted_label, "Circle");
        assert!(classified.distance.is_finite());
    }
}
