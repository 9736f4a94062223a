//! Serializable recognizer profile.
//!
//! Every field has a default, so a profile only needs the settings it
//! changes. Front ends load it from TOML or JSON and call
//! [`RecognizerConfig::build_recognizer`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{
        BackgroundThresholdBinarizer, FillConnectivity, FloodFillClosureValidator, HuLogTransform,
        LargestComponentFilter, MomentSignatureExtractor, MorphologicalClose, OtsuBinarizer,
        SignatureNormalization,
    },
    classifier::Classifier,
    manager::ShapeRecognizer,
    pipeline::{builder::PipelineBuilder, Pipeline, DEFAULT_SIGNATURE_LEN},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinarizerConfig {
    /// Colour distance from a known canvas colour
    BackgroundThreshold {
        #[serde(default)]
        background: [u8; 3],
        #[serde(default = "default_threshold")]
        threshold: u8,
    },
    /// Gaussian blur then Otsu's threshold
    Otsu {
        #[serde(default = "default_blur_sigma")]
        blur_sigma: f32,
        #[serde(default)]
        dark_foreground: bool,
    },
}

fn default_threshold() -> u8 {
    64
}

fn default_blur_sigma() -> f32 {
    1.1
}

impl Default for BinarizerConfig {
    fn default() -> Self {
        Self::BackgroundThreshold {
            background: [0, 0, 0],
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefinerConfig {
    MorphologicalClose {
        #[schemars(range(min = 1, max = 15))]
        radius: u8,
        iterations: usize,
    },
    LargestComponent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ClosureConfig {
    pub connectivity: FillConnectivity,
    pub solid_core_radius: u8,
    /// Minimum inscribed radius over bounding-box extent for a solid blob
    #[schemars(range(min = 0.0, max = 0.5))]
    pub solid_core_ratio: f64,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        let validator = FloodFillClosureValidator::default();
        Self {
            connectivity: validator.connectivity,
            solid_core_radius: validator.solid_core_radius,
            solid_core_ratio: validator.solid_core_ratio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractorConfig {
    pub hu_transform: HuLogTransform,
    pub normalization: SignatureNormalization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecognizerConfig {
    pub binarizer: BinarizerConfig,
    /// Applied in order after binarization
    pub refiners: Vec<RefinerConfig>,
    pub closure: ClosureConfig,
    pub extractor: ExtractorConfig,
    pub classifier: Classifier,
    /// Signature length used before any database is loaded
    #[schemars(range(min = 1))]
    pub signature_len: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            binarizer: BinarizerConfig::default(),
            refiners: Vec::new(),
            closure: ClosureConfig::default(),
            extractor: ExtractorConfig::default(),
            classifier: Classifier::default(),
            signature_len: DEFAULT_SIGNATURE_LEN,
        }
    }
}

impl RecognizerConfig {
    /// Otsu binarization with gap closing and largest-component filtering
    pub fn smoothed() -> Self {
        Self {
            binarizer: BinarizerConfig::Otsu {
                blur_sigma: default_blur_sigma(),
                dark_foreground: false,
            },
            refiners: vec![
                RefinerConfig::MorphologicalClose { radius: 3, iterations: 2 },
                RefinerConfig::LargestComponent,
            ],
            ..Default::default()
        }
    }

    /// Get the JSON schema of a profile
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RecognizerConfig)
    }

    pub fn build_pipeline(&self) -> Pipeline {
        let mut builder = PipelineBuilder::new();

        builder = match self.binarizer {
            BinarizerConfig::BackgroundThreshold { background, threshold } => {
                builder.set_binarizer(BackgroundThresholdBinarizer { background, threshold })
            }
            BinarizerConfig::Otsu { blur_sigma, dark_foreground } => {
                builder.set_binarizer(OtsuBinarizer { blur_sigma, dark_foreground })
            }
        };

        for refiner in &self.refiners {
            builder = match *refiner {
                RefinerConfig::MorphologicalClose { radius, iterations } => {
                    builder.add_refiner(MorphologicalClose { radius, iterations })
                }
                RefinerConfig::LargestComponent => builder.add_refiner(LargestComponentFilter),
            };
        }

        builder
            .set_closure_validator(FloodFillClosureValidator {
                connectivity: self.closure.connectivity,
                solid_core_radius: self.closure.solid_core_radius,
                solid_core_ratio: self.closure.solid_core_ratio,
            })
            .set_feature_extractor(MomentSignatureExtractor {
                hu_transform: self.extractor.hu_transform,
                normalization: self.extractor.normalization,
            })
            .with_signature_len(self.signature_len.max(1))
            .build()
    }

    pub fn build_recognizer(&self) -> ShapeRecognizer {
        ShapeRecognizer::with_pipeline(self.build_pipeline()).with_classifier(self.classifier.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SignatureMetric;

    #[test]
    fn test_partial_profile_fills_defaults() {
        let json = r#"{
            "binarizer": { "kind": "otsu" },
            "refiners": [ { "kind": "largest_component" } ],
            "classifier": { "signature_metric": "rms" },
            "signature_len": 32
        }"#;
        let config: RecognizerConfig = serde_json::from_str(json).expect("Should parse");

        assert_eq!(
            config.binarizer,
            BinarizerConfig::Otsu { blur_sigma: 1.1, dark_foreground: false }
        );
        assert_eq!(config.refiners, vec![RefinerConfig::LargestComponent]);
        assert_eq!(config.classifier.signature_metric, SignatureMetric::Rms);
        assert_eq!(config.classifier.weights.hu, 1.0);
        assert_eq!(config.closure, ClosureConfig::default());
        assert_eq!(config.extractor.hu_transform.zero_floor, 1e-30);
        assert_eq!(config.extractor.hu_transform.relative_tolerance, 1.5e-2);
        assert_eq!(config.closure.solid_core_ratio, 0.15);
    }

    #[test]
    fn test_older_profile_without_new_fields() {
        let json = r#"{
            "closure": { "connectivity": "eight", "solid_core_radius": 3 },
            "extractor": { "hu_transform": { "zero_floor": 1e-20 } }
        }"#;
        let config: RecognizerConfig = serde_json::from_str(json).expect("Should parse");
        assert_eq!(config.closure.connectivity, FillConnectivity::Eight);
        assert_eq!(config.closure.solid_core_ratio, 0.15);
        assert_eq!(config.extractor.hu_transform.zero_floor, 1e-20);
        assert_eq!(config.extractor.hu_transform.relative_tolerance, 1.5e-2);
    }

    #[test]
    fn test_empty_profile_is_default() {
        let config: RecognizerConfig = serde_json::from_str("{}").expect("Should parse");
        assert_eq!(config, RecognizerConfig::default());
    }

    #[test]
    fn test_build_pipeline_uses_profile() {
        let config = RecognizerConfig { signature_len: 48, ..RecognizerConfig::smoothed() };
        let pipeline = config.build_pipeline();
        assert_eq!(pipeline.default_signature_len(), 48);
        assert!(pipeline.info().contains("2 refiners"));

        let recognizer = config.build_recognizer();
        assert_eq!(recognizer.classifier(), &config.classifier);
        assert!(!recognizer.store().is_initialized());
    }

    #[test]
    fn test_schema_lists_sections() {
        let schema = serde_json::to_string(&RecognizerConfig::schema()).expect("Should serialize");
        for section in ["binarizer", "refiners", "closure", "extractor", "classifier"] {
            assert!(schema.contains(section), "missing {section}");
        }
    }
}
