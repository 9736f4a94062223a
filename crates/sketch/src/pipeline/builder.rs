use crate::{
    pipeline::{Pipeline, DEFAULT_SIGNATURE_LEN},
    traits::{Binarizer, MaskRefiner, ClosureValidator, FeatureExtractor},
    algorithms::{
        BackgroundThresholdBinarizer,
        OtsuBinarizer,
        MorphologicalClose,
        LargestComponentFilter,
        FloodFillClosureValidator,
        MomentSignatureExtractor,
    },
};

/// Builder for creating analysis pipelines with a fluent API
pub struct PipelineBuilder {
    binarizer: Option<Box<dyn Binarizer>>,
    refiners: Vec<Box<dyn MaskRefiner>>,
    closure_validator: Option<Box<dyn ClosureValidator>>,
    feature_extractor: Option<Box<dyn FeatureExtractor>>,
    signature_len: usize,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            binarizer: None,
            refiners: Vec::new(),
            closure_validator: None,
            feature_extractor: None,
            signature_len: DEFAULT_SIGNATURE_LEN,
        }
    }

    /// Set the binarizer (replaces any existing one)
    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: Binarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    /// Add a mask refiner, run after binarization in insertion order
    pub fn add_refiner<R>(mut self, refiner: R) -> Self
    where
        R: MaskRefiner + 'static,
    {
        self.refiners.push(Box::new(refiner));
        self
    }

    /// Set the closure validator (replaces any existing one)
    pub fn set_closure_validator<V>(mut self, validator: V) -> Self
    where
        V: ClosureValidator + 'static,
    {
        self.closure_validator = Some(Box::new(validator));
        self
    }

    /// Set the feature extractor (replaces any existing one)
    pub fn set_feature_extractor<E>(mut self, extractor: E) -> Self
    where
        E: FeatureExtractor + 'static,
    {
        self.feature_extractor = Some(Box::new(extractor));
        self
    }

    /// Signature length used when no database is loaded
    pub fn with_signature_len(mut self, len: usize) -> Self {
        self.signature_len = len;
        self
    }

    /// Add morphological closing as a refinement step
    pub fn with_morphological_close(self, radius: u8, iterations: usize) -> Self {
        self.add_refiner(MorphologicalClose { radius, iterations })
    }

    /// Keep only the largest connected component
    pub fn with_largest_component(self) -> Self {
        self.add_refiner(LargestComponentFilter)
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let binarizer = self.binarizer
            .unwrap_or_else(|| Box::new(BackgroundThresholdBinarizer::default()));

        let closure_validator = self.closure_validator
            .unwrap_or_else(|| Box::new(FloodFillClosureValidator::default()));

        let feature_extractor = self.feature_extractor
            .unwrap_or_else(|| Box::new(MomentSignatureExtractor::default()));

        Pipeline::new(
            binarizer,
            self.refiners,
            closure_validator,
            feature_extractor,
            self.signature_len,
        )
    }

    /// Build a pipeline with a plain background-distance threshold
    pub fn build_simple(threshold: u8) -> Pipeline {
        Self::new()
            .set_binarizer(BackgroundThresholdBinarizer { threshold, ..Default::default() })
            .build()
    }

    /// Blur, Otsu threshold, close gaps twice and keep the largest figure
    pub fn build_smoothed() -> Pipeline {
        Self::new()
            .set_binarizer(OtsuBinarizer::default())
            .add_refiner(MorphologicalClose::default())
            .with_largest_component()
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
