pub mod builder;

use image::RgbaImage;
use tracing::{debug, warn};
use crate::{
    algorithms::ClosureReport,
    error::{Result, SketchError},
    types::{BinaryMask, FeatureVector},
    traits::{Binarizer, MaskRefiner, ClosureValidator, FeatureExtractor},
};

/// Signature length used when no database dictates one
pub const DEFAULT_SIGNATURE_LEN: usize = 64;

/// Everything the pipeline derived from one drawing
#[derive(Debug, Clone)]
pub struct Analysis {
    pub mask: BinaryMask,
    pub closure: ClosureReport,
    pub features: FeatureVector,
}

/// Drawing analysis: binarize, refine, check closure, extract features
pub struct Pipeline {
    binarizer: Box<dyn Binarizer>,
    refiners: Vec<Box<dyn MaskRefiner>>,
    closure_validator: Box<dyn ClosureValidator>,
    feature_extractor: Box<dyn FeatureExtractor>,
    default_signature_len: usize,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        binarizer: Box<dyn Binarizer>,
        refiners: Vec<Box<dyn MaskRefiner>>,
        closure_validator: Box<dyn ClosureValidator>,
        feature_extractor: Box<dyn FeatureExtractor>,
        default_signature_len: usize,
    ) -> Self {
        Self {
            binarizer,
            refiners,
            closure_validator,
            feature_extractor,
            default_signature_len,
        }
    }

    pub fn default_signature_len(&self) -> usize {
        self.default_signature_len
    }

    /// Binarize the drawing and run every refiner in sequence
    pub fn binarize(&self, image: &RgbaImage) -> Result<BinaryMask> {
        let mut mask = self.binarizer.binarize(image)?;
        for refiner in &self.refiners {
            mask = refiner.refine(&mask)?;
        }
        Ok(mask)
    }

    /// Closure check on an already binarized mask
    pub fn validate(&self, mask: &BinaryMask) -> ClosureReport {
        self.closure_validator.validate(mask)
    }

    /// Full analysis of one drawing.
    ///
    /// `signature_len` overrides the pipeline default, typically with the
    /// loaded database's signature length.
    pub fn analyze(&self, image: &RgbaImage, signature_len: Option<usize>) -> Result<Analysis> {
        // Step 1: mask
        let mask = self.binarize(image)?;
        if mask.is_empty() {
            return Err(SketchError::NoShapeDetected);
        }

        // Step 2: closure, advisory only
        let closure = self.validate(&mask);
        if !closure.closed {
            warn!(foreground = mask.count(), "stroke does not enclose a region");
        }

        // Step 3: features over the filled region
        let signature_len = signature_len.unwrap_or(self.default_signature_len);
        let features = self.feature_extractor.extract(&closure.filled, signature_len)?;

        debug!(
            foreground = mask.count(),
            filled = closure.filled.count(),
            closed = closure.closed,
            "analysis complete"
        );

        Ok(Analysis { mask, closure, features })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: 1 binarizer, {} refiners, 1 closure validator, 1 feature extractor, signature length {}",
            self.refiners.len(),
            self.default_signature_len
        )
    }
}
