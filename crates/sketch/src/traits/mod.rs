use image::RgbaImage;
use crate::{
    algorithms::ClosureReport,
    error::Result,
    types::{BinaryMask, FeatureVector},
};

/// Trait for turning a raster drawing into a foreground mask
pub trait Binarizer: Send + Sync {
    /// Classify every pixel as stroke or background
    fn binarize(&self, image: &RgbaImage) -> Result<BinaryMask>;
}

/// Trait for mask clean-up steps run after binarization
pub trait MaskRefiner: Send + Sync {
    fn refine(&self, mask: &BinaryMask) -> Result<BinaryMask>;
}

/// Trait for deciding whether a stroke seals off an interior
pub trait ClosureValidator: Send + Sync {
    fn validate(&self, mask: &BinaryMask) -> ClosureReport;
}

/// Trait for shape descriptor extraction
pub trait FeatureExtractor: Send + Sync {
    /// Compute invariant features of `region`, with a signature of `signature_len` samples
    fn extract(&self, region: &BinaryMask, signature_len: usize) -> Result<FeatureVector>;
}
