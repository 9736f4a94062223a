use tracing::debug;

use crate::{
    algorithms::{
        moments::{CentralMoments, HuLogTransform},
        signature::{outer_contour, radial_signature, SignatureNormalization},
    },
    error::{Result, SketchError},
    traits::FeatureExtractor,
    types::{BinaryMask, FeatureVector},
};

/// Hu moments of the region's mass plus a radial signature of its outer border
#[derive(Debug, Clone, Default)]
pub struct MomentSignatureExtractor {
    pub hu_transform: HuLogTransform,
    pub normalization: SignatureNormalization,
}

impl FeatureExtractor for MomentSignatureExtractor {
    fn extract(&self, region: &BinaryMask, signature_len: usize) -> Result<FeatureVector> {
        let moments = CentralMoments::from_mask(region).ok_or(SketchError::NoShapeDetected)?;

        let raw_hu = moments.normalized().hu_invariants();
        if raw_hu.iter().any(|h| !h.is_finite()) {
            return Err(SketchError::DegenerateGeometry(format!(
                "non-finite Hu invariants for a region of area {}",
                moments.m00
            )));
        }
        let hu_moments = self.hu_transform.apply_all(&raw_hu);

        let contour = outer_contour(region).ok_or(SketchError::NoShapeDetected)?;
        let signature = radial_signature(&contour, moments.centroid(), signature_len, self.normalization)?;

        let features = FeatureVector { hu_moments, signature };
        if !features.is_finite() {
            return Err(SketchError::DegenerateGeometry("non-finite feature value".to_string()));
        }

        debug!(
            area = moments.m00,
            contour_points = contour.len(),
            signature_len,
            "extracted features"
        );
        Ok(features)
    }
}
