use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    database::DescriptorDatabase,
    error::{Result, SketchError},
    types::{Descriptor, FeatureVector},
};

/// Distances closer than this count as ties; the earlier descriptor wins
pub const TIE_TOLERANCE: f64 = 1e-12;

/// Norm over the seven Hu values
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HuNorm {
    #[default]
    Euclidean,
    L1,
}

/// Metric over the overlapping part of two signatures
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignatureMetric {
    #[default]
    Euclidean,
    /// Root mean square over compared positions only
    Rms,
    L1,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistanceWeights {
    pub hu: f64,
    pub signature: f64,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self { hu: 1.0, signature: 1.0 }
    }
}

/// One candidate descriptor and its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub index: usize,
    pub descriptor: &'a Descriptor,
    pub distance: f64,
}

impl Match<'_> {
    pub fn label(&self) -> &str {
        &self.descriptor.label
    }
}

/// 1-nearest-neighbour classifier over a weighted Hu + signature distance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Classifier {
    pub weights: DistanceWeights,
    pub hu_norm: HuNorm,
    pub signature_metric: SignatureMetric,
}

impl Classifier {
    pub fn hu_distance(&self, query: &FeatureVector, descriptor: &Descriptor) -> f64 {
        let diffs = query
            .hu_moments
            .iter()
            .zip(descriptor.hu_moments.iter())
            .map(|(a, b)| a - b);
        match self.hu_norm {
            HuNorm::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            HuNorm::L1 => diffs.map(f64::abs).sum(),
        }
    }

    /// Compares only positions both signatures actually carry; padding never counts
    pub fn signature_distance(&self, query: &FeatureVector, descriptor: &Descriptor) -> f64 {
        let reference = descriptor.effective_signature();
        let compared = query.signature.len().min(reference.len());
        if compared == 0 {
            return 0.0;
        }
        let diffs = query.signature[..compared]
            .iter()
            .zip(reference[..compared].iter())
            .map(|(a, b)| a - b);
        match self.signature_metric {
            SignatureMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            SignatureMetric::Rms => (diffs.map(|d| d * d).sum::<f64>() / compared as f64).sqrt(),
            SignatureMetric::L1 => diffs.map(f64::abs).sum(),
        }
    }

    pub fn distance(&self, query: &FeatureVector, descriptor: &Descriptor) -> f64 {
        self.weights.hu * self.hu_distance(query, descriptor)
            + self.weights.signature * self.signature_distance(query, descriptor)
    }

    /// Nearest descriptor; `None` means no database has been loaded yet.
    ///
    /// Descriptors at a non-finite distance are never selected.
    pub fn classify<'a>(
        &self,
        query: &FeatureVector,
        database: Option<&'a DescriptorDatabase>,
    ) -> Result<Match<'a>> {
        let database = database.ok_or(SketchError::NotInitialized)?;
        if database.is_empty() {
            return Err(SketchError::EmptyDatabase);
        }
        if !query.is_finite() {
            return Err(SketchError::DegenerateGeometry("query has non-finite features".to_string()));
        }

        let mut best: Option<Match<'a>> = None;
        for (index, descriptor) in database.iter().enumerate() {
            let distance = self.distance(query, descriptor);
            if !distance.is_finite() {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance < b.distance - TIE_TOLERANCE) {
                best = Some(Match { index, descriptor, distance });
            }
        }

        best.ok_or_else(|| SketchError::DegenerateGeometry("no descriptor at a finite distance".to_string()))
    }

    /// Every descriptor at a finite distance, nearest first; equal distances
    /// keep database order
    pub fn rank<'a>(&self, query: &FeatureVector, database: &'a DescriptorDatabase) -> Vec<Match<'a>> {
        let mut matches: Vec<Match<'a>> = database
            .iter()
            .enumerate()
            .map(|(index, descriptor)| Match {
                index,
                descriptor,
                distance: self.distance(query, descriptor),
            })
            .filter(|m| m.distance.is_finite())
            .collect();
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HU_MOMENT_COUNT;

    fn query(hu0: f64, signature: Vec<f64>) -> FeatureVector {
        let mut hu_moments = [30.0; HU_MOMENT_COUNT];
        hu_moments[0] = hu0;
        FeatureVector { hu_moments, signature }
    }

    fn descriptor(label: &str, hu0: f64, signature: Vec<f64>) -> Descriptor {
        let mut hu_moments = [30.0; HU_MOMENT_COUNT];
        hu_moments[0] = hu0;
        Descriptor::new(label, hu_moments, signature)
    }

    fn database() -> DescriptorDatabase {
        DescriptorDatabase::new(vec![
            descriptor("Circle", 0.80, vec![1.0, 0.99, 0.98, 0.99]),
            descriptor("Square", 0.78, vec![1.0, 0.85, 0.71, 0.85]),
            descriptor("Triangle", 0.70, vec![1.0, 0.6, 0.5]),
        ])
    }

    #[test]
    fn test_nearest_label_wins() {
        let db = database();
        let classifier = Classifier::default();
        let result = classifier
            .classify(&query(0.79, vec![1.0, 0.86, 0.72, 0.84]), Some(&db))
            .expect("Should classify");
        assert_eq!(result.label(), "Square");
        assert_eq!(result.index, 1);
    }

    #[test]
    fn test_not_initialized_and_empty() {
        let classifier = Classifier::default();
        let q = query(0.8, vec![1.0]);
        assert!(matches!(classifier.classify(&q, None), Err(SketchError::NotInitialized)));

        let empty = DescriptorDatabase::default();
        assert!(matches!(classifier.classify(&q, Some(&empty)), Err(SketchError::EmptyDatabase)));
    }

    #[test]
    fn test_tie_keeps_first_descriptor() {
        let db = DescriptorDatabase::new(vec![
            descriptor("Up", 1.0, vec![]),
            descriptor("Down", 3.0, vec![]),
        ]);
        let result = Classifier::default()
            .classify(&query(2.0, vec![]), Some(&db))
            .expect("Should classify");
        assert_eq!(result.label(), "Up");
        assert!((result.distance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_descriptor_always_wins() {
        let db = DescriptorDatabase::new(vec![descriptor("Only", 0.1, vec![0.3, 0.2])]);
        let result = Classifier::default()
            .classify(&query(25.0, vec![1.0, 1.0, 1.0]), Some(&db))
            .expect("Should classify");
        assert_eq!(result.label(), "Only");
    }

    #[test]
    fn test_padding_excluded_from_signature_distance() {
        let db = database();
        let triangle = &db.descriptors()[2];
        assert_eq!(triangle.signature.len(), 4);

        let q = query(0.70, vec![1.0, 0.6, 0.5, 0.9]);
        let classifier = Classifier { signature_metric: SignatureMetric::Rms, ..Default::default() };
        // Only the three real positions are compared, all equal
        assert_eq!(classifier.signature_distance(&q, triangle), 0.0);
    }

    #[test]
    fn test_non_finite_distance_never_wins() {
        // Hu weight of zero times an overflowing Hu distance gives NaN
        let classifier = Classifier {
            weights: DistanceWeights { hu: 0.0, signature: 1.0 },
            ..Default::default()
        };
        let db = DescriptorDatabase::new(vec![
            descriptor("Huge", f64::MAX, vec![1.0, 0.99, 0.98, 0.99]),
            descriptor("Circle", 0.80, vec![1.0, 0.9, 0.9, 0.9]),
        ]);
        let q = query(0.80, vec![1.0, 0.99, 0.98, 0.99]);
        assert!(classifier.distance(&q, &db.descriptors()[0]).is_nan());

        let result = classifier.classify(&q, Some(&db)).expect("Should classify");
        assert_eq!(result.label(), "Circle");
        assert!(result.distance.is_finite());

        let ranked = classifier.rank(&q, &db);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label(), "Circle");
    }

    #[test]
    fn test_no_finite_distance_is_degenerate() {
        let classifier = Classifier {
            weights: DistanceWeights { hu: 0.0, signature: 1.0 },
            ..Default::default()
        };
        let db = DescriptorDatabase::new(vec![descriptor("Huge", f64::MAX, vec![])]);
        let result = classifier.classify(&query(0.80, vec![]), Some(&db));
        assert!(matches!(result, Err(SketchError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_signature_len_longer_than_signature() {
        let mut short = descriptor("Short", 0.8, vec![1.0, 0.9, 0.8]);
        short.signature_len = 10;
        let q = query(0.8, vec![1.0; 12]);
        let classifier = Classifier { signature_metric: SignatureMetric::L1, ..Default::default() };
        let distance = classifier.signature_distance(&q, &short);
        assert!((distance - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_metrics() {
        let d = descriptor("A", 0.0, vec![0.0, 0.0, 0.0, 0.0]);
        let q = query(3.0, vec![1.0, 1.0, 1.0, 1.0]);

        let euclid = Classifier::default();
        assert_eq!(euclid.signature_distance(&q, &d), 2.0);
        assert_eq!(euclid.hu_distance(&q, &d), 3.0);

        let rms = Classifier { signature_metric: SignatureMetric::Rms, ..Default::default() };
        assert_eq!(rms.signature_distance(&q, &d), 1.0);

        let l1 = Classifier {
            hu_norm: HuNorm::L1,
            signature_metric: SignatureMetric::L1,
            weights: DistanceWeights { hu: 2.0, signature: 0.5 },
        };
        assert_eq!(l1.distance(&q, &d), 2.0 * 3.0 + 0.5 * 4.0);
    }

    #[test]
    fn test_rank_orders_all_descriptors() {
        let db = database();
        let ranked = Classifier::default().rank(&query(0.80, vec![1.0, 0.99, 0.98, 0.99]), &db);
        let labels: Vec<&str> = ranked.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["Circle", "Square", "Triangle"]);
        assert_eq!(ranked[0].distance, 0.0);
    }

    #[test]
    fn test_metric_names_parse() {
        assert_eq!("rms".parse::<SignatureMetric>().ok(), Some(SignatureMetric::Rms));
        assert_eq!("l1".parse::<HuNorm>().ok(), Some(HuNorm::L1));
        assert_eq!(SignatureMetric::Euclidean.to_string(), "euclidean");
    }
}
