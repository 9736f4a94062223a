use std::{
    path::Path,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use image::RgbaImage;
use tracing::debug;

use crate::{
    classifier::Classifier,
    database::{DescriptorDatabase, DescriptorStore},
    error::{Result, SketchError},
    io::{load_descriptor_file, LoadReport},
    pipeline::{builder::PipelineBuilder, Analysis, Pipeline},
    types::{ClassificationResult, FeatureVector, HU_MOMENT_COUNT},
};

const CLOSURE_UNKNOWN: u8 = 0;
const CLOSURE_OPEN: u8 = 1;
const CLOSURE_CLOSED: u8 = 2;

/// Load a drawing from disk as RGBA
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Decode an in-memory PNG/JPEG drawing as RGBA
pub fn load_image_from_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Drawing in, label out.
///
/// Owns the analysis pipeline, the classifier settings and a handle to the
/// descriptor store. Remembers whether the most recently classified drawing
/// was closed.
pub struct ShapeRecognizer {
    store: DescriptorStore,
    pipeline: Arc<Pipeline>,
    classifier: Classifier,
    last_closed: AtomicU8,
}

impl ShapeRecognizer {
    pub fn new() -> Self {
        Self::with_pipeline(PipelineBuilder::new().build())
    }

    /// Create a recognizer around a custom pipeline
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            store: DescriptorStore::new(),
            pipeline: Arc::new(pipeline),
            classifier: Classifier::default(),
            last_closed: AtomicU8::new(CLOSURE_UNKNOWN),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Share an existing store, e.g. one reloaded from another thread
    pub fn with_store(mut self, store: DescriptorStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Replace the descriptor database
    pub fn load_descriptors(&self, database: DescriptorDatabase) -> Arc<DescriptorDatabase> {
        self.store.load(database)
    }

    /// Bulk-load parallel label / Hu / signature tables
    pub fn load_tables(
        &self,
        labels: Vec<String>,
        hu_table: Vec<[f64; HU_MOMENT_COUNT]>,
        signature_table: Vec<Vec<f64>>,
    ) -> Result<Arc<DescriptorDatabase>> {
        self.store.load_tables(labels, hu_table, signature_table)
    }

    /// Load descriptors from a file.
    ///
    /// `.json` files are read as a cached database, anything else as
    /// delimited text.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadReport> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let (database, report) = if is_json {
            let database = DescriptorDatabase::load_json(path)?;
            let report = LoadReport { loaded: database.len(), skipped: Vec::new() };
            (database, report)
        } else {
            load_descriptor_file(path)?
        };

        self.store.load(database);
        Ok(report)
    }

    /// Whether the last classified drawing sealed a region; `None` before
    /// the first classification or after a drawing with no shape
    pub fn last_closed(&self) -> Option<bool> {
        match self.last_closed.load(Ordering::Acquire) {
            CLOSURE_OPEN => Some(false),
            CLOSURE_CLOSED => Some(true),
            _ => None,
        }
    }

    fn signature_len_for(&self, database: Option<&DescriptorDatabase>) -> usize {
        database
            .map(DescriptorDatabase::signature_len)
            .filter(|&len| len > 0)
            .unwrap_or_else(|| self.pipeline.default_signature_len())
    }

    /// Run the pipeline with the signature length of the current database
    pub fn analyze(&self, image: &RgbaImage) -> Result<Analysis> {
        let snapshot = self.store.snapshot();
        let signature_len = self.signature_len_for(snapshot.as_deref());
        self.pipeline.analyze(image, Some(signature_len))
    }

    /// Features of a drawing, usable as a new descriptor row
    pub fn extract_features(&self, image: &RgbaImage) -> Result<FeatureVector> {
        Ok(self.analyze(image)?.features)
    }

    fn record_closure(&self, closed: Option<bool>) {
        let state = match closed {
            Some(true) => CLOSURE_CLOSED,
            Some(false) => CLOSURE_OPEN,
            None => CLOSURE_UNKNOWN,
        };
        self.last_closed.store(state, Ordering::Release);
    }

    /// Snapshot the database first so one call never mixes two reloads
    fn analyze_with_snapshot(&self, image: &RgbaImage) -> Result<(Arc<DescriptorDatabase>, Analysis)> {
        let database = self.store.snapshot().ok_or(SketchError::NotInitialized)?;
        let signature_len = self.signature_len_for(Some(&*database));

        match self.pipeline.analyze(image, Some(signature_len)) {
            Ok(analysis) => {
                self.record_closure(Some(analysis.closure.closed));
                Ok((database, analysis))
            }
            Err(err) => {
                self.record_closure(None);
                Err(err)
            }
        }
    }

    /// Classify a drawing against the current database
    pub fn classify(&self, image: &RgbaImage) -> Result<ClassificationResult> {
        let (database, analysis) = self.analyze_with_snapshot(image)?;
        let best = self.classifier.classify(&analysis.features, Some(&*database))?;

        debug!(
            label = best.label(),
            distance = best.distance,
            closed = analysis.closure.closed,
            "classified drawing"
        );

        Ok(ClassificationResult {
            predicted_label: best.label().to_string(),
            features: analysis.features,
            closed: analysis.closure.closed,
            distance: best.distance,
        })
    }

    /// The `top` nearest labels with their distances, nearest first
    pub fn rank(&self, image: &RgbaImage, top: usize) -> Result<Vec<(String, f64)>> {
        let (database, analysis) = self.analyze_with_snapshot(image)?;
        if database.is_empty() {
            return Err(SketchError::EmptyDatabase);
        }
        Ok(self
            .classifier
            .rank(&analysis.features, &database)
            .into_iter()
            .take(top)
            .map(|m| (m.label().to_string(), m.distance))
            .collect())
    }
}

impl Default for ShapeRecognizer {
    fn default() -> Self {
        Self::new()
    }
}
