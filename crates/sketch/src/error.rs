use thiserror::Error;

#[derive(Error, Debug)]
pub enum SketchError {
    #[error("No descriptor database loaded")]
    NotInitialized,

    #[error("Descriptor database is empty")]
    EmptyDatabase,

    #[error("No shape detected in the image")]
    NoShapeDetected,

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Malformed descriptor record at line {line}: {reason}")]
    MalformedDescriptorRecord { line: usize, reason: String },

    #[error("Descriptor tables disagree: {labels} labels, {hu_rows} Hu rows, {signature_rows} signature rows")]
    TableShapeMismatch {
        labels: usize,
        hu_rows: usize,
        signature_rows: usize,
    },

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SketchError>;
