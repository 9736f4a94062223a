use image::{imageops::FilterType, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sketch::{ConfusionMatrix, RecognizerConfig, ShapeRecognizer, SketchError, NO_FIGURE_LABEL};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Sketch(#[from] SketchError),
    #[error("No descriptor file given. Use --descriptors or set 'descriptors' in the profile")]
    MissingDescriptors,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

fn default_canvas_size() -> u32 {
    256
}

/// Recognizer profile for the command line
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Profile {
    /// Descriptor file, delimited text or cached JSON
    #[serde(default)]
    pub descriptors: Option<PathBuf>,
    /// Drawings are resized to a square canvas of this side before analysis
    #[serde(default = "default_canvas_size")]
    #[schemars(range(min = 16, max = 4096))]
    pub canvas_size: u32,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            descriptors: None,
            canvas_size: default_canvas_size(),
            recognizer: RecognizerConfig::default(),
        }
    }
}

impl Profile {
    /// Load a profile from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a profile from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a profile from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a profile from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load the profile
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// The given profile file, or the defaults when none is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Convert the profile to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert the profile to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Get the JSON schema of the profile file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Profile)
    }

    /// Build a recognizer and load the descriptor file.
    ///
    /// `descriptors` overrides the file named in the profile.
    pub fn recognizer(&self, descriptors: Option<&Path>) -> Result<ShapeRecognizer, CliError> {
        let path = descriptors
            .or(self.descriptors.as_deref())
            .ok_or(CliError::MissingDescriptors)?;

        let recognizer = self.recognizer.build_recognizer();
        let report = recognizer.load_file(path)?;
        info!(
            path = %path.display(),
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "descriptors ready"
        );
        Ok(recognizer)
    }

    /// Load a drawing and bring it to the canvas size
    pub fn load_drawing<P: AsRef<Path>>(&self, path: P) -> Result<RgbaImage, CliError> {
        let image = sketch::load_image(path)?;
        Ok(fit_canvas(image, self.canvas_size))
    }
}

/// Resize a drawing to a square canvas, the way reference drawings were captured
pub fn fit_canvas(image: RgbaImage, canvas_size: u32) -> RgbaImage {
    if image.width() == canvas_size && image.height() == canvas_size {
        return image;
    }
    image::imageops::resize(&image, canvas_size, canvas_size, FilterType::Triangle)
}

/// Label shown for a classification attempt; a blank drawing is not an error
pub fn display_label(result: sketch::Result<sketch::ClassificationResult>) -> Result<String, CliError> {
    match result {
        Ok(result) => Ok(result.predicted_label),
        Err(SketchError::NoShapeDetected) => Ok(NO_FIGURE_LABEL.to_string()),
        Err(err) => Err(err.into()),
    }
}

fn is_drawing(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
}

/// Drawings under `root/<label>/`, sorted by label then file name
pub fn collect_labelled_drawings<P: AsRef<Path>>(root: P) -> Result<Vec<(String, PathBuf)>, CliError> {
    let mut samples = Vec::new();
    for entry in fs::read_dir(root)? {
        let dir = entry?.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(label) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        for file in fs::read_dir(&dir)? {
            let path = file?.path();
            if path.is_file() && is_drawing(&path) {
                samples.push((label.clone(), path));
            }
        }
    }
    samples.sort();
    Ok(samples)
}

/// Classify every labelled drawing and tally the outcomes
pub fn evaluate(
    profile: &Profile,
    recognizer: &ShapeRecognizer,
    samples: &[(String, PathBuf)],
) -> Result<ConfusionMatrix, CliError> {
    let mut matrix = ConfusionMatrix::new();
    for (expected, path) in samples {
        let drawing = profile.load_drawing(path)?;
        let predicted = display_label(recognizer.classify(&drawing))?;
        debug!(path = %path.display(), %expected, %predicted, "evaluated drawing");
        matrix.record(expected, &predicted);
    }
    Ok(matrix)
}
