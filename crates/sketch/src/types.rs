use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Number of Hu invariants in every descriptor and feature vector.
pub const HU_MOMENT_COUNT: usize = 7;

/// Label front ends show when a drawing contains no figure.
pub const NO_FIGURE_LABEL: &str = "No figure";

/// Foreground/background grid backed by a 0/255 grayscale buffer so that
/// `imageproc` routines can run on it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pixels: GrayImage,
}

impl BinaryMask {
    pub const FOREGROUND: u8 = 255;
    pub const BACKGROUND: u8 = 0;

    /// All-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: GrayImage::new(width, height) }
    }

    /// Build a mask from a predicate over pixel coordinates
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> bool,
    {
        let pixels = GrayImage::from_fn(width, height, |x, y| {
            if f(x, y) { Luma([Self::FOREGROUND]) } else { Luma([Self::BACKGROUND]) }
        });
        Self { pixels }
    }

    /// Treat every non-zero pixel of a grayscale image as foreground
    pub fn from_gray(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] > 0)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] > 0
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { Self::FOREGROUND } else { Self::BACKGROUND };
        self.pixels.put_pixel(x, y, Luma([value]));
    }

    /// Number of foreground cells
    pub fn count(&self) -> usize {
        self.pixels.as_raw().iter().filter(|&&v| v > 0).count()
    }

    /// True when there is no foreground at all
    pub fn is_empty(&self) -> bool {
        self.pixels.as_raw().iter().all(|&v| v == 0)
    }

    /// Coordinates of every foreground cell in row-major order
    pub fn foreground(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.pixels
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_gray(self) -> GrayImage {
        self.pixels
    }
}

/// A labelled reference shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub label: String,
    pub hu_moments: [f64; HU_MOMENT_COUNT],
    /// Radial signature, zero-padded to the database's signature length
    pub signature: Vec<f64>,
    /// Number of leading signature values that carry information
    pub signature_len: usize,
}

impl Descriptor {
    pub fn new(label: impl Into<String>, hu_moments: [f64; HU_MOMENT_COUNT], signature: Vec<f64>) -> Self {
        let signature_len = signature.len();
        Self {
            label: label.into(),
            hu_moments,
            signature,
            signature_len,
        }
    }

    /// The informative part of the signature, padding excluded
    pub fn effective_signature(&self) -> &[f64] {
        &self.signature[..self.signature_len.min(self.signature.len())]
    }

    pub fn is_finite(&self) -> bool {
        self.hu_moments.iter().chain(self.signature.iter()).all(|v| v.is_finite())
    }

    /// Zero-pad the signature up to `len` without changing its effective length
    pub(crate) fn pad_to(&mut self, len: usize) {
        if self.signature.len() < len {
            self.signature.resize(len, 0.0);
        }
    }
}

/// Features computed from one drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub hu_moments: [f64; HU_MOMENT_COUNT],
    pub signature: Vec<f64>,
}

impl FeatureVector {
    pub fn is_finite(&self) -> bool {
        self.hu_moments.iter().chain(self.signature.iter()).all(|v| v.is_finite())
    }
}

/// Outcome of classifying one drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predicted_label: String,
    pub features: FeatureVector,
    /// Whether the drawing formed a sealed region. Advisory only.
    pub closed: bool,
    /// Combined distance to the winning descriptor
    pub distance: f64,
}
