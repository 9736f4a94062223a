use image::{Luma, Rgba, RgbaImage};
use imageproc::{
    distance_transform::Norm,
    region_labelling::{connected_components, Connectivity},
};
use crate::{
    error::Result,
    traits::{Binarizer, MaskRefiner},
    types::BinaryMask,
};

/// Colour-distance binarizer for strokes drawn on a known background.
///
/// Pixels are composited over `background` using their alpha, then a cell
/// is foreground when any channel differs from the background by more than
/// `threshold`. The threshold absorbs anti-aliased stroke edges.
#[derive(Debug, Clone)]
pub struct BackgroundThresholdBinarizer {
    pub background: [u8; 3],
    pub threshold: u8,
}

impl Default for BackgroundThresholdBinarizer {
    fn default() -> Self {
        // White strokes on a black canvas
        Self { background: [0, 0, 0], threshold: 64 }
    }
}

impl BackgroundThresholdBinarizer {
    fn composite(&self, pixel: &Rgba<u8>) -> [u8; 3] {
        let alpha = pixel[3] as u32;
        let mut out = [0u8; 3];
        for (c, slot) in out.iter_mut().enumerate() {
            let fg = pixel[c] as u32 * alpha;
            let bg = self.background[c] as u32 * (255 - alpha);
            *slot = ((fg + bg + 127) / 255) as u8;
        }
        out
    }

    fn is_foreground(&self, pixel: &Rgba<u8>) -> bool {
        let color = self.composite(pixel);
        color
            .iter()
            .zip(self.background.iter())
            .map(|(&c, &b)| c.abs_diff(b))
            .max()
            .unwrap_or(0)
            > self.threshold
    }
}

impl Binarizer for BackgroundThresholdBinarizer {
    fn binarize(&self, image: &RgbaImage) -> Result<BinaryMask> {
        Ok(BinaryMask::from_fn(image.width(), image.height(), |x, y| {
            self.is_foreground(image.get_pixel(x, y))
        }))
    }
}

/// Grayscale, Gaussian blur, then Otsu's global threshold
#[derive(Debug, Clone)]
pub struct OtsuBinarizer {
    pub blur_sigma: f32,
    /// Strokes are darker than the background
    pub dark_foreground: bool,
}

impl Default for OtsuBinarizer {
    fn default() -> Self {
        Self { blur_sigma: 1.1, dark_foreground: false }
    }
}

impl Binarizer for OtsuBinarizer {
    fn binarize(&self, image: &RgbaImage) -> Result<BinaryMask> {
        let gray = image::imageops::grayscale(image);
        let blurred = if self.blur_sigma > 0.0 {
            imageproc::filter::gaussian_blur_f32(&gray, self.blur_sigma)
        } else {
            gray
        };

        // A uniform frame has no stroke; Otsu would split it arbitrarily
        let (min, max) = blurred
            .as_raw()
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min >= max {
            return Ok(BinaryMask::new(image.width(), image.height()));
        }

        let level = imageproc::contrast::otsu_level(&blurred);
        Ok(BinaryMask::from_fn(blurred.width(), blurred.height(), |x, y| {
            let v = blurred.get_pixel(x, y)[0];
            if self.dark_foreground { v <= level } else { v > level }
        }))
    }
}

/// Morphological closing to seal small gaps left by a fast stroke
#[derive(Debug, Clone)]
pub struct MorphologicalClose {
    pub radius: u8,
    pub iterations: usize,
}

impl Default for MorphologicalClose {
    fn default() -> Self {
        // Matches a 7x7 structuring element applied twice
        Self { radius: 3, iterations: 2 }
    }
}

impl MaskRefiner for MorphologicalClose {
    fn refine(&self, mask: &BinaryMask) -> Result<BinaryMask> {
        let mut image = mask.as_gray().clone();
        for _ in 0..self.iterations {
            image = imageproc::morphology::close(&image, Norm::LInf, self.radius);
        }
        Ok(BinaryMask::from_gray(&image))
    }
}

/// Keeps only the largest 8-connected foreground component
#[derive(Debug, Clone, Default)]
pub struct LargestComponentFilter;

impl MaskRefiner for LargestComponentFilter {
    fn refine(&self, mask: &BinaryMask) -> Result<BinaryMask> {
        let labels = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));

        let mut sizes: Vec<usize> = Vec::new();
        for label in labels.pixels().map(|p| p[0] as usize).filter(|&l| l > 0) {
            if sizes.len() < label {
                sizes.resize(label, 0);
            }
            sizes[label - 1] += 1;
        }

        // Ties keep the component met first in raster order
        let mut best: Option<(usize, usize)> = None;
        for (index, &size) in sizes.iter().enumerate() {
            if best.is_none_or(|(_, best_size)| size > best_size) {
                best = Some((index + 1, size));
            }
        }

        let Some((keep, _)) = best else {
            return Ok(mask.clone());
        };
        let keep = keep as u32;
        Ok(BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
            labels.get_pixel(x, y)[0] == keep
        }))
    }
}
