use image::{GrayImage, Luma};
use imageproc::{
    distance_transform::{distance_transform, Norm},
    region_labelling::{connected_components, Connectivity},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::debug;

use crate::{traits::ClosureValidator, types::BinaryMask};

/// Neighbourhood used when flooding the background
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FillConnectivity {
    /// Background leaks only through edge-adjacent cells, so an
    /// 8-connected stroke seals its interior
    #[default]
    Four,
    Eight,
}

impl From<FillConnectivity> for Connectivity {
    fn from(value: FillConnectivity) -> Self {
        match value {
            FillConnectivity::Four => Connectivity::Four,
            FillConnectivity::Eight => Connectivity::Eight,
        }
    }
}

/// Result of a closure check
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureReport {
    pub closed: bool,
    /// Background cells the border flood could not reach
    pub trapped_pixels: usize,
    /// The stroke itself contains a solid core
    pub solid_core: bool,
    /// Stroke plus trapped interior; equals the stroke when nothing is trapped
    pub filled: BinaryMask,
}

/// Flood-fill closure check.
///
/// Background components touching the image border are flooded. Cells the
/// flood never reaches are sealed off by the stroke. A solid blob with no
/// enclosed background also counts as closed when it is genuinely
/// two-dimensional: its inscribed radius must exceed `solid_core_radius`
/// and reach `solid_core_ratio` of its bounding-box extent. Strokes, thin
/// or thick, fail the second test.
#[derive(Debug, Clone)]
pub struct FloodFillClosureValidator {
    pub connectivity: FillConnectivity,
    /// Zero disables the solid-blob rule
    pub solid_core_radius: u8,
    pub solid_core_ratio: f64,
}

impl Default for FloodFillClosureValidator {
    fn default() -> Self {
        Self {
            connectivity: FillConnectivity::Four,
            solid_core_radius: 4,
            solid_core_ratio: 0.15,
        }
    }
}

impl FloodFillClosureValidator {
    /// Background as foreground, ready for labelling
    fn background(mask: &BinaryMask) -> GrayImage {
        GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
            Luma([if mask.get(x, y) { 0 } else { 255 }])
        })
    }

    /// Marks every background cell connected to the image border
    fn flood_from_border(&self, background: &GrayImage) -> Vec<bool> {
        let labels = connected_components(background, self.connectivity.into(), Luma([0u8]));
        let (width, height) = labels.dimensions();

        let mut open_labels: Vec<bool> = Vec::new();
        let mut mark = |label: u32| {
            let label = label as usize;
            if label == 0 {
                return;
            }
            if open_labels.len() <= label {
                open_labels.resize(label + 1, false);
            }
            open_labels[label] = true;
        };
        for x in 0..width {
            mark(labels.get_pixel(x, 0)[0]);
            mark(labels.get_pixel(x, height - 1)[0]);
        }
        for y in 0..height {
            mark(labels.get_pixel(0, y)[0]);
            mark(labels.get_pixel(width - 1, y)[0]);
        }

        labels
            .pixels()
            .map(|p| open_labels.get(p[0] as usize).copied().unwrap_or(false))
            .collect()
    }

    /// LInf distance from the deepest stroke cell to the background
    fn inscribed_radius(mask: &BinaryMask, background: &GrayImage) -> u8 {
        let distances = distance_transform(background, Norm::LInf);
        mask.foreground()
            .map(|(x, y)| distances.get_pixel(x, y)[0])
            .max()
            .unwrap_or(0)
    }

    fn has_solid_core(&self, mask: &BinaryMask, background: &GrayImage) -> bool {
        if self.solid_core_radius == 0 {
            return false;
        }
        let radius = Self::inscribed_radius(mask, background);
        if radius <= self.solid_core_radius {
            return false;
        }

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
        for (x, y) in mask.foreground() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let extent = (max_x - min_x).max(max_y - min_y) + 1;
        let ratio = f64::from(radius) / f64::from(extent);
        debug!(radius, extent, ratio, "solid core candidate");
        ratio >= self.solid_core_ratio
    }
}

impl ClosureValidator for FloodFillClosureValidator {
    fn validate(&self, mask: &BinaryMask) -> ClosureReport {
        if mask.width() == 0 || mask.height() == 0 || mask.is_empty() {
            return ClosureReport {
                closed: false,
                trapped_pixels: 0,
                solid_core: false,
                filled: mask.clone(),
            };
        }

        let background = Self::background(mask);
        let reached = self.flood_from_border(&background);
        let width = mask.width() as usize;
        let filled = BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
            !reached[y as usize * width + x as usize]
        });
        let trapped_pixels = filled.count() - mask.count();
        let solid_core = trapped_pixels == 0 && self.has_solid_core(mask, &background);
        let closed = trapped_pixels > 0 || solid_core;

        debug!(trapped_pixels, solid_core, closed, "closure check");

        ClosureReport {
            closed,
            trapped_pixels,
            solid_core,
            filled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_outline(size: u32, lo: u32, hi: u32, thickness: u32) -> BinaryMask {
        BinaryMask::from_fn(size, size, |x, y| {
            let inside = (lo..=hi).contains(&x) && (lo..=hi).contains(&y);
            let core = (lo + thickness..=hi - thickness).contains(&x)
                && (lo + thickness..=hi - thickness).contains(&y);
            inside && !core
        })
    }

    #[test]
    fn test_filled_square_is_closed() {
        let mask = BinaryMask::from_fn(64, 64, |x, y| (16..48).contains(&x) && (16..48).contains(&y));
        let report = FloodFillClosureValidator::default().validate(&mask);
        assert!(report.closed);
        assert!(report.solid_core);
        assert_eq!(report.trapped_pixels, 0);
        assert_eq!(report.filled, mask);
    }

    #[test]
    fn test_square_outline_is_closed_and_filled() {
        let mask = square_outline(64, 10, 50, 2);
        let report = FloodFillClosureValidator::default().validate(&mask);
        assert!(report.closed);
        assert!(!report.solid_core);
        // Interior spans 12..=48 on both axes
        assert_eq!(report.trapped_pixels, 37 * 37);
        assert_eq!(report.filled.count(), 41 * 41);
    }

    #[test]
    fn test_one_pixel_gap_is_open() {
        let mut mask = square_outline(64, 10, 50, 1);
        mask.set(30, 10, false);
        let report = FloodFillClosureValidator::default().validate(&mask);
        assert!(!report.closed);
        assert_eq!(report.trapped_pixels, 0);
        assert_eq!(report.filled, mask);
    }

    #[test]
    fn test_diagonal_stroke_seals_only_with_four_connectivity() {
        let mask = BinaryMask::from_fn(64, 64, |x, y| {
            (x as i64 - 32).abs() + (y as i64 - 32).abs() == 20
        });

        let four = FloodFillClosureValidator::default().validate(&mask);
        assert!(four.closed);

        let eight = FloodFillClosureValidator {
            connectivity: FillConnectivity::Eight,
            ..Default::default()
        }
        .validate(&mask);
        assert!(!eight.closed);
    }

    #[test]
    fn test_thin_open_stroke_has_no_core() {
        let mask = BinaryMask::from_fn(64, 64, |x, y| (10..54).contains(&x) && (30..33).contains(&y));
        let report = FloodFillClosureValidator::default().validate(&mask);
        assert!(!report.closed);
        assert!(!report.solid_core);
    }

    #[test]
    fn test_thick_open_stroke_is_not_solid() {
        // Half-width 6 diagonal stroke, thick enough to survive a radius-4 erosion
        let (a, b) = ([20.0f64, 30.0f64], [110.0f64, 100.0f64]);
        let (vx, vy) = (b[0] - a[0], b[1] - a[1]);
        let len2 = vx * vx + vy * vy;
        let mask = BinaryMask::from_fn(128, 128, |x, y| {
            let (px, py) = (x as f64 - a[0], y as f64 - a[1]);
            let t = ((px * vx + py * vy) / len2).clamp(0.0, 1.0);
            (px - t * vx).hypot(py - t * vy) <= 6.0
        });
        let eroded = imageproc::morphology::erode(mask.as_gray(), Norm::LInf, 4);
        assert!(eroded.pixels().any(|p| p[0] > 0));

        let report = FloodFillClosureValidator::default().validate(&mask);
        assert!(!report.solid_core);
        assert!(!report.closed);
        assert_eq!(report.filled, mask);
    }

    #[test]
    fn test_filled_disk_and_triangle_are_solid() {
        let disk = BinaryMask::from_fn(128, 128, |x, y| {
            let (dx, dy) = (x as f64 - 64.3, y as f64 - 60.8);
            dx * dx + dy * dy <= 30.0 * 30.0
        });
        assert!(FloodFillClosureValidator::default().validate(&disk).solid_core);

        // Equilateral-ish triangle, apex up
        let triangle = BinaryMask::from_fn(128, 128, |x, y| {
            let (x, y) = (x as f64, y as f64);
            y <= 100.0 && y >= 20.0 && (x - 64.0).abs() <= (y - 20.0) * 0.577
        });
        let report = FloodFillClosureValidator::default().validate(&triangle);
        assert!(report.solid_core);
        assert!(report.closed);
    }

    #[test]
    fn test_solid_core_ratio_is_configurable() {
        let mask = BinaryMask::from_fn(64, 64, |x, y| (16..48).contains(&x) && (16..48).contains(&y));
        let strict = FloodFillClosureValidator {
            solid_core_ratio: 0.9,
            ..Default::default()
        };
        assert!(!strict.validate(&mask).closed);

        let disabled = FloodFillClosureValidator {
            solid_core_radius: 0,
            ..Default::default()
        };
        assert!(!disabled.validate(&mask).closed);
    }

    #[test]
    fn test_stroke_touching_border_keeps_interior_sealed() {
        // Outline clipped by the image edge still seals what it encloses
        let mask = square_outline(32, 0, 31, 1);
        let report = FloodFillClosureValidator::default().validate(&mask);
        assert!(report.closed);
        assert_eq!(report.trapped_pixels, 30 * 30);
    }

    #[test]
    fn test_empty_mask_is_open() {
        let report = FloodFillClosureValidator::default().validate(&BinaryMask::new(32, 32));
        assert!(!report.closed);
        assert!(report.filled.is_empty());
    }
}
