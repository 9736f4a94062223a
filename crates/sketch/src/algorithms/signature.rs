use geo::Area;
use geo_types::{Coord, LineString, Polygon};
use imageproc::contours::{find_contours, BorderType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{Result, SketchError},
    types::BinaryMask,
};

/// Divisor applied to the raw centroid distances
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignatureNormalization {
    /// Largest radius becomes 1.0
    #[default]
    Max,
    /// Mean radius becomes 1.0
    Mean,
}

fn polygon_of(points: &[[f64; 2]]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = points.iter().map(|&[x, y]| Coord { x, y }).collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Outer border of the largest region, oriented counter-clockwise.
///
/// Returns `None` when the mask has no foreground.
pub fn outer_contour(region: &BinaryMask) -> Option<Vec<[f64; 2]>> {
    let contours = find_contours::<i32>(region.as_gray());

    let mut best: Option<(f64, Vec<[f64; 2]>)> = None;
    for contour in contours.into_iter().filter(|c| c.border_type == BorderType::Outer) {
        let points: Vec<[f64; 2]> = contour
            .points
            .iter()
            .map(|p| [p.x as f64, p.y as f64])
            .collect();
        let area = polygon_of(&points).unsigned_area();
        let better = match &best {
            None => true,
            Some((best_area, best_points)) => {
                area > *best_area || (area == *best_area && points.len() > best_points.len())
            }
        };
        if better {
            best = Some((area, points));
        }
    }

    best.map(|(_, mut points)| {
        if polygon_of(&points).signed_area() < 0.0 {
            points.reverse();
        }
        points
    })
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Closed-contour perimeter
pub fn perimeter(contour: &[[f64; 2]]) -> f64 {
    let n = contour.len();
    (0..n).map(|i| distance(contour[i], contour[(i + 1) % n])).sum()
}

/// Centroid distances sampled at `len` equal arc-length steps.
///
/// Sampling starts at the contour vertex farthest from `centroid` (the first
/// one on ties) and walks the contour in its stored orientation, so
/// congruent shapes yield cyclically aligned sequences.
pub fn radial_signature(
    contour: &[[f64; 2]],
    centroid: [f64; 2],
    len: usize,
    normalization: SignatureNormalization,
) -> Result<Vec<f64>> {
    let total = perimeter(contour);
    if total <= 0.0 || !total.is_finite() {
        return Err(SketchError::DegenerateGeometry(format!(
            "contour of {} points has no perimeter",
            contour.len()
        )));
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut start = 0;
    let mut start_radius = f64::NEG_INFINITY;
    for (i, &point) in contour.iter().enumerate() {
        let r = distance(point, centroid);
        if r > start_radius {
            start_radius = r;
            start = i;
        }
    }
    let mut ring = contour.to_vec();
    ring.rotate_left(start);

    let n = ring.len();
    let step = total / len as f64;
    let mut radii = Vec::with_capacity(len);
    let mut segment = 0;
    let mut walked = 0.0;
    for k in 0..len {
        let target = k as f64 * step;
        let mut seg_len = distance(ring[segment], ring[(segment + 1) % n]);
        while walked + seg_len < target && segment + 1 < n {
            walked += seg_len;
            segment += 1;
            seg_len = distance(ring[segment], ring[(segment + 1) % n]);
        }
        let a = ring[segment];
        let b = ring[(segment + 1) % n];
        let t = if seg_len > 0.0 { ((target - walked) / seg_len).clamp(0.0, 1.0) } else { 0.0 };
        let point = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
        radii.push(distance(point, centroid));
    }

    let divisor = match normalization {
        SignatureNormalization::Max => radii.iter().cloned().fold(0.0, f64::max),
        SignatureNormalization::Mean => radii.iter().sum::<f64>() / len as f64,
    };
    if divisor <= 0.0 || !divisor.is_finite() {
        return Err(SketchError::DegenerateGeometry(
            "boundary collapses onto the centroid".to_string(),
        ));
    }

    Ok(radii.into_iter().map(|r| r / divisor).collect())
}
