//! Image moments and Hu invariants of a binary region.
//!
//! Pixels are treated as unit masses at their integer coordinates, the same
//! convention as binary-image moments in OpenCV. Central moments are
//! accumulated relative to the centroid in a second pass, which keeps them
//! exact for symmetric shapes on integer centres.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{BinaryMask, HU_MOMENT_COUNT};

/// Area, centroid and central moments up to third order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralMoments {
    pub m00: f64,
    pub cx: f64,
    pub cy: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
    pub mu30: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu03: f64,
}

/// Scale-normalized central moments (eta_pq)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMoments {
    pub nu20: f64,
    pub nu11: f64,
    pub nu02: f64,
    pub nu30: f64,
    pub nu21: f64,
    pub nu12: f64,
    pub nu03: f64,
}

impl CentralMoments {
    /// Returns `None` for a region without foreground
    pub fn from_mask(mask: &BinaryMask) -> Option<Self> {
        let (mut m00, mut m10, mut m01) = (0.0f64, 0.0f64, 0.0f64);
        for (x, y) in mask.foreground() {
            m00 += 1.0;
            m10 += x as f64;
            m01 += y as f64;
        }
        if m00 == 0.0 {
            return None;
        }

        let cx = m10 / m00;
        let cy = m01 / m00;
        let mut moments = Self {
            m00,
            cx,
            cy,
            mu20: 0.0,
            mu11: 0.0,
            mu02: 0.0,
            mu30: 0.0,
            mu21: 0.0,
            mu12: 0.0,
            mu03: 0.0,
        };

        for (x, y) in mask.foreground() {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let (dx2, dy2) = (dx * dx, dy * dy);
            moments.mu20 += dx2;
            moments.mu11 += dx * dy;
            moments.mu02 += dy2;
            moments.mu30 += dx2 * dx;
            moments.mu21 += dx2 * dy;
            moments.mu12 += dx * dy2;
            moments.mu03 += dy2 * dy;
        }

        Some(moments)
    }

    pub fn centroid(&self) -> [f64; 2] {
        [self.cx, self.cy]
    }

    /// eta_pq = mu_pq / m00^(1 + (p + q) / 2)
    pub fn normalized(&self) -> NormalizedMoments {
        let second = self.m00 * self.m00;
        let third = second * self.m00.sqrt();
        NormalizedMoments {
            nu20: self.mu20 / second,
            nu11: self.mu11 / second,
            nu02: self.mu02 / second,
            nu30: self.mu30 / third,
            nu21: self.mu21 / third,
            nu12: self.mu12 / third,
            nu03: self.mu03 / third,
        }
    }
}

impl NormalizedMoments {
    /// The seven Hu invariants
    pub fn hu_invariants(&self) -> [f64; HU_MOMENT_COUNT] {
        let t0 = self.nu30 + self.nu12;
        let t1 = self.nu21 + self.nu03;
        let q0 = self.nu20 - self.nu02;
        let q1 = self.nu30 - 3.0 * self.nu12;
        let q2 = 3.0 * self.nu21 - self.nu03;

        let t0_sq = t0 * t0;
        let t1_sq = t1 * t1;

        [
            self.nu20 + self.nu02,
            q0 * q0 + 4.0 * self.nu11 * self.nu11,
            q1 * q1 + q2 * q2,
            t0_sq + t1_sq,
            q1 * t0 * (t0_sq - 3.0 * t1_sq) + q2 * t1 * (3.0 * t0_sq - t1_sq),
            q0 * (t0_sq - t1_sq) + 4.0 * self.nu11 * t0 * t1,
            q2 * t0 * (t0_sq - 3.0 * t1_sq) - q1 * t1 * (3.0 * t0_sq - t1_sq),
        ]
    }
}

/// Polynomial degree of each Hu invariant in the normalized moments
const HU_DEGREES: [i32; HU_MOMENT_COUNT] = [1, 2, 2, 2, 4, 3, 4];

/// Dynamic-range compression applied to Hu invariants: `-sign(h) * log10(|h|)`.
///
/// Magnitudes below `zero_floor` count as exactly zero and map to the finite
/// sentinel `-log10(zero_floor)`. Database rows and queries must go through
/// the same transform.
///
/// Rasterizing a symmetric shape off the pixel grid leaves tiny residues in
/// invariants that should vanish, and their logs swing wildly. `apply_all`
/// therefore also treats h2..h7 as zero when `|h_k|^(1/degree) < relative_tolerance * h1`,
/// which compares every invariant on the scale of h1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HuLogTransform {
    pub zero_floor: f64,
    /// Zero disables the relative test
    #[schemars(range(min = 0.0, max = 0.5))]
    pub relative_tolerance: f64,
}

impl Default for HuLogTransform {
    fn default() -> Self {
        Self {
            zero_floor: 1e-30,
            relative_tolerance: 1.5e-2,
        }
    }
}

impl HuLogTransform {
    pub fn sentinel(&self) -> f64 {
        -self.zero_floor.log10()
    }

    fn log_above(&self, h: f64, floor: f64) -> f64 {
        let magnitude = h.abs();
        if magnitude < floor {
            return self.sentinel();
        }
        -h.signum() * magnitude.log10()
    }

    /// Transform one value against the absolute floor only
    pub fn apply(&self, h: f64) -> f64 {
        self.log_above(h, self.zero_floor)
    }

    /// Zero threshold for invariant `index` given h1
    pub fn floor_for(&self, index: usize, h1: f64) -> f64 {
        if index == 0 || self.relative_tolerance <= 0.0 {
            return self.zero_floor;
        }
        (self.relative_tolerance * h1.abs())
            .powi(HU_DEGREES[index])
            .max(self.zero_floor)
    }

    pub fn apply_all(&self, hu: &[f64; HU_MOMENT_COUNT]) -> [f64; HU_MOMENT_COUNT] {
        let mut out = [0.0; HU_MOMENT_COUNT];
        for (index, (slot, &h)) in out.iter_mut().zip(hu.iter()).enumerate() {
            *slot = self.log_above(h, self.floor_for(index, hu[0]));
        }
        out
    }
}
