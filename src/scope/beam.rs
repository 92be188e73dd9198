//! Analytic Gaussian-beam intensity model.
//!
//! A segment is lit by a Gaussian spot of width `sigma = half_width / 4` swept
//! along its length. Integrating the spot over the segment gives a closed form
//! in terms of the error function, which the fragment stage evaluates per pixel.
//! These functions mirror `shaders/line.wgsl` so the intensity curve can be
//! checked without a GPU.

use serde::{Deserialize, Serialize};

/// Segments shorter than this are drawn as a round point.
pub const SEGMENT_EPSILON: f32 = 1e-6;

const SQRT_2: f32 = std::f32::consts::SQRT_2;
/// Slope of [`erf_approx`] at zero, 4 * 0.278393.
const ERF_SLOPE: f32 = 1.113_572;

/// Rational approximation of the Gauss error function (max error ~5e-4).
pub fn erf_approx(x: f32) -> f32 {
    let s = x.signum();
    let a = x.abs();
    let t = 1.0 + (0.278_393 + (0.230_389 + (0.000_972 + 0.078_108 * a) * a) * a) * a;
    let t2 = t * t;
    s - s / (t2 * t2)
}

/// Beam standard deviation for a given line half width.
#[inline]
pub fn beam_sigma(half_width: f32) -> f32 {
    half_width / 4.0
}

/// Map interpolated quad coordinates to segment-local coordinates.
///
/// `tangent` and `side` are the interpolated corner flags in `[-1, 1]`.
/// The result is `(distance along the segment from its start, signed distance across it)`.
pub fn local_coords(tangent: f32, side: f32, length: f32, half_width: f32) -> (f32, f32) {
    (
        (length / 2.0 + half_width) * tangent + length / 2.0,
        half_width * side,
    )
}

/// Intensity of a degenerate segment at squared radius `r2` from its center.
///
/// This is the limit of [`line_intensity`] as the length approaches zero,
/// taken with the slope of [`erf_approx`] rather than that of the true erf.
pub fn point_intensity(r2: f32, half_width: f32) -> f32 {
    let sigma = beam_sigma(half_width);
    (-r2 / (2.0 * sigma * sigma)).exp() * half_width * ERF_SLOPE / (2.0 * SQRT_2 * sigma)
}

/// Intensity of a segment of length `length` at local coordinates `(x, y)`.
pub fn line_intensity(x: f32, y: f32, length: f32, half_width: f32) -> f32 {
    let sigma = beam_sigma(half_width);
    let along = erf_approx((length - x) / SQRT_2 / sigma) + erf_approx(x / SQRT_2 / sigma);
    along * (-y * y / (2.0 * sigma * sigma)).exp() / 2.0 / length * half_width
}

/// Intensity at local coordinates, dispatching to the point formula for
/// degenerate segments.
pub fn segment_intensity(x: f32, y: f32, length: f32, half_width: f32) -> f32 {
    if length < SEGMENT_EPSILON {
        point_intensity(x * x + y * y, half_width)
    } else {
        line_intensity(x, y, length, half_width)
    }
}

/// Hermite smoothstep matching the WGSL builtin.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Phosphor persistence curve.
///
/// Ages are expressed as a fraction of the window capacity: the most recent
/// segment has age 0, the oldest segment of a full window has age 1.
/// Segments younger than `full` render at full brightness, then fade out
/// along a smoothstep reaching zero at `horizon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Afterglow {
    pub full: f32,
    pub horizon: f32,
}

impl Default for Afterglow {
    fn default() -> Self {
        Self {
            full: 1.0 / 3.0,
            horizon: 1.0,
        }
    }
}

impl Afterglow {
    /// Fade multiplier for an age fraction.
    pub fn fade(&self, age: f32) -> f32 {
        1.0 - smoothstep(self.full, self.horizon, age)
    }

    /// Age fraction of segment `index` in a window of `count` segments.
    pub fn age_fraction(index: usize, count: usize, capacity: usize) -> f32 {
        let age = count.saturating_sub(1).saturating_sub(index);
        age as f32 / capacity.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erf_approx_reference_values() {
        let reference = [(0.0, 0.0), (0.5, 0.5205), (1.0, 0.8427), (2.0, 0.9953)];
        for (x, expected) in reference {
            assert!((erf_approx(x) - expected).abs() < 1e-3, "erf({x})");
            assert!((erf_approx(-x) + expected).abs() < 1e-3, "erf(-{x})");
        }
        assert!((erf_approx(10.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_line_intensity_symmetric_across_segment() {
        let w = 0.012;
        let len = 0.05;
        let above = line_intensity(len / 2.0, 0.002, len, w);
        let below = line_intensity(len / 2.0, -0.002, len, w);
        assert!((above - below).abs() < 1e-6);
    }

    #[test]
    fn test_intensity_falls_off_away_from_beam() {
        let w = 0.012;
        let center = point_intensity(0.0, w);
        let edge = point_intensity(w * w, w);
        assert!(center > edge);
        assert!(edge < center * 1e-3);
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(0.5, 0.5, 0.4), 0.0);
        assert_eq!(smoothstep(0.5, 0.5, 0.6), 1.0);
    }

    #[test]
    fn test_age_fraction_orders_most_recent_first() {
        assert_eq!(Afterglow::age_fraction(9, 10, 9), 0.0);
        assert_eq!(Afterglow::age_fraction(0, 10, 9), 1.0);
        assert_eq!(Afterglow::age_fraction(0, 0, 0), 0.0);
    }
}
