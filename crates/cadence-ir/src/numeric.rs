//! Finite-number guards.
//!
//! Authoring input is never trusted to be finite. Every value that reaches
//! a timeline or a sample goes through [`finite`] first.

/// Lower and upper margin for envelope curve shapes.
pub const MIN_CURVE: f64 = 1e-6;

/// Map non-finite input to `0.0`.
#[inline]
pub fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Clamp `value` into `[lo, hi]`. NaN collapses to `lo`.
#[inline]
pub fn clip(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.max(lo).min(hi)
    }
}
