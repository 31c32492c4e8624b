use num::Float;

use crate::error::{FuzzyError, Result};

/// Drift tolerated when a curve is queried just outside of `[0, 1]`.
pub const DOMAIN_EPSILON: f64 = 1e-6;

/// Drift tolerated when a membership evaluates just outside of `[0, 1]`.
pub const TRUTH_EPSILON: f64 = 1e-4;

/// Returns `value` if it lies in `[lo, hi]`, the nearest bound if it is
/// within `eps` of it, and an error otherwise.
pub fn bounds_check<F: Float>(value: F, lo: F, hi: F, eps: F) -> Result<F> {
    if value >= lo && value <= hi {
        return Ok(value);
    }
    if value < lo && lo - value < eps {
        return Ok(lo);
    }
    if value > hi && value - hi < eps {
        return Ok(hi);
    }

    Err(FuzzyError::Domain {
        value: value.to_f64().unwrap_or(f64::NAN),
        lo: lo.to_f64().unwrap_or(f64::NAN),
        hi: hi.to_f64().unwrap_or(f64::NAN),
    })
}

pub(crate) fn unit_check(x: f64) -> Result<f64> {
    bounds_check(x, 0., 1., DOMAIN_EPSILON)
}

/// Linear interpolation over `ys` laid out on an even grid spanning `[0, 1]`.
pub(crate) fn interp_even<F: Float>(x: F, ys: &[F]) -> Option<F> {
    let last = ys.len().checked_sub(1)?;
    if last == 0 {
        return ys.first().copied();
    }

    let pos = x.max(F::zero()).min(F::one()) * F::from(last)?;
    let i = pos.floor().to_usize()?.min(last - 1);
    let frac = pos - F::from(i)?;

    Some(ys[i] + (ys[i + 1] - ys[i]) * frac)
}

#[test]
fn test_interp_even() {
    let ys = [0., 1., 0.];

    assert_eq!(interp_even(0.25, &ys), Some(0.5));
    assert_eq!(interp_even(1., &ys), Some(0.));
    assert_eq!(interp_even(0.5, &ys), Some(1.));
}

#[test]
fn test_bounds_check() {
    assert_eq!(unit_check(0.5).ok(), Some(0.5));
    assert_eq!(unit_check(-5e-7).ok(), Some(0.));
    assert_eq!(unit_check(1. + 5e-7).ok(), Some(1.));
    assert!(matches!(unit_check(1.01), Err(FuzzyError::Domain { .. })));
}
