//! Math backend and phase helpers shared by the oscillator.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate features `no-std` / `micromath`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` sine for the hot path
//! - Side-effect free helpers that are easy to test
//!
//! Conventions:
//! - Phase is normalized to one cycle, i.e. `[0, 1)`.
//! - All functions are `#[inline]`; they run once or twice per output sample.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext;
        #[inline] fn m_sin(x: f32) -> f32 { F32Ext::sin(x) }
        #[inline] fn m_floor(x: f32) -> f32 { F32Ext::floor(x) }
        #[inline] fn m_abs(x: f32) -> f32 { F32Ext::abs(x) }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] fn m_floor(x: f32) -> f32 { libm::floorf(x) }
        #[inline] fn m_abs(x: f32) -> f32 { libm::fabsf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_floor(x: f32) -> f32 { x.floor() }
        #[inline] fn m_abs(x: f32) -> f32 { x.abs() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

/// Backend `floor`.
#[inline]
pub fn floor(x: f32) -> f32 {
    m_floor(x)
}

/// Backend absolute value.
#[inline]
pub fn abs(x: f32) -> f32 {
    m_abs(x)
}

/// Backend sine (radians).
#[inline]
pub fn sin(x: f32) -> f32 {
    m_sin(x)
}

/// Wrap phase into [0, 1). Handles negative input and increments larger than a cycle.
#[inline]
pub fn wrap_phase01(mut p: f32) -> f32 {
    p -= m_floor(p);
    // `p - floor(p)` rounds up to exactly 1.0 for tiny negative inputs
    if p >= 1.0 { p - 1.0 } else { p }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if m_abs(x) < EPS_SMALL { 0.0 } else { x }
}

// --------------------------------- Fast trig -------------------------------------

/// Sine of `x` radians.
///
/// With `fast-math`: range reduction into [-π, π] and a 5th-order odd polynomial,
/// max abs error ~1e-3. Falls back to the backend `sin` otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            let k = m_floor(xr / TAU + 0.5);
            xr -= k * TAU;

            // sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(x)
        }
    }
}

// --------------------------------- PolyBLEP --------------------------------------

/// Polynomial band-limited step residual for a unit-height step at phase 0.
///
/// `dt` is the magnitude of the per-sample phase increment. The residual is
/// non-zero only within one increment on either side of the wrap point:
/// - `phase < dt`       : `2t - t² - 1` with `t = phase / dt`
/// - `phase > 1 - dt`   : `t² + 2t + 1` with `t = (phase - 1) / dt`
///
/// A `dt` of zero (or less) yields 0, so a stopped oscillator never divides by zero.
#[inline]
pub fn poly_blep(phase: f32, dt: f32) -> f32 {
    if phase < dt {
        let t = phase / dt;
        t + t - t * t - 1.0
    } else if phase > 1.0 - dt {
        let t = (phase - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

// --------------------------------- Tests (std only) ------------------------------
