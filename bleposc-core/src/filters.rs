//! One-pole integrator used to derive the band-limited triangle.
//!
//! Difference equation:
//! `y[n] = leak * y[n-1] + gain * x[n]`
//!
//! With `leak` slightly below 1.0 this is a "leaky" running sum: it integrates
//! like an ideal accumulator over a few cycles but any DC offset in the state
//! decays away instead of drifting forever. `leak == 1.0` is a pure integrator.

use crate::dsp::kill_denormals;

/// Leaky one-pole integrator. Allocation free, `Copy`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LeakyIntegrator {
    y: f32,
}

impl LeakyIntegrator {
    /// Create an integrator holding `y0`.
    #[inline]
    pub fn new(y0: f32) -> Self {
        Self { y: y0 }
    }

    /// Overwrite the stored state.
    #[inline]
    pub fn reset(&mut self, y0: f32) {
        self.y = y0;
    }

    /// Integrate one input sample and return the new state.
    #[inline]
    pub fn process(&mut self, x: f32, gain: f32, leak: f32) -> f32 {
        self.y = kill_denormals(leak * self.y + gain * x);
        self.y
    }

    #[inline] pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------
