#![cfg_attr(not(feature = "std"), no_std)]
//! bleposc core: a per-sample oscillator with polyBLEP band-limited waveforms.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use the `libm` math backend
//! - `micromath`: use `micromath` instead of `libm` (choose one in builds)
//! - `fast-math`: polynomial sine on the hot path
//!
//! Modules
//! - [`dsp`]        : math backend, phase wrap, polyBLEP residual
//! - [`filters`]    : leaky integrator
//! - [`oscillator`] : [`Oscillator`](oscillator::Oscillator) and [`Waveform`](oscillator::Waveform)
//!
//! Design
//! - No heap allocations, no locks, no fallible calls on the audio path
//! - One `process()` call produces one sample; the caller owns the sample clock
//! - Friendly to embedded / real-time targets
//!
//! ```
//! use bleposc_core::prelude::*;
//!
//! let mut osc = Oscillator::new(48_000.0);
//! osc.set_waveform(Waveform::PolyBlepSaw);
//! osc.set_freq(220.0);
//! osc.set_amp(0.8);
//!
//! let mut block = [0.0_f32; 64];
//! osc.process_block(&mut block);
//! assert!(block.iter().all(|s| s.abs() <= 1.0));
//! ```

pub mod dsp;
pub mod filters;
pub mod oscillator;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{poly_blep, wrap_phase01, TAU};
    pub use crate::filters::LeakyIntegrator;
    pub use crate::oscillator::{Oscillator, ParseWaveformError, Waveform};
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let mut osc = Oscillator::new(48_000.0);
        osc.set_waveform(3_u8);
        assert_eq!(osc.waveform(), Waveform::Ramp);
        let _ = osc.process();
        let _ = poly_blep(0.0, 0.01);
        let _ = LeakyIntegrator::new(0.0);
    }
}
