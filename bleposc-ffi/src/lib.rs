//! C ABI wrapper for the bleposc oscillator.
//!
//! Exposes a small set of functions to create/destroy an oscillator, configure it,
//! and pull samples one at a time or as an interleaved f32 block.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `BleposcOscillator` (heap-allocated; you own/delete it).
//! - Waveform selectors follow the Rust `Waveform` discriminants (0 = sine ..
//!   7 = polyblep square); anything else selects sine.
//! - Null handles are ignored. Non-finite parameters are ignored so NaN never
//!   reaches the audio path.
//!
//! Threading
//! - The object is NOT thread-safe; call all functions from the same audio thread.

use bleposc_core::oscillator::{Oscillator, Waveform};

/// Opaque oscillator wrapper we hand to C.
#[repr(C)]
pub struct BleposcOscillator {
    inner: Oscillator,
}

#[inline]
fn osc_mut<'a>(handle: *mut BleposcOscillator) -> Option<&'a mut Oscillator> {
    if handle.is_null() {
        return None;
    }
    Some(unsafe { &mut (*handle).inner })
}

#[inline]
fn valid_sample_rate(sr: f32) -> bool {
    sr.is_finite() && sr > 0.0
}

// --- Creation / destruction -------------------------------------------------------

/// Create an oscillator at `sample_rate` Hz with default settings
/// (100 Hz, amplitude 0.5, sine). Returns null for a non-positive sample rate.
#[no_mangle]
pub extern "C" fn bleposc_create(sample_rate: f32) -> *mut BleposcOscillator {
    if !valid_sample_rate(sample_rate) {
        return std::ptr::null_mut();
    }
    let osc = BleposcOscillator { inner: Oscillator::new(sample_rate) };
    Box::into_raw(Box::new(osc))
}

/// Destroy an oscillator previously returned by `bleposc_create`.
#[no_mangle]
pub extern "C" fn bleposc_destroy(handle: *mut BleposcOscillator) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)); }
    }
}

/// Reinitialize all state to defaults at a (possibly new) sample rate.
#[no_mangle]
pub extern "C" fn bleposc_init(handle: *mut BleposcOscillator, sample_rate: f32) {
    if !valid_sample_rate(sample_rate) { return; }
    if let Some(osc) = osc_mut(handle) {
        osc.init(sample_rate);
    }
}

// --- Parameters ------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn bleposc_set_freq(handle: *mut BleposcOscillator, freq: f32) {
    if !freq.is_finite() { return; }
    if let Some(osc) = osc_mut(handle) {
        osc.set_freq(freq);
    }
}

#[no_mangle]
pub extern "C" fn bleposc_set_amp(handle: *mut BleposcOscillator, amp: f32) {
    if !amp.is_finite() { return; }
    if let Some(osc) = osc_mut(handle) {
        osc.set_amp(amp);
    }
}

/// Select the waveform; out-of-range selectors fall back to sine.
#[no_mangle]
pub extern "C" fn bleposc_set_waveform(handle: *mut BleposcOscillator, waveform: u8) {
    if let Some(osc) = osc_mut(handle) {
        osc.set_waveform(Waveform::from_selector(waveform));
    }
}

/// Jump to `phase` (in cycles, wrapped into [0, 1)).
#[no_mangle]
pub extern "C" fn bleposc_reset_phase(handle: *mut BleposcOscillator, phase: f32) {
    if !phase.is_finite() { return; }
    if let Some(osc) = osc_mut(handle) {
        osc.reset();
        osc.set_phase(phase);
    }
}

// --- Rendering -------------------------------------------------------------------

/// Produce one sample. Returns 0.0 for a null handle.
#[no_mangle]
pub extern "C" fn bleposc_process(handle: *mut BleposcOscillator) -> f32 {
    osc_mut(handle).map_or(0.0, Oscillator::process)
}

/// Render `frames` of audio into an interleaved f32 buffer with `channels` channels.
/// The oscillator is mono; the sample is duplicated to all channels.
///
/// Returns the number of frames rendered (0 on error).
#[no_mangle]
pub extern "C" fn bleposc_render_interleaved_f32(
    handle: *mut BleposcOscillator,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    if out_interleaved.is_null() || frames == 0 || channels == 0 {
        return 0;
    }
    let Some(osc) = osc_mut(handle) else { return 0 };
    let out = unsafe {
        std::slice::from_raw_parts_mut(out_interleaved, (frames as usize) * (channels as usize))
    };

    for frame in out.chunks_exact_mut(channels as usize) {
        let s = osc.process();
        frame.fill(s);
    }
    frames
}
