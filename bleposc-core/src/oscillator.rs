//! Per-sample oscillator with naive and polyBLEP band-limited waveforms.
//!
//! The oscillator is a plain `Copy` value: a phase accumulator in `[0, 1)`, the
//! selected [`Waveform`], amplitude, and the integrator state used by the
//! band-limited triangle. The owner calls [`Oscillator::process`] exactly once per
//! output sample; setters may be called between samples.
//!
//! Waveform orientation (phase `p`):
//! - `Sine`     : `sin(2πp)`
//! - `Triangle` : peak `+1` at `p = 0.25`, trough `-1` at `p = 0.75`
//! - `Saw`      : falls from `+1` at `p = 0` towards `-1`
//! - `Ramp`     : rises from `-1` at `p = 0` towards `+1`
//! - `Square`   : `+1` for `p < 0.5`, else `-1`
//!
//! The `PolyBlep*` variants add a polynomial step residual ([`poly_blep`]) at each
//! discontinuity. The band-limited triangle is a leaky integral of the corrected
//! square, so it rises from its trough at `p = 0` to its peak at `p = 0.5`.
//!
//! Nothing here allocates, locks or fails. Degenerate input (zero or negative
//! sample rate, NaN frequency) is the caller's responsibility.

use core::fmt;
use core::str::FromStr;

use num_traits::FromPrimitive;

use crate::dsp::{abs, fast_sin, poly_blep, wrap_phase01, TAU};
use crate::filters::LeakyIntegrator;

/// Frequency after [`Oscillator::init`], in Hz.
pub const DEFAULT_FREQ: f32 = 100.0;
/// Amplitude after [`Oscillator::init`].
pub const DEFAULT_AMP: f32 = 0.5;

/// Integrator gain per unit of `phase_inc` (signed). Half a cycle of the ±1 square sweeps a span of 2.
const TRI_GAIN: f32 = 4.0;
/// Integrator leak per unit of `|phase_inc|`: `leak = 1 - TRI_LEAK_RATE * |phase_inc|`.
const TRI_LEAK_RATE: f32 = 0.05;
/// Integrator value matching phase 0 of the band-limited triangle.
const TRI_START: f32 = -1.0;

// ---------------------------------- Waveform -------------------------------------

/// Oscillator waveform. Discriminants are the stable selector values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Waveform {
    #[default]
    Sine = 0,
    Triangle,
    Saw,
    Ramp,
    Square,
    PolyBlepTriangle,
    PolyBlepSaw,
    PolyBlepSquare,
}

impl Waveform {
    /// Number of valid selectors; any selector `>= COUNT` falls back to [`Waveform::Sine`].
    pub const COUNT: u8 = 8;

    /// Every waveform, in selector order.
    pub const ALL: [Waveform; Waveform::COUNT as usize] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Saw,
        Waveform::Ramp,
        Waveform::Square,
        Waveform::PolyBlepTriangle,
        Waveform::PolyBlepSaw,
        Waveform::PolyBlepSquare,
    ];

    /// Map a raw selector to a waveform, substituting `Sine` for out-of-range values.
    #[inline]
    pub fn from_selector(selector: u8) -> Self {
        Self::from_u8(selector).unwrap_or(Waveform::Sine)
    }

    #[inline]
    pub fn selector(self) -> u8 {
        self as u8
    }

    /// `true` for the polyBLEP variants.
    #[inline]
    pub fn is_bandlimited(self) -> bool {
        matches!(
            self,
            Waveform::PolyBlepTriangle | Waveform::PolyBlepSaw | Waveform::PolyBlepSquare
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Saw => "saw",
            Waveform::Ramp => "ramp",
            Waveform::Square => "square",
            Waveform::PolyBlepTriangle => "polyblep-triangle",
            Waveform::PolyBlepSaw => "polyblep-saw",
            Waveform::PolyBlepSquare => "polyblep-square",
        }
    }
}

impl FromPrimitive for Waveform {
    fn from_i64(n: i64) -> Option<Self> {
        u64::try_from(n).ok().and_then(Self::from_u64)
    }

    fn from_u64(n: u64) -> Option<Self> {
        usize::try_from(n).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl From<u8> for Waveform {
    #[inline]
    fn from(selector: u8) -> Self {
        Self::from_selector(selector)
    }
}

impl From<Waveform> for u8 {
    #[inline]
    fn from(w: Waveform) -> Self {
        w.selector()
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`Waveform::from_str`] for an unknown name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParseWaveformError;

impl fmt::Display for ParseWaveformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown waveform name (expected one of sine, tri, saw, ramp, square, blep-tri, blep-saw, blep-square)")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseWaveformError {}

const WAVEFORM_ALIASES: &[(&str, Waveform)] = &[
    ("sine", Waveform::Sine),
    ("sin", Waveform::Sine),
    ("triangle", Waveform::Triangle),
    ("tri", Waveform::Triangle),
    ("saw", Waveform::Saw),
    ("ramp", Waveform::Ramp),
    ("square", Waveform::Square),
    ("sqr", Waveform::Square),
    ("polyblep-triangle", Waveform::PolyBlepTriangle),
    ("polyblep-tri", Waveform::PolyBlepTriangle),
    ("blep-tri", Waveform::PolyBlepTriangle),
    ("polyblep-saw", Waveform::PolyBlepSaw),
    ("blep-saw", Waveform::PolyBlepSaw),
    ("polyblep-square", Waveform::PolyBlepSquare),
    ("polyblep-sqr", Waveform::PolyBlepSquare),
    ("blep-square", Waveform::PolyBlepSquare),
];

impl FromStr for Waveform {
    type Err = ParseWaveformError;

    /// Case-insensitive waveform name, e.g. `"saw"` or `"blep-square"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        WAVEFORM_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(s))
            .map(|&(_, w)| w)
            .ok_or(ParseWaveformError)
    }
}

// ------------------------------- Waveform shapes ---------------------------------

#[inline]
fn naive_triangle(p: f32) -> f32 {
    if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    }
}

#[inline]
fn naive_square(p: f32) -> f32 {
    if p < 0.5 { 1.0 } else { -1.0 }
}

/// Band-limited triangle value at phase `p`: the integrated square, trough at 0, peak at 0.5.
#[inline]
fn tri_at(p: f32) -> f32 {
    if p < 0.5 { 4.0 * p - 1.0 } else { 3.0 - 4.0 * p }
}

/// Square with a rising residual at `p = 0` and a falling one at `p = 0.5`.
#[inline]
fn blep_square(p: f32, dt: f32) -> f32 {
    naive_square(p) + poly_blep(p, dt) - poly_blep(wrap_phase01(p + 0.5), dt)
}

// --------------------------------- Oscillator ------------------------------------

/// Stateful sample generator. See the module docs for waveform conventions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Oscillator {
    sr: f32,
    freq: f32,
    amp: f32,
    wave: Waveform,
    phase: f32,     // [0,1)
    phase_inc: f32, // freq / sr
    last_freq: f32, // freq at the last phase_inc computation
    tri: LeakyIntegrator,
    eoc: bool,
    eor: bool,
}

impl Oscillator {
    /// Create an oscillator running at `sample_rate` Hz with the [`init`](Self::init) defaults.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sr: sample_rate,
            freq: DEFAULT_FREQ,
            amp: DEFAULT_AMP,
            wave: Waveform::Sine,
            phase: 0.0,
            phase_inc: DEFAULT_FREQ / sample_rate,
            last_freq: DEFAULT_FREQ,
            tri: LeakyIntegrator::new(TRI_START),
            eoc: false,
            eor: false,
        }
    }

    /// Reset every field to its default: 100 Hz, amplitude 0.5, sine, phase 0.
    ///
    /// `sample_rate` must be positive; this is not checked.
    #[inline]
    pub fn init(&mut self, sample_rate: f32) {
        *self = Self::new(sample_rate);
    }

    /// Set the frequency in Hz. Negative values run the phase backwards.
    #[inline]
    #[allow(clippy::float_cmp)]
    pub fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        if freq != self.last_freq {
            self.phase_inc = self.calc_phase_inc(freq);
            self.last_freq = freq;
        }
    }

    /// Set the output scale. Stored verbatim, no clamping.
    #[inline]
    pub fn set_amp(&mut self, amp: f32) {
        self.amp = amp;
    }

    /// Select the waveform. Accepts a [`Waveform`] or a raw `u8` selector;
    /// out-of-range selectors become [`Waveform::Sine`].
    ///
    /// Switching into [`Waveform::PolyBlepTriangle`] seeds its integrator from the
    /// current phase, so the triangle starts centred wherever the cycle is.
    #[inline]
    pub fn set_waveform(&mut self, wave: impl Into<Waveform>) {
        let wave = wave.into();
        if wave == Waveform::PolyBlepTriangle && self.wave != wave {
            self.tri.reset(tri_at(self.phase));
        }
        self.wave = wave;
    }

    /// Change the sample rate, keeping frequency and phase.
    #[inline]
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sr = sample_rate;
        self.phase_inc = self.calc_phase_inc(self.freq);
        self.last_freq = self.freq;
    }

    /// Return the phase to 0 and reseed the triangle integrator to match.
    #[inline]
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.tri.reset(TRI_START);
        self.eoc = false;
        self.eor = false;
    }

    /// Jump to phase `p`, wrapped into `[0, 1)`.
    #[inline]
    pub fn set_phase(&mut self, p: f32) {
        self.jump_to(wrap_phase01(p));
    }

    /// Offset the phase by `delta` cycles (phase modulation), wrapped into `[0, 1)`.
    #[inline]
    pub fn phase_add(&mut self, delta: f32) {
        self.jump_to(wrap_phase01(self.phase + delta));
    }

    /// Move the phase and shift the triangle integrator by the same distance along
    /// the triangle, keeping its smoothing and leak state.
    #[inline]
    fn jump_to(&mut self, p: f32) {
        let y = self.tri.value() + tri_at(p) - tri_at(self.phase);
        self.tri.reset(y);
        self.phase = p;
    }

    #[inline]
    fn calc_phase_inc(&self, freq: f32) -> f32 {
        freq / self.sr
    }

    /// Produce one sample and advance the phase. Call exactly once per sample period.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let p = self.phase;
        let dt = abs(self.phase_inc);

        let out = match self.wave {
            Waveform::Sine => fast_sin(TAU * p),
            Waveform::Triangle => naive_triangle(p),
            Waveform::Saw => 1.0 - 2.0 * p,
            Waveform::Ramp => 2.0 * p - 1.0,
            Waveform::Square => naive_square(p),
            Waveform::PolyBlepTriangle => {
                let sq = blep_square(p, dt);
                // signed gain: a backwards phase retraces the triangle
                self.tri.process(sq, TRI_GAIN * self.phase_inc, 1.0 - TRI_LEAK_RATE * dt)
            }
            // falling saw: negated, corrected ramp
            Waveform::PolyBlepSaw => poly_blep(p, dt) - (2.0 * p - 1.0),
            Waveform::PolyBlepSquare => blep_square(p, dt),
        };

        let mut next = p + self.phase_inc;
        self.eoc = !(0.0..1.0).contains(&next);
        if self.eoc {
            next = wrap_phase01(next);
        }
        self.eor = self.phase_inc > 0.0 && !self.eoc && p < 0.5 && next >= 0.5;
        self.phase = next;

        out * self.amp
    }

    /// Overwrite `out` with consecutive samples.
    #[inline]
    pub fn process_block(&mut self, out: &mut [f32]) {
        for y in out.iter_mut() {
            *y = self.process();
        }
    }

    /// Add consecutive samples into `out`.
    #[inline]
    pub fn mix_block(&mut self, out: &mut [f32]) {
        for y in out.iter_mut() {
            *y += self.process();
        }
    }

    // ------------------------------ accessors -----------------------------------

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }
    #[inline] pub fn freq(&self) -> f32 { self.freq }
    #[inline] pub fn amp(&self) -> f32 { self.amp }
    #[inline] pub fn waveform(&self) -> Waveform { self.wave }
    #[inline] pub fn phase(&self) -> f32 { self.phase }
    #[inline] pub fn phase_inc(&self) -> f32 { self.phase_inc }
    #[inline] pub fn last_freq(&self) -> f32 { self.last_freq }

    /// Integrator memory of the band-limited triangle (pre-amplitude).
    #[inline] pub fn last_output(&self) -> f32 { self.tri.value() }

    /// The last [`process`](Self::process) call wrapped the phase (end of cycle).
    #[inline] pub fn is_eoc(&self) -> bool { self.eoc }

    /// The last [`process`](Self::process) call crossed phase 0.5 moving forward (end of rise).
    /// Never set while the frequency is negative.
    #[inline] pub fn is_eor(&self) -> bool { self.eor }

    #[inline] pub fn is_rising(&self) -> bool { self.phase < 0.5 }
    #[inline] pub fn is_falling(&self) -> bool { self.phase >= 0.5 }
}

// ------------------------------------ Tests --------------------------------------
