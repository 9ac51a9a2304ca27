//! bleposc CLI: play the oscillator live or render it to a WAV file.
//!
//! ```text
//! bleposc --wave=blep-saw --freq=110 --duration=3
//! bleposc --wave=saw --freq=200 --sweep-to=8000 --duration=4 --out=saw_sweep.wav
//! ```

use anyhow::{anyhow, bail, Context, Result};
use bleposc_core::prelude::*;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_RENDER_SR: u32 = 48_000;
const DEFAULT_RENDER_SECS: f32 = 2.0;

#[derive(Debug)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<f32>,
    wave: Waveform,
    freq: f32,
    sweep_to: Option<f32>,
    amp: f32,
    gain: f32,
    out: Option<PathBuf>,
    level: LevelFilter,
    unknown: Vec<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            list_devices: false,
            device_name: None,
            sample_rate: None,
            channels: None,
            duration_sec: None,
            wave: Waveform::PolyBlepSaw,
            freq: 220.0,
            sweep_to: None,
            amp: 0.8,
            gain: 0.35,
            out: None,
            level: LevelFilter::Info,
            unknown: Vec::new(),
        }
    }
}

fn value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().with_context(|| format!("invalid value for --{key}: {raw:?}"))
}

fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut a = Args::default();
    for s in args {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--verbose" { a.level = LevelFilter::Debug; continue; }
        if s == "--quiet" { a.level = LevelFilter::Warn; continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name  = Some(rest.to_string());           continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate  = Some(value("sample-rate", rest)?); continue; }
        if let Some(rest) = s.strip_prefix("--channels=")    { a.channels     = Some(value("channels", rest)?);    continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec = Some(value("duration", rest)?);    continue; }
        if let Some(rest) = s.strip_prefix("--wave=")        { a.wave         = value("wave", rest)?;              continue; }
        if let Some(rest) = s.strip_prefix("--freq=")        { a.freq         = value("freq", rest)?;              continue; }
        if let Some(rest) = s.strip_prefix("--sweep-to=")    { a.sweep_to     = Some(value("sweep-to", rest)?);    continue; }
        if let Some(rest) = s.strip_prefix("--amp=")         { a.amp          = value("amp", rest)?;               continue; }
        if let Some(rest) = s.strip_prefix("--gain=")        { a.gain         = value("gain", rest)?;              continue; }
        if let Some(rest) = s.strip_prefix("--out=")         { a.out          = Some(PathBuf::from(rest));         continue; }
        a.unknown.push(s);
    }
    a.validate()?;
    Ok(a)
}

impl Args {
    /// Reject values the oscillator would accept but that make no sense for playback.
    fn validate(&self) -> Result<()> {
        if self.sample_rate == Some(0) {
            bail!("--sample-rate must be positive");
        }
        if self.channels == Some(0) {
            bail!("--channels must be positive");
        }
        if let Some(d) = self.duration_sec {
            if !(d.is_finite() && d > 0.0) {
                bail!("--duration must be a positive number of seconds, got {d}");
            }
        }
        for (key, v) in [("freq", self.freq), ("amp", self.amp), ("gain", self.gain)] {
            if !v.is_finite() {
                bail!("--{key} must be finite, got {v}");
            }
        }
        if let Some(to) = self.sweep_to {
            if !(to.is_finite() && to > 0.0 && self.freq > 0.0) {
                bail!("--sweep-to needs positive start and end frequencies ({} -> {to})", self.freq);
            }
        }
        Ok(())
    }
}

// --------------------------------- Patch -----------------------------------------

/// Exponential frequency glide over a fixed number of samples, then hold.
#[derive(Copy, Clone, Debug)]
struct Sweep {
    freq: f32,
    ratio: f32,
    remaining: u64,
    end: f32,
}

impl Sweep {
    fn new(from: f32, to: f32, samples: u64) -> Self {
        let steps = samples.max(1);
        let ratio = (f64::from(to) / f64::from(from)).powf(1.0 / steps as f64) as f32;
        Self { freq: from, ratio, remaining: steps, end: to }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let f = self.freq;
        if self.remaining > 0 {
            self.remaining -= 1;
            self.freq = if self.remaining == 0 { self.end } else { self.freq * self.ratio };
        }
        f
    }
}

/// The oscillator plus the CLI-side controls: optional sweep and output gain.
#[derive(Copy, Clone, Debug)]
struct Patch {
    osc: Oscillator,
    sweep: Option<Sweep>,
    gain: f32,
}

impl Patch {
    fn new(args: &Args, sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        let mut osc = Oscillator::new(sr);
        osc.set_waveform(args.wave);
        osc.set_freq(args.freq);
        osc.set_amp(args.amp);

        let sweep_secs = args.duration_sec.unwrap_or(DEFAULT_RENDER_SECS);
        let sweep = args
            .sweep_to
            .map(|to| Sweep::new(args.freq, to, (sweep_secs * sr) as u64));

        Self { osc, sweep, gain: args.gain }
    }

    /// One output sample, clamped to [-1, 1].
    #[inline]
    fn next(&mut self) -> f32 {
        if let Some(sweep) = self.sweep.as_mut() {
            self.osc.set_freq(sweep.next());
        }
        (self.osc.process() * self.gain).clamp(-1.0, 1.0)
    }
}

// --------------------------------- Offline ---------------------------------------

fn render_wav(path: &Path, args: &Args) -> Result<u64> {
    let sample_rate = args.sample_rate.unwrap_or(DEFAULT_RENDER_SR);
    let channels = args.channels.unwrap_or(1);
    let secs = args.duration_sec.unwrap_or(DEFAULT_RENDER_SECS);
    let frames = (secs * sample_rate as f32) as u64;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("cannot create {}", path.display()))?;

    let mut patch = Patch::new(args, sample_rate);
    let mut peak = 0.0_f32;
    for _ in 0..frames {
        let s = patch.next();
        peak = peak.max(s.abs());
        for _ in 0..channels {
            writer.write_sample(s)?;
        }
    }
    writer.finalize().context("failed to finalize WAV file")?;

    info!(
        "Rendered {frames} frames ({secs:.2} s, {sample_rate} Hz, {channels} ch) to {} | peak {peak:.3}",
        path.display()
    );
    Ok(frames)
}

// ---------------------------------- Live -----------------------------------------

fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = &args.device_name {
        for d in host.output_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))
}

/// Distance of a device config range from the request: sample-rate misses dominate,
/// channel-count misses break ties. Unrequested properties cost nothing.
fn range_score(channels: u16, sr_range: (u32, u32), req_sr: Option<u32>, req_ch: Option<u16>) -> u64 {
    let (lo, hi) = sr_range;
    let sr_miss = req_sr.map_or(0, |sr| if sr < lo { lo - sr } else { sr.saturating_sub(hi) });
    let ch_miss = req_ch.map_or(0, |c| channels.abs_diff(c));
    u64::from(sr_miss) * 1000 + u64::from(ch_miss)
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    let range = device
        .supported_output_configs()?
        .min_by_key(|r| {
            let sr = (r.min_sample_rate().0, r.max_sample_rate().0);
            range_score(r.channels(), sr, req_sr, req_ch)
        })
        .ok_or_else(|| anyhow!("no supported output configs"))?;

    let rate = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(rate))
}

/// Running peak over a fixed number of samples; reports once per window.
struct PeakMeter {
    window: usize,
    count: usize,
    peak: f32,
}

impl PeakMeter {
    fn new(window: usize) -> Self {
        Self { window: window.max(1), count: 0, peak: 0.0 }
    }

    /// Feed one sample. Returns the window's peak when the window closes.
    fn push(&mut self, s: f32) -> Option<f32> {
        self.peak = self.peak.max(s.abs());
        self.count += 1;
        if self.count < self.window {
            return None;
        }
        let peak = self.peak;
        self.count = 0;
        self.peak = 0.0;
        Some(peak)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut patch: Patch,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels);
    // one report per second of audio
    let mut meter = PeakMeter::new(cfg.sample_rate.0 as usize);

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for frame in output.chunks_mut(channels) {
                let s = patch.next();
                frame.fill(T::from_sample(s));
                if let Some(peak) = meter.push(s) {
                    debug!("peak {peak:.3} at {:.1} Hz", patch.osc.freq());
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

fn play_live(args: &Args) -> Result<()> {
    let device  = pick_device(args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let cfg = sup_cfg.config();
    if args.sample_rate.is_some_and(|sr| sr != cfg.sample_rate.0) {
        warn!("requested sample rate unavailable, using {} Hz", cfg.sample_rate.0);
    }

    let patch = Patch::new(args, cfg.sample_rate.0);

    info!("Using device: {}", device.name()?);
    info!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);

    let err_fn = |e: cpal::StreamError| log::error!("[cpal] stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, patch, err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, patch, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, patch, err_fn)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };

    stream.play().context("failed to start output stream")?;

    if let Some(d) = args.duration_sec {
        info!("Auto-stop after {d} seconds");
        std::thread::sleep(Duration::from_secs_f32(d));
        return Ok(());
    }

    info!("Press Ctrl+C to stop…");
    loop { std::thread::sleep(Duration::from_millis(500)); }
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    TermLogger::init(args.level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .context("failed to start logger")?;
    for s in &args.unknown {
        warn!("unknown arg: {s}");
    }

    if args.list_devices {
        return list_output_devices();
    }

    info!(
        "Waveform: {} | Freq: {:.1} Hz{} | Amp: {:.2} | Gain: {:.2}",
        args.wave,
        args.freq,
        args.sweep_to.map(|to| format!(" -> {to:.1} Hz")).unwrap_or_default(),
        args.amp,
        args.gain,
    );

    match &args.out {
        Some(path) => render_wav(path, &args).map(|_| ()),
        None => play_live(&args),
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        let a = parse(&[]).unwrap();
        assert_eq!(a.wave, Waveform::PolyBlepSaw);
        assert_eq!(a.freq, 220.0);
        assert!(a.out.is_none());
        assert_eq!(a.level, LevelFilter::Info);
    }

    #[test]
    fn parses_known_arguments() {
        let a = parse(&[
            "--wave=blep-square",
            "--freq=440",
            "--sweep-to=880",
            "--sample-rate=44100",
            "--channels=2",
            "--duration=1.5",
            "--amp=0.25",
            "--out=x.wav",
            "--verbose",
            "--bogus",
        ])
        .unwrap();
        assert_eq!(a.wave, Waveform::PolyBlepSquare);
        assert_eq!(a.freq, 440.0);
        assert_eq!(a.sweep_to, Some(880.0));
        assert_eq!(a.sample_rate, Some(44_100));
        assert_eq!(a.channels, Some(2));
        assert_eq!(a.duration_sec, Some(1.5));
        assert_eq!(a.amp, 0.25);
        assert_eq!(a.out.as_deref(), Some(Path::new("x.wav")));
        assert_eq!(a.level, LevelFilter::Debug);
        assert_eq!(a.unknown, vec!["--bogus".to_string()]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["--wave=kazoo"]).is_err());
        assert!(parse(&["--freq=loud"]).is_err());
        assert!(parse(&["--duration=-1"]).is_err());
        assert!(parse(&["--sample-rate=0"]).is_err());
        assert!(parse(&["--freq=-100", "--sweep-to=200"]).is_err());
        assert!(parse(&["--amp=NaN"]).is_err());
    }

    #[test]
    fn sweep_lands_on_target() {
        let mut s = Sweep::new(100.0, 1600.0, 4000);
        let mut last = 0.0;
        for _ in 0..4000 {
            let f = s.next();
            assert!(f >= last);
            last = f;
        }
        assert!((last - 1600.0).abs() / 1600.0 < 1e-2, "last={last}");
        assert_eq!(s.next(), 1600.0);
        assert_eq!(s.next(), 1600.0);
    }

    #[test]
    fn patch_output_is_clamped() {
        let args = Args { wave: Waveform::Square, amp: 1.0, gain: 4.0, ..Args::default() };
        let mut p = Patch::new(&args, 48_000);
        for _ in 0..1000 {
            let s = p.next();
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn range_score_ignores_unrequested_properties() {
        assert_eq!(range_score(6, (8_000, 192_000), None, None), 0);
        assert_eq!(range_score(6, (8_000, 8_000), None, Some(6)), 0);
        assert_eq!(range_score(1, (8_000, 8_000), None, Some(2)), 1);
        assert_eq!(range_score(1, (44_100, 48_000), Some(48_000), None), 0);
    }

    #[test]
    fn range_score_prefers_sample_rate_over_channels() {
        let exact_rate_wrong_ch = range_score(1, (48_000, 48_000), Some(48_000), Some(2));
        let near_rate_right_ch = range_score(2, (44_100, 44_100), Some(48_000), Some(2));
        assert!(exact_rate_wrong_ch < near_rate_right_ch);
        // below and above the supported range
        assert_eq!(range_score(2, (44_100, 96_000), Some(22_050), None), 22_050 * 1000);
        assert_eq!(range_score(2, (8_000, 44_100), Some(48_000), None), 3_900 * 1000);
    }

    #[test]
    fn peak_meter_reports_once_per_window() {
        let mut m = PeakMeter::new(4);
        let reports: Vec<Option<f32>> =
            [0.1, -0.7, 0.3, 0.2, 0.5, 0.0, 0.0, -0.25].into_iter().map(|s| m.push(s)).collect();
        assert_eq!(reports, vec![None, None, None, Some(0.7), None, None, None, Some(0.5)]);
        assert_eq!(PeakMeter::new(0).push(-0.5), Some(0.5));
    }

    #[test]
    fn renders_a_float_wav() {
        let path = std::env::temp_dir().join(format!("bleposc-test-{}.wav", std::process::id()));
        let args = Args {
            sample_rate: Some(8_000),
            channels: Some(2),
            duration_sec: Some(0.25),
            sweep_to: Some(1000.0),
            ..Args::default()
        };
        let frames = render_wav(&path, &args).unwrap();
        assert_eq!(frames, 2_000);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 4_000);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.iter().any(|s| s.abs() > 0.1));

        std::fs::remove_file(&path).unwrap();
    }
}
