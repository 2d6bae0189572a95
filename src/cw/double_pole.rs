//! Double-pole resonator CW filter.
//!
//! Three derivations of the same two-pole bandpass exist side by side. The
//! closed-form single-exponential (`build_double_pole_1eff`) is the one
//! wired into the instance's create/recompute path; the one-sided and
//! two-sided derivations evaluate the resonator frequency response
//! numerically and are kept as independently testable references.

use std::f64::consts::{PI, TAU};

use log::debug;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::{CwMode, DoublePoleConfig};
use crate::constants::{
    ANALYTIC_PAD_FACTOR, DPOLE_BASE_TAPS, DPOLE_BW_COMPENSATION, DPOLE_DESIGN_SPAN_HZ,
    DPOLE_RATE_STEP, MIN_DPOLE_TAPS,
};
use crate::cw::apply_mode;
use crate::error::{CwError, Result};
use crate::signal_processing::{ApplyMode, ComplexSample, FirCore, analytic};

/// Tap budget for the double-pole impulse: narrower filters need longer,
/// more frequency-selective responses, and higher rates need
/// proportionally more taps for the same time span.
pub(crate) fn calc_dpole_nc(rate: f64, bandwidth: f64) -> usize {
    let rate_mult = (rate as u32 / DPOLE_RATE_STEP) as usize;
    let mut bw_mult = 1;
    if bandwidth < 80.0 {
        bw_mult = 2;
    }
    if bandwidth < 40.0 {
        bw_mult = 4;
    }
    if bandwidth < 20.0 {
        bw_mult = 8;
    }
    if bandwidth < 10.0 {
        bw_mult = 16;
    }
    (DPOLE_BASE_TAPS * rate_mult * bw_mult).max(MIN_DPOLE_TAPS)
}

/// Two-pole resonator frequency response at baseband frequency `f`:
/// `H(f) = (bw/fc) / (1 - (f/fc)^2 + j*f*bw/fc^2)`. Requires `f_center`
/// nonzero.
fn resonator_response(f_center: f64, bandwidth: f64, f: f64) -> ComplexSample {
    let num = Complex::new(bandwidth / f_center, 0.0);
    let den = Complex::new(
        1.0 - (f / f_center) * (f / f_center),
        f * bandwidth / (f_center * f_center),
    );
    num / den
}

fn check_bandwidth(bandwidth: f64) -> Result<()> {
    if !(bandwidth > 0.0) {
        return Err(CwError::FilterDesign(format!(
            "bandwidth must be positive, got {bandwidth}"
        )));
    }
    Ok(())
}

fn check_f_center(f_center: f64) -> Result<()> {
    if f_center == 0.0 {
        return Err(CwError::FilterDesign(
            "center frequency must be nonzero for the resonator response".into(),
        ));
    }
    Ok(())
}

/// Production double-pole design: a complex one-pole resonator impulse,
/// exponential decay modulated to the center frequency, truncated to the
/// tap budget. Tap `i` has magnitude `scale*alpha*exp(-alpha*i)` and phase
/// `omega*i`.
pub fn build_double_pole_1eff(
    rate: f64,
    f_center: f64,
    bandwidth: f64,
    scale: f64,
) -> Result<Vec<ComplexSample>> {
    check_bandwidth(bandwidth)?;
    let bw = bandwidth / DPOLE_BW_COMPENSATION;
    let nc = calc_dpole_nc(rate, bw);
    let alpha = PI * bw / rate;
    let omega = -TAU * f_center / rate;
    let mut taps = Vec::with_capacity(nc);
    for i in 0..nc {
        let mag = scale * alpha * (-alpha * i as f64).exp();
        let arg = omega * i as f64;
        taps.push(ComplexSample::new(mag * arg.cos(), -mag * arg.sin()));
    }
    Ok(taps)
}

/// One-sided reference design: inverse-transform summation of the
/// resonator response over the design window at each time index, followed
/// by analytic-signal conversion over a zero-padded buffer and
/// normalization so the tap magnitudes sum to `scale`.
pub fn build_double_pole_1sided(
    rate: f64,
    f_center: f64,
    bandwidth: f64,
    scale: f64,
) -> Result<Vec<ComplexSample>> {
    check_bandwidth(bandwidth)?;
    check_f_center(f_center)?;
    let nc = calc_dpole_nc(rate, bandwidth);
    let steps = DPOLE_DESIGN_SPAN_HZ as i64;

    let mut taps = vec![ComplexSample::new(0.0, 0.0); nc];
    for (i, tap) in taps.iter_mut().enumerate() {
        let mut sum = ComplexSample::new(0.0, 0.0);
        for k in 0..=steps {
            let f = k as f64 - DPOLE_DESIGN_SPAN_HZ / 2.0;
            let theta = TAU * i as f64 * f / rate;
            let eto = ComplexSample::new(theta.cos(), theta.sin());
            sum += resonator_response(f_center, bandwidth, f) * eto;
        }
        *tap = ComplexSample::new(sum.re / nc as f64, 0.0);
    }

    let mut padded = vec![ComplexSample::new(0.0, 0.0); ANALYTIC_PAD_FACTOR * nc];
    padded[..nc].copy_from_slice(&taps);
    analytic(&mut padded);
    taps.copy_from_slice(&padded[..nc]);

    let sum: f64 = taps.iter().map(|t| t.norm()).sum();
    if !(sum > 0.0) {
        return Err(CwError::FilterDesign(
            "one-sided double-pole response collapsed to zero".into(),
        ));
    }
    let norm = scale / sum;
    for tap in &mut taps {
        *tap *= norm;
    }
    Ok(taps)
}

/// Two-sided reference design: populate the near-DC frequency bins of the
/// design window from the resonator response, inverse-FFT to the time
/// domain, and discard the imaginary parts, yielding a real envelope
/// without the analytic step.
pub fn build_double_pole_2sided(
    rate: f64,
    f_center: f64,
    bandwidth: f64,
    scale: f64,
) -> Result<Vec<ComplexSample>> {
    check_bandwidth(bandwidth)?;
    check_f_center(f_center)?;
    let bw = bandwidth / DPOLE_BW_COMPENSATION;
    let nc = calc_dpole_nc(rate, bw);
    let delta = rate / nc as f64;
    let mult = 2.0 * scale / nc as f64;
    let half_span = DPOLE_DESIGN_SPAN_HZ / 2.0;

    let mut spectrum = vec![ComplexSample::new(0.0, 0.0); nc];
    let mut f = 0.0;
    let mut i = 0;
    while f <= half_span && i < nc / 2 {
        spectrum[i] = resonator_response(f_center, bw, f) * mult;
        i += 1;
        f += delta;
    }
    let mut f = -delta;
    let mut i = nc - 1;
    while f >= -half_span && i > nc / 2 {
        spectrum[i] = resonator_response(f_center, bw, f) * mult;
        i -= 1;
        f -= delta;
    }

    FftPlanner::<f64>::new()
        .plan_fft_inverse(nc)
        .process(&mut spectrum);
    for tap in &mut spectrum {
        tap.im = 0.0;
    }
    Ok(spectrum)
}

/// Double-pole CW filter instance.
///
/// Owns its configuration and a partitioned overlap-save engine; every
/// parameter change rebuilds the impulse response and hot-swaps it, or
/// resizes the engine when the tap budget moved.
pub struct DoublePole {
    run: bool,
    position: usize,
    size: usize,
    nc: usize,
    f_center: f64,
    bandwidth: f64,
    sample_rate: u32,
    gain: f64,
    scale: f64,
    mode: CwMode,
    core: FirCore,
}

impl DoublePole {
    pub fn new(config: &DoublePoleConfig) -> Result<Self> {
        let scale = config.gain / (2 * config.size) as f64;
        let impulse = build_double_pole_1eff(
            config.sample_rate as f64,
            config.f_center,
            config.bandwidth,
            scale,
        )?;
        let nc = impulse.len();
        let core = FirCore::new(config.size, nc, &impulse)?;
        Ok(Self {
            run: config.run,
            position: config.position,
            size: config.size,
            nc,
            f_center: config.f_center,
            bandwidth: config.bandwidth,
            sample_rate: config.sample_rate,
            gain: config.gain,
            scale,
            mode: config.mode,
            core,
        })
    }

    /// Reset the engine's overlap history; call on stream discontinuities.
    pub fn flush(&mut self) {
        self.core.flush();
    }

    /// Filter one block in place when enabled and scheduled at `pos`;
    /// otherwise leave the block untouched.
    pub fn process(&mut self, block: &mut [ComplexSample], pos: usize) {
        if self.run && self.position == pos {
            apply_mode(self.mode, block);
            self.core.process(block);
        }
    }

    pub fn set_run(&mut self, run: bool) {
        self.run = run;
    }

    pub fn run(&self) -> bool {
        self.run
    }

    pub fn f_center(&self) -> f64 {
        self.f_center
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn tap_count(&self) -> usize {
        self.nc
    }

    /// The currently loaded impulse response.
    pub fn taps(&self) -> &[ComplexSample] {
        self.core.impulse()
    }

    /// Engine coefficient loads so far; lets tests observe that redundant
    /// recomputes do not reload.
    pub fn impulse_loads(&self) -> u64 {
        self.core.impulse_loads()
    }

    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        self.sample_rate = rate;
        self.rebuild()
    }

    /// Change the block length. `size` must not exceed the tap count.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if size > self.nc {
            return Err(CwError::BlockSizeExceedsTaps {
                size,
                taps: self.nc,
            });
        }
        self.size = size;
        self.core.set_size(size)?;
        // scale is a function of size, so the impulse must be rebuilt
        self.scale = self.gain / (2 * size) as f64;
        self.rebuild()
    }

    pub fn set_gain(&mut self, gain: f64) -> Result<()> {
        self.gain = gain;
        self.scale = self.gain / (2 * self.size) as f64;
        self.rebuild()
    }

    /// Combined frequency/bandwidth/gain update; a no-op unless at least
    /// one value actually changed.
    pub fn recompute(&mut self, f_center: f64, bandwidth: f64, gain: f64) -> Result<()> {
        if self.f_center == f_center && self.bandwidth == bandwidth && self.gain == gain {
            return Ok(());
        }
        self.f_center = f_center;
        self.bandwidth = bandwidth;
        self.gain = gain;
        self.scale = self.gain / (2 * self.size) as f64;
        self.rebuild()
    }

    fn rebuild(&mut self) -> Result<()> {
        let impulse = build_double_pole_1eff(
            self.sample_rate as f64,
            self.f_center,
            self.bandwidth,
            self.scale,
        )?;
        if impulse.len() == self.nc {
            self.core.set_impulse(&impulse, ApplyMode::AtBlockBoundary)
        } else {
            debug!("double-pole resize: {} -> {} taps", self.nc, impulse.len());
            self.nc = impulse.len();
            self.core.set_tap_count(self.nc, &impulse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn response_at(taps: &[ComplexSample], rate: f64, f: f64) -> f64 {
        let mut sum = ComplexSample::new(0.0, 0.0);
        for (i, tap) in taps.iter().enumerate() {
            let theta = -TAU * f * i as f64 / rate;
            sum += tap * ComplexSample::new(theta.cos(), theta.sin());
        }
        sum.norm()
    }

    #[test]
    fn test_tap_budget_doubles_as_bandwidth_narrows() {
        assert_eq!(calc_dpole_nc(48_000.0, 100.0), 2048);
        assert_eq!(calc_dpole_nc(48_000.0, 75.0), 2048);
        assert_eq!(calc_dpole_nc(48_000.0, 30.0), 4096);
        assert_eq!(calc_dpole_nc(48_000.0, 15.0), 8192);
        assert_eq!(calc_dpole_nc(48_000.0, 5.0), 16384);
    }

    #[test]
    fn test_tap_budget_floors_at_minimum() {
        assert_eq!(calc_dpole_nc(8_000.0, 100.0), MIN_DPOLE_TAPS);
    }

    #[test]
    fn test_1eff_first_tap_and_decay_ratio() {
        let rate = 48_000.0;
        let bandwidth = 100.0;
        let scale = 0.25;
        let taps = build_double_pole_1eff(rate, 600.0, bandwidth, scale).unwrap();

        let alpha = PI * (bandwidth / DPOLE_BW_COMPENSATION) / rate;
        assert_relative_eq!(taps[0].norm(), scale * alpha, max_relative = 1e-12);

        let ratio = (-alpha).exp();
        for i in 0..16 {
            assert_relative_eq!(
                taps[i + 1].norm() / taps[i].norm(),
                ratio,
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn test_1eff_rejects_zero_bandwidth() {
        assert!(build_double_pole_1eff(48_000.0, 600.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_reference_variants_reject_zero_center_frequency() {
        assert!(build_double_pole_1sided(48_000.0, 0.0, 100.0, 1.0).is_err());
        assert!(build_double_pole_2sided(48_000.0, 0.0, 100.0, 1.0).is_err());
    }

    #[test]
    fn test_all_variants_peak_near_center_frequency() {
        let rate = 48_000.0;
        let f_center = 600.0;
        let bandwidth = 100.0;
        let scale = 1.0 / 2048.0;

        let variants = [
            build_double_pole_1eff(rate, f_center, bandwidth, scale).unwrap(),
            build_double_pole_1sided(rate, f_center, bandwidth, scale).unwrap(),
            build_double_pole_2sided(rate, f_center, bandwidth, scale).unwrap(),
        ];

        for taps in &variants {
            let at_center = response_at(taps, rate, f_center);
            let above = response_at(taps, rate, f_center + 500.0);
            let below = response_at(taps, rate, f_center + 1000.0);
            assert!(
                at_center > 10.0 * above && at_center > 10.0 * below,
                "skirt not falling off: center {at_center}, +500 Hz {above}, +1000 Hz {below}"
            );
        }
    }

    #[test]
    fn test_instance_bypasses_when_stopped() {
        let config = DoublePoleConfig {
            size: 64,
            ..DoublePoleConfig::default()
        };
        let mut filter = DoublePole::new(&config).unwrap();
        let block: Vec<ComplexSample> = (0..64)
            .map(|i| ComplexSample::new(i as f64, -(i as f64)))
            .collect();

        let mut out = block.clone();
        filter.process(&mut out, 0);
        assert_eq!(out, block);

        filter.set_run(true);
        let mut out = block.clone();
        filter.process(&mut out, 1); // wrong pipeline slot
        assert_eq!(out, block);
    }

    #[test]
    fn test_recompute_is_equality_gated() {
        let mut filter = DoublePole::new(&DoublePoleConfig::default()).unwrap();
        filter.recompute(700.0, 50.0, 1.0).unwrap();
        let loads = filter.impulse_loads();
        filter.recompute(700.0, 50.0, 1.0).unwrap();
        assert_eq!(filter.impulse_loads(), loads);
    }

    #[test]
    fn test_sample_rate_round_trip_reproduces_taps() {
        let mut filter = DoublePole::new(&DoublePoleConfig::default()).unwrap();
        let original = filter.taps().to_vec();
        filter.set_sample_rate(96_000).unwrap();
        filter.set_sample_rate(48_000).unwrap();
        let restored = filter.taps();
        assert_eq!(original.len(), restored.len());
        for (a, b) in original.iter().zip(restored) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-15);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_set_size_beyond_tap_count_rejected() {
        let mut filter = DoublePole::new(&DoublePoleConfig::default()).unwrap();
        let taps = filter.tap_count();
        assert!(matches!(
            filter.set_size(taps * 2),
            Err(CwError::BlockSizeExceedsTaps { .. })
        ));
    }
}
