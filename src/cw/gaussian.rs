//! Gaussian-windowed bandpass CW filter.

use std::f64::consts::TAU;

use log::debug;

use crate::config::{CwMode, GaussianConfig};
use crate::constants::{FWHM_TO_SIGMA, MIN_GAUSSIAN_TAPS};
use crate::cw::apply_mode;
use crate::error::{CwError, Result};
use crate::signal_processing::{ApplyMode, ComplexSample, FirCore};

/// Build a Gaussian impulse response.
///
/// `fwhm` is the bandwidth as full width at half maximum; `nsigma` is how
/// many standard deviations the window extends on each side of center.
/// A `tap_count` of 0 derives the count from the bandwidth: the next power
/// of two covering `2*nsigma*sigma*rate` samples, floored at 1024.
///
/// The real window is normalized so its taps sum to `scale` (a DC-gain
/// normalization), then modulated to the center frequency writing mirrored
/// index pairs, so the result is numerically symmetric regardless of
/// floating-point evaluation order.
pub fn build_gaussian(
    rate: f64,
    f_center: f64,
    fwhm: f64,
    scale: f64,
    nsigma: f64,
    tap_count: usize,
) -> Result<Vec<ComplexSample>> {
    if !(fwhm > 0.0) {
        return Err(CwError::FilterDesign(format!(
            "FWHM bandwidth must be positive, got {fwhm}"
        )));
    }
    let fsigma = fwhm / FWHM_TO_SIGMA;
    let sigma = 1.0 / (TAU * fsigma);
    let nc = if tap_count == 0 {
        ((2.0 * nsigma * sigma * rate).ceil() as usize)
            .next_power_of_two()
            .max(MIN_GAUSSIAN_TAPS)
    } else {
        tap_count
    };

    let delta = 1.0 / rate;
    let gmult = 1.0 / ((TAU).sqrt() * sigma);
    let gdiv = 1.0 / (2.0 * sigma * sigma);
    let mut window = Vec::with_capacity(nc);
    let mut sum = 0.0;
    for i in 0..nc {
        let y = i as f64 - (nc - 1) as f64 / 2.0;
        let x = y * delta;
        let w = gmult * (-(x * x) * gdiv).exp();
        window.push(w);
        sum += w;
    }
    let norm = scale / sum;
    for w in &mut window {
        *w *= norm;
    }

    let mut taps = vec![ComplexSample::new(0.0, 0.0); nc];
    let w_osc = -TAU * f_center / rate;
    let m = 0.5 * (nc - 1) as f64;
    let mut i = nc.div_ceil(2);
    let mut j = nc / 2 - 1;
    while i < nc {
        let posi = i as f64 - m;
        let posj = j as f64 - m;
        // the window is symmetric; using one side's coefficient for both
        // halves keeps the pair numerically identical in magnitude
        let coef = window[j];
        taps[i] = ComplexSample::new(coef * (posi * w_osc).cos(), -coef * (posi * w_osc).sin());
        taps[j] = ComplexSample::new(coef * (posj * w_osc).cos(), -coef * (posj * w_osc).sin());
        i += 1;
        j = j.wrapping_sub(1);
    }
    Ok(taps)
}

/// Gaussian CW filter instance.
///
/// When created with a tap count of 0, the count stays bandwidth-derived:
/// later bandwidth or rate changes re-derive it instead of keeping it
/// fixed. An explicit nonzero tap count pins it until reset to 0.
pub struct Gaussian {
    run: bool,
    position: usize,
    size: usize,
    nc: usize,
    auto_nc: bool,
    f_center: f64,
    bandwidth: f64,
    sample_rate: u32,
    gain: f64,
    scale: f64,
    nsigma: f64,
    mode: CwMode,
    core: FirCore,
}

impl Gaussian {
    pub fn new(config: &GaussianConfig) -> Result<Self> {
        if config.tap_count != 0 && !config.tap_count.is_power_of_two() {
            return Err(CwError::InvalidTapCount(format!(
                "{} is not a power of two",
                config.tap_count
            )));
        }
        let scale = config.gain / (2 * config.size) as f64;
        let impulse = build_gaussian(
            config.sample_rate as f64,
            config.f_center,
            config.bandwidth,
            scale,
            config.nsigma,
            config.tap_count,
        )?;
        let nc = impulse.len();
        let core = FirCore::new(config.size, nc, &impulse)?;
        Ok(Self {
            run: config.run,
            position: config.position,
            size: config.size,
            nc,
            auto_nc: config.tap_count == 0,
            f_center: config.f_center,
            bandwidth: config.bandwidth,
            sample_rate: config.sample_rate,
            gain: config.gain,
            scale,
            nsigma: config.nsigma,
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

    /// Whether the tap count is currently bandwidth-derived.
    pub fn auto_sized(&self) -> bool {
        self.auto_nc
    }

    /// The currently loaded impulse response.
    pub fn taps(&self) -> &[ComplexSample] {
        self.core.impulse()
    }

    /// Engine coefficient loads so far.
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

    /// Explicit tap-count override. 0 restores auto-sizing; a nonzero
    /// value must be a power of two no smaller than the block size.
    pub fn set_tap_count(&mut self, tap_count: usize) -> Result<()> {
        if tap_count == self.nc {
            return Ok(());
        }
        if tap_count == 0 {
            self.auto_nc = true;
        } else {
            if !tap_count.is_power_of_two() {
                return Err(CwError::InvalidTapCount(format!(
                    "{tap_count} is not a power of two"
                )));
            }
            if tap_count < self.size {
                return Err(CwError::InvalidTapCount(format!(
                    "{tap_count} is smaller than the block size {}",
                    self.size
                )));
            }
            self.auto_nc = false;
        }
        let request = if self.auto_nc { 0 } else { tap_count };
        let impulse = build_gaussian(
            self.sample_rate as f64,
            self.f_center,
            self.bandwidth,
            self.scale,
            self.nsigma,
            request,
        )?;
        self.nc = impulse.len();
        self.core.set_tap_count(self.nc, &impulse)
    }

    fn rebuild(&mut self) -> Result<()> {
        let request = if self.auto_nc { 0 } else { self.nc };
        let impulse = build_gaussian(
            self.sample_rate as f64,
            self.f_center,
            self.bandwidth,
            self.scale,
            self.nsigma,
            request,
        )?;
        if impulse.len() == self.nc {
            self.core.set_impulse(&impulse, ApplyMode::AtBlockBoundary)
        } else {
            debug!("gaussian resize: {} -> {} taps", self.nc, impulse.len());
            self.nc = impulse.len();
            self.core.set_tap_count(self.nc, &impulse)
        }
    }
}
