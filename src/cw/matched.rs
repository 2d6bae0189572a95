//! Matched CW filter.
//!
//! A constant-amplitude tone whose length approximates the time-bandwidth
//! product of a matched CW pulse, padded into a power-of-two field.

use std::f64::consts::TAU;

use log::debug;

use crate::config::{CwMode, ImpulsePlacement, MatchedConfig};
use crate::constants::{MATCHED_TIME_BANDWIDTH, MIN_MATCHED_TAPS};
use crate::cw::apply_mode;
use crate::error::{CwError, Result};
use crate::signal_processing::{ApplyMode, ComplexSample, FirCore};

/// Build a matched impulse response.
///
/// The nonzero span is `round(1.2067 * rate / fwhm)` taps rounded to even,
/// placed left-justified or centered within a field padded to the next
/// power of two no smaller than 1024. The returned vector has the padded
/// field length; tap magnitudes over the nonzero span sum to `scale`.
pub fn build_matched(
    rate: f64,
    f_center: f64,
    fwhm: f64,
    scale: f64,
    placement: ImpulsePlacement,
) -> Result<Vec<ComplexSample>> {
    if !(fwhm > 0.0) {
        return Err(CwError::FilterDesign(format!(
            "FWHM bandwidth must be positive, got {fwhm}"
        )));
    }
    let nc_d = MATCHED_TIME_BANDWIDTH * rate / fwhm;
    let nc = ((nc_d * 0.5).round() * 2.0) as usize;
    if nc < 2 {
        return Err(CwError::FilterDesign(format!(
            "bandwidth {fwhm} Hz too wide for sample rate {rate}"
        )));
    }
    let fsize = nc.next_power_of_two().max(MIN_MATCHED_TAPS);

    let mut taps = vec![ComplexSample::new(0.0, 0.0); fsize];
    let w_osc = -TAU * f_center / rate;
    let m = 0.5 * (fsize - 1) as f64;
    let start = match placement {
        ImpulsePlacement::LeftJustified => nc.div_ceil(2),
        ImpulsePlacement::Centered => fsize.div_ceil(2),
    };

    let mut sum = 0.0;
    let mut i = start;
    let mut j = start - 1;
    for _ in 0..nc / 2 {
        let posi = i as f64 - m;
        let posj = j as f64 - m;
        taps[i] = ComplexSample::new((posi * w_osc).cos(), -(posi * w_osc).sin());
        taps[j] = ComplexSample::new((posj * w_osc).cos(), -(posj * w_osc).sin());
        sum += taps[i].norm() + taps[j].norm();
        i += 1;
        j = j.wrapping_sub(1);
    }
    let norm = scale / sum;
    let mut i = start;
    let mut j = start - 1;
    for _ in 0..nc / 2 {
        taps[i] *= norm;
        taps[j] *= norm;
        i += 1;
        j = j.wrapping_sub(1);
    }
    Ok(taps)
}

/// Matched CW filter instance.
pub struct Matched {
    run: bool,
    position: usize,
    size: usize,
    nc: usize,
    f_center: f64,
    bandwidth: f64,
    sample_rate: u32,
    gain: f64,
    scale: f64,
    placement: ImpulsePlacement,
    mode: CwMode,
    core: FirCore,
}

impl Matched {
    pub fn new(config: &MatchedConfig) -> Result<Self> {
        let scale = config.gain / (2 * config.size) as f64;
        let impulse = build_matched(
            config.sample_rate as f64,
            config.f_center,
            config.bandwidth,
            scale,
            config.placement,
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
            placement: config.placement,
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

    fn rebuild(&mut self) -> Result<()> {
        let impulse = build_matched(
            self.sample_rate as f64,
            self.f_center,
            self.bandwidth,
            self.scale,
            self.placement,
        )?;
        if impulse.len() == self.nc {
            self.core.set_impulse(&impulse, ApplyMode::AtBlockBoundary)
        } else {
            debug!("matched resize: {} -> {} taps", self.nc, impulse.len());
            self.nc = impulse.len();
            self.core.set_tap_count(self.nc, &impulse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tap_magnitudes_sum_to_scale() {
        let scale = 0.5;
        for placement in [ImpulsePlacement::LeftJustified, ImpulsePlacement::Centered] {
            let taps = build_matched(48_000.0, 600.0, 100.0, scale, placement).unwrap();
            let sum: f64 = taps.iter().map(|t| t.norm()).sum();
            assert_relative_eq!(sum, scale, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_field_is_power_of_two_with_floor() {
        let taps = build_matched(48_000.0, 600.0, 250.0, 1.0, ImpulsePlacement::LeftJustified)
            .unwrap();
        assert_eq!(taps.len(), MIN_MATCHED_TAPS);

        // 1.2067 * 48000 / 40 = 1448 -> field of 2048
        let taps =
            build_matched(48_000.0, 600.0, 40.0, 1.0, ImpulsePlacement::LeftJustified).unwrap();
        assert_eq!(taps.len(), 2048);
    }

    #[test]
    fn test_nonzero_span_is_even_and_placed() {
        let rate = 48_000.0;
        let fwhm = 100.0;
        let nc = ((MATCHED_TIME_BANDWIDTH * rate / fwhm * 0.5).round() * 2.0) as usize;
        assert_eq!(nc % 2, 0);

        let left =
            build_matched(rate, 600.0, fwhm, 1.0, ImpulsePlacement::LeftJustified).unwrap();
        assert!(left[..nc].iter().all(|t| t.norm() > 0.0));
        assert!(left[nc..].iter().all(|t| t.norm() == 0.0));

        let centered = build_matched(rate, 600.0, fwhm, 1.0, ImpulsePlacement::Centered).unwrap();
        let fsize = centered.len();
        let lo = fsize / 2 - nc / 2;
        let hi = lo + nc;
        assert!(centered[..lo].iter().all(|t| t.norm() == 0.0));
        assert!(centered[lo..hi].iter().all(|t| t.norm() > 0.0));
        assert!(centered[hi..].iter().all(|t| t.norm() == 0.0));
    }

    #[test]
    fn test_zero_bandwidth_rejected() {
        assert!(
            build_matched(48_000.0, 600.0, 0.0, 1.0, ImpulsePlacement::LeftJustified).is_err()
        );
    }

    #[test]
    fn test_recompute_resizes_field_when_bandwidth_narrows() {
        let mut filter = Matched::new(&MatchedConfig::default()).unwrap();
        assert_eq!(filter.tap_count(), 1024);
        filter.recompute(600.0, 40.0, 1.0).unwrap();
        assert_eq!(filter.tap_count(), 2048);
    }
}
