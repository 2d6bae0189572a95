//! CW filter selector.
//!
//! Multiplexes the four filter technologies behind one set of operator
//! controls. The selector owns the operator-visible state and enforces
//! that at most one technology runs at a time; it never inspects the
//! instances' internals, only their public control surfaces.

use std::f64::consts::SQRT_2;

use crate::channel::CwFilterBank;
use crate::config::{CwTechnology, SelectorConfig};
use crate::error::Result;

pub struct CwSelector {
    technology: CwTechnology,
    run: bool,
    f_center: f64,
    bandwidth: f64,
    gain: f64,
}

impl CwSelector {
    pub fn new(config: &SelectorConfig) -> Self {
        Self {
            technology: config.technology,
            run: config.run,
            f_center: config.f_center,
            bandwidth: config.bandwidth,
            gain: config.gain,
        }
    }

    pub fn technology(&self) -> CwTechnology {
        self.technology
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

    /// Switch to `technology`. The other three technologies are stopped,
    /// the selector's frequency, bandwidth, and calibrated gain are pushed
    /// into the target, and the stored run flag is applied (switching while
    /// stopped leaves everything stopped). A reselect of the current
    /// technology is a no-op.
    pub fn select(&mut self, bank: &mut CwFilterBank, technology: CwTechnology) -> Result<()> {
        if technology == self.technology {
            return Ok(());
        }
        self.technology = technology;
        match technology {
            CwTechnology::DoublePole => {
                bank.matched.set_run(false);
                bank.gaussian.set_run(false);
                bank.biquad.set_run(false);
                bank.double_pole
                    .recompute(self.f_center, self.bandwidth, self.gain)?;
                bank.double_pole.set_run(self.run);
            }
            CwTechnology::Matched => {
                bank.double_pole.set_run(false);
                bank.gaussian.set_run(false);
                bank.biquad.set_run(false);
                bank.matched
                    .recompute(self.f_center, self.bandwidth, SQRT_2 * self.gain)?;
                bank.matched.set_run(self.run);
            }
            CwTechnology::Gaussian => {
                bank.double_pole.set_run(false);
                bank.matched.set_run(false);
                bank.biquad.set_run(false);
                bank.gaussian
                    .recompute(self.f_center, self.bandwidth, SQRT_2 * self.gain)?;
                bank.gaussian.set_run(self.run);
            }
            CwTechnology::BiQuad => {
                bank.double_pole.set_run(false);
                bank.matched.set_run(false);
                bank.gaussian.set_run(false);
                bank.biquad.set_frequency(self.f_center);
                bank.biquad.set_bandwidth(self.bandwidth);
                bank.biquad.set_gain(self.gain);
                bank.biquad.set_run(self.run);
            }
        }
        Ok(())
    }

    /// Store the run flag and forward it to the current technology.
    pub fn set_run(&mut self, bank: &mut CwFilterBank, run: bool) {
        self.run = run;
        match self.technology {
            CwTechnology::DoublePole => bank.double_pole.set_run(run),
            CwTechnology::Matched => bank.matched.set_run(run),
            CwTechnology::Gaussian => bank.gaussian.set_run(run),
            CwTechnology::BiQuad => bank.biquad.set_run(run),
        }
    }

    /// Store the center frequency and retune the current technology.
    pub fn set_frequency(&mut self, bank: &mut CwFilterBank, f_center: f64) -> Result<()> {
        self.f_center = f_center;
        self.forward_freqs(bank)
    }

    /// Store the bandwidth and retune the current technology.
    pub fn set_bandwidth(&mut self, bank: &mut CwFilterBank, bandwidth: f64) -> Result<()> {
        self.bandwidth = bandwidth;
        self.forward_freqs(bank)
    }

    /// Store the gain and forward it, calibrated per technology: the
    /// matched and Gaussian designs take sqrt(2) times the operator gain to
    /// present the same apparent level as the closed-form designs.
    pub fn set_gain(&mut self, bank: &mut CwFilterBank, gain: f64) -> Result<()> {
        self.gain = gain;
        match self.technology {
            CwTechnology::DoublePole => {
                let a = &mut bank.double_pole;
                a.recompute(a.f_center(), a.bandwidth(), gain)
            }
            CwTechnology::Matched => {
                let a = &mut bank.matched;
                a.recompute(a.f_center(), a.bandwidth(), SQRT_2 * gain)
            }
            CwTechnology::Gaussian => {
                let a = &mut bank.gaussian;
                a.recompute(a.f_center(), a.bandwidth(), SQRT_2 * gain)
            }
            CwTechnology::BiQuad => {
                bank.biquad.set_gain(gain);
                Ok(())
            }
        }
    }

    fn forward_freqs(&self, bank: &mut CwFilterBank) -> Result<()> {
        match self.technology {
            CwTechnology::DoublePole => {
                let a = &mut bank.double_pole;
                a.recompute(self.f_center, self.bandwidth, a.gain())
            }
            CwTechnology::Matched => {
                let a = &mut bank.matched;
                a.recompute(self.f_center, self.bandwidth, a.gain())
            }
            CwTechnology::Gaussian => {
                let a = &mut bank.gaussian;
                a.recompute(self.f_center, self.bandwidth, a.gain())
            }
            CwTechnology::BiQuad => {
                bank.biquad.set_frequency(self.f_center);
                bank.biquad.set_bandwidth(self.bandwidth);
                Ok(())
            }
        }
    }
}
