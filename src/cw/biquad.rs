//! Control shadow for the recursive biquad CW filter.
//!
//! The biquad signal path is a separate recursive filter family outside
//! this subsystem; the selector only needs its run/frequency/bandwidth/gain
//! controls, held here.

use crate::config::BiQuadConfig;

pub struct BiQuad {
    run: bool,
    f_center: f64,
    bandwidth: f64,
    gain: f64,
}

impl BiQuad {
    pub fn new(config: &BiQuadConfig) -> Self {
        Self {
            run: config.run,
            f_center: config.f_center,
            bandwidth: config.bandwidth,
            gain: config.gain,
        }
    }

    pub fn set_run(&mut self, run: bool) {
        self.run = run;
    }

    pub fn run(&self) -> bool {
        self.run
    }

    pub fn set_frequency(&mut self, f_center: f64) {
        self.f_center = f_center;
    }

    pub fn f_center(&self) -> f64 {
        self.f_center
    }

    pub fn set_bandwidth(&mut self, bandwidth: f64) {
        self.bandwidth = bandwidth;
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}
