pub mod analytic;
pub mod cmath;
pub mod fir_core;

pub use analytic::analytic;
pub use cmath::{ComplexSample, divide, magnitude, parallel_combine, series_to_parallel};
pub use fir_core::{ApplyMode, FirCore};
