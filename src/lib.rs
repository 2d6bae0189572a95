pub mod channel;
pub mod config;
pub mod constants;
pub mod cw;
pub mod error;
pub mod selector;
pub mod signal_processing;

pub use channel::{ChannelRegistry, CwFilterBank, RxChannel};
pub use config::{CwConfig, CwMode, CwTechnology, ImpulsePlacement};
pub use error::{CwError, Result};
pub use selector::CwSelector;
pub use signal_processing::ComplexSample;
