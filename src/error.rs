use thiserror::Error;

#[derive(Error, Debug)]
pub enum CwError {
    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Block size {size} exceeds tap count {taps}")]
    BlockSizeExceedsTaps { size: usize, taps: usize },

    #[error("Invalid tap count: {0}")]
    InvalidTapCount(String),

    #[error("Division by complex zero")]
    DivisionByZero,

    #[error("Impedance decomposition undefined: {0}")]
    DegenerateImpedance(&'static str),

    #[error("Unknown receive channel {0}")]
    UnknownChannel(usize),
}

pub type Result<T> = std::result::Result<T, CwError>;
