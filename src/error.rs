// PIPEGOV ERRORS
// CONFIG MUTATION, GRID CONSTRUCTION, RUN-LOG PARSING.

use crate::freq::CpuClass;

// THE CONFIG IS LEFT UNCHANGED WHENEVER ONE OF THESE IS RETURNED
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("partition point {point} out of range: {value} (valid 1..={max})")]
    PartitionOutOfRange { point: u8, value: u32, max: u32 },

    #[error("{khz} kHz is not a supported {cpu} frequency")]
    InvalidFrequency { cpu: CpuClass, khz: u32 },

    #[error("invalid stage order '{0}' (expected a permutation like G-B-L)")]
    InvalidOrder(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("measurement grid has no cells")]
    Empty,

    #[error("grid shape mismatch: {big} x {little} axes but {cells} cells")]
    ShapeMismatch { big: usize, little: usize, cells: usize },

    #[error("non-finite grid cell at big index {big_idx}, little index {little_idx}")]
    NonFinite { big_idx: usize, little_idx: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("run log is missing '{0}'")]
    MissingField(&'static str),

    #[error("malformed number for '{field}': {raw}")]
    BadNumber { field: &'static str, raw: String },

    #[error("run log pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}
