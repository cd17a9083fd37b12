// PIPEGOV -- HETEROGENEOUS PIPELINE GOVERNOR
// GPU -> BIG CPU -> LITTLE CPU INFERENCE PIPELINE ON A MOBILE SOC
//
// PURE-RUST LIBRARY: EVERYTHING HERE RUNS OFFLINE WITHOUT THE BOARD.
// THE BINARY (main.rs) WIRES IT TO THE SHELL SCRIPTS THAT DRIVE HARDWARE.

#[macro_use]
pub mod log;

pub mod bottleneck;
pub mod config;
pub mod error;
pub mod event;
pub mod freq;
pub mod governor;
pub mod grid;
pub mod measure;
pub mod model;
pub mod partition;
pub mod pid;
mod reduce;
pub mod runner;
pub mod session;
pub mod trace;
pub mod tuning;

pub use config::{PipelineConfig, Processor, StageOrder, TOTAL_LAYERS};
pub use error::{ConfigError, GridError, ParseError};
pub use freq::CpuClass;
pub use governor::{BestCandidate, PidGovernor, StepOutcome, StepReport};
pub use grid::MeasurementGrid;
pub use measure::Measurement;
pub use model::PowerModel;
