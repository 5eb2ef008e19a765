#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Run parameters.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// Run driver: calibration, geometry planning and the batch.
pub mod run;

/// Partitioning of the frame range and the worker pool.
pub mod scheduler;

/// Per frame remap and resize.
pub mod transform;

pub use crate::config::{ColorMode, PipelineConfig};
pub use crate::error::RectifyError;
pub use crate::run::{run, RunSummary};
pub use crate::scheduler::FrameRange;
