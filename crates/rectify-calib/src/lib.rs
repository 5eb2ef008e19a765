#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the calibration module.
pub mod error;

/// Lens distortion model and undistortion maps.
pub mod distortion;

/// The stereo calibration model.
pub mod model;

/// Stereo rectification and working geometry planning.
pub mod rectify;

/// Derivation of the calibration valid for the resampled output.
pub mod rewrite;

/// Reading and writing calibration files (OpenCV YAML or JSON).
pub mod store;

pub use crate::distortion::Distortion;
pub use crate::error::CalibError;
pub use crate::model::CalibrationModel;
pub use crate::rectify::{RemapTable, StereoRectification, WorkingGeometry};
