use std::path::PathBuf;

use rectify_calib::CalibError;
use rectify_io::IoError;

/// An error type for the rectification pipeline.
#[derive(thiserror::Error, Debug)]
pub enum RectifyError {
    /// Invalid run parameters or calibration, detected before any frame is processed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A source frame is absent or cannot be decoded.
    #[error("Missing frame {0}: {1}")]
    MissingFrame(PathBuf, #[source] IoError),

    /// The rectification geometry is degenerate.
    #[error("Degenerate geometry: {0}")]
    GeometryDegenerate(String),

    /// Error to write the output calibration.
    #[error("Failed to write the output calibration. {0}")]
    CalibrationWrite(#[source] CalibError),

    /// Error to write an output frame.
    #[error(transparent)]
    IoError(#[from] IoError),

    /// Error in an image operation.
    #[error(transparent)]
    ImageError(#[from] rectify_image::ImageError),

    /// Error to create the worker pool.
    #[error("Failed to create the worker pool. {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

impl From<CalibError> for RectifyError {
    fn from(e: CalibError) -> Self {
        match e {
            CalibError::Degenerate(msg) => RectifyError::GeometryDegenerate(msg),
            other => RectifyError::Configuration(other.to_string()),
        }
    }
}
