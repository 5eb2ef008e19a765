use std::path::PathBuf;

/// An error type for the calibration module.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    /// Error when the calibration file does not exist.
    #[error("Calibration file does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error to read or write the calibration file.
    #[error("Failed to manipulate the calibration file. {0}")]
    FileError(#[from] std::io::Error),

    /// Missing or mistyped key in a calibration record.
    #[error("Failed to parse calibration {0}: {1}")]
    ParseError(String, String),

    /// A matrix entry has the wrong shape.
    #[error("Invalid matrix for key {0}: {1}")]
    InvalidMatrix(String, String),

    /// The calibration values violate the model invariants.
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    /// The frames on disk do not have the calibrated size.
    #[error("Calibration is for {0} images but the frames are {1}")]
    SizeMismatch(rectify_image::ImageSize, rectify_image::ImageSize),

    /// The rectification geometry cannot be computed.
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    /// Error to serialize the calibration as JSON.
    #[error("Failed to serialize calibration. {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error while building the remap tables.
    #[error(transparent)]
    ImageError(#[from] rectify_image::ImageError),
}
