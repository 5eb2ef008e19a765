use std::path::PathBuf;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error to open or write the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] rectify_image::ImageError),

    /// Error to decode the image.
    #[error("Failed to decode the image {0}. {1}")]
    ImageDecodeError(PathBuf, #[source] image::ImageError),

    /// Error to encode the image.
    #[error("Failed to encode the image {0}. {1}")]
    ImageEncodeError(PathBuf, #[source] image::ImageError),

    /// Only mono8 and rgb8 frames are supported.
    #[error("Unsupported number of channels: {0}")]
    UnsupportedChannels(usize),

    /// The file-name template could not be parsed.
    #[error("Invalid file template {0:?}: {1}")]
    InvalidTemplate(String, String),

    /// A line of a pose metadata file could not be parsed.
    #[error("Invalid pose data in {0}, line {1}: {2}")]
    InvalidPoseData(PathBuf, usize, String),

    /// The requested pose fields or reference pose do not exist.
    #[error("Invalid pose selection: {0}")]
    InvalidPoseSelection(String),
}
