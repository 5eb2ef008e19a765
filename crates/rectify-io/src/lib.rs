#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`] variants for file access, decoding and template failures.
pub mod error;

/// High-level frame reading and writing functions.
///
/// Frames are decoded and encoded through the `image` crate; the channel
/// count of the requested [`rectify_image::Image`] selects grayscale or color.
pub mod functional;

/// Directory layout of a stereo dataset.
pub mod layout;

/// Ground-truth pose records recorded alongside the frames.
pub mod poses;

/// printf-like frame file-name templates.
pub mod template;

pub use crate::error::IoError;
pub use crate::layout::{Camera, CameraLayout, StereoLayout};
pub use crate::template::FrameTemplate;
