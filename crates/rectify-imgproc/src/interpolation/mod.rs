//! Pixel interpolation methods for image transformations.
//!
//! This module provides the sampling kernels used when resampling images
//! through a remap table, and the coordinate grids those tables are built on.
//!
//! # Interpolation Modes
//!
//! - **Nearest**: Fastest, uses nearest pixel value (no interpolation)
//! - **Bilinear**: Smooth linear interpolation between adjacent pixels
//! - **Bicubic**: Cubic convolution over a 4x4 neighbourhood
//! - **Area**: Pixel area averaging, only meaningful for `crate::resize`
//!
//! Sampling through [`remap`] uses a constant zero border: samples falling
//! outside the source image contribute zero instead of failing.

pub(crate) mod bicubic;
mod bilinear;

/// Grid generation and coordinate mapping utilities.
///
/// Functions for generating the coordinate maps consumed by [`remap`].
pub mod grid;

pub(crate) mod interpolate;
mod nearest;
mod remap;

pub use interpolate::{interpolate_pixel, InterpolationMode};
pub use remap::remap;
