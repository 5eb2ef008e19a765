use super::bicubic::bicubic_interpolation;
use super::bilinear::bilinear_interpolation;
use super::nearest::nearest_neighbor_interpolation;
use rectify_image::{Image, ImageDtype};

/// Interpolation mode for the remap and resize operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    Bilinear,
    /// Nearest neighbor interpolation
    Nearest,
    /// Bicubic interpolation
    Bicubic,
    /// Pixel area relation, used to shrink images without moire
    ///
    /// Point sampling through a remap table has no area to average over, so
    /// [`interpolate_pixel`] treats it as bilinear.
    Area,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated pixel values, zero where the kernel falls outside the image.
pub fn interpolate_pixel<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
    interpolation: InterpolationMode,
) -> [f32; C] {
    // the widest kernel reaches two pixels past its anchor
    let (cols, rows) = (image.cols() as f32, image.rows() as f32);
    if !(-2.0..=cols + 2.0).contains(&u) || !(-2.0..=rows + 2.0).contains(&v) {
        return [0.0; C];
    }

    match interpolation {
        InterpolationMode::Bilinear | InterpolationMode::Area => {
            bilinear_interpolation(image, u, v)
        }
        InterpolationMode::Nearest => nearest_neighbor_interpolation(image, u, v),
        InterpolationMode::Bicubic => bicubic_interpolation(image, u, v),
    }
}

/// Fetch a pixel as `f32`, returning `None` when outside the image.
#[inline]
pub(crate) fn fetch<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    x: i64,
    y: i64,
) -> Option<[f32; C]> {
    if x < 0 || y < 0 || x >= image.cols() as i64 || y >= image.rows() as i64 {
        return None;
    }

    let base = (y as usize * image.cols() + x as usize) * C;
    let data = &image.as_slice()[base..base + C];

    let mut pixel = [0.0; C];
    for (p, &d) in pixel.iter_mut().zip(data.iter()) {
        *p = d.into();
    }
    Some(pixel)
}
