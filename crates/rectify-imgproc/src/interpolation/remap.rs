use crate::parallel;

use super::interpolate::interpolate_pixel;
use super::InterpolationMode;
use rectify_image::{Image, ImageDtype, ImageError};

/// Apply generic geometric transformation to an image.
///
/// Each destination pixel `(x, y)` is sampled from the source at
/// `(map_x[y, x], map_y[y, x])`. Coordinates outside the source produce zero.
///
/// # Arguments
///
/// * `src` - The input image container with shape (height, width, C).
/// * `dst` - The output image container with shape (height, width, C).
/// * `map_x` - The x coordinates of the pixels to interpolate.
/// * `map_y` - The y coordinates of the pixels to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Errors
///
/// * The map_x and map_y must have the same size.
/// * The output image must have the same size as the map_x and map_y.
pub fn remap<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if map_x.size() != map_y.size() {
        return Err(ImageError::InvalidImageSize(
            map_y.width(),
            map_y.height(),
            map_x.width(),
            map_x.height(),
        ));
    }

    if dst.size() != map_x.size() {
        return Err(ImageError::InvalidImageSize(
            dst.width(),
            dst.height(),
            map_x.width(),
            map_x.height(),
        ));
    }

    // parallelize the remap operation by rows
    parallel::par_iter_rows_resample(dst, map_x, map_y, |&x, &y, dst_pixel| {
        let pixel = interpolate_pixel(src, x, y, interpolation);
        for (d, p) in dst_pixel.iter_mut().zip(pixel.iter()) {
            *d = T::from_f32(*p);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use rectify_image::{Image, ImageError, ImageSize};

    #[test]
    fn remap_smoke() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new(
            ImageSize {
                width: 3,
                height: 3,
            },
            vec![0f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )?;

        let new_size = [2, 2].into();

        let map_x = Image::<f32, 1>::new(new_size, vec![0.0, 2.0, 0.0, 2.0])?;
        let map_y = Image::<f32, 1>::new(new_size, vec![0.0, 0.0, 2.0, 2.0])?;

        let expected = [0.0, 2.0, 6.0, 8.0];

        let mut image_transformed = Image::<_, 1>::from_size_val(new_size, 0.0)?;

        super::remap(
            &image,
            &mut image_transformed,
            &map_x,
            &map_y,
            super::InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_transformed.num_channels(), 1);
        assert_eq!(image_transformed.size().width, 2);
        assert_eq!(image_transformed.size().height, 2);

        for (a, b) in image_transformed.as_slice().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }

        Ok(())
    }

    #[test]
    fn remap_out_of_bounds_is_zero() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::from_size_val([4, 4].into(), 200)?;

        let size = [2, 1].into();
        let map_x = Image::<f32, 1>::new(size, vec![1.0, -50.0])?;
        let map_y = Image::<f32, 1>::new(size, vec![1.0, 900.0])?;

        let mut dst = Image::<u8, 3>::from_size_val(size, 7)?;
        super::remap(
            &image,
            &mut dst,
            &map_x,
            &map_y,
            super::InterpolationMode::Bilinear,
        )?;

        assert_eq!(dst.as_slice(), &[200, 200, 200, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn remap_size_mismatch() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::from_size_val([4, 4].into(), 0.0)?;
        let map_x = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let map_y = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([3, 2].into(), 0.0)?;

        let res = super::remap(
            &image,
            &mut dst,
            &map_x,
            &map_y,
            super::InterpolationMode::Nearest,
        );
        assert_eq!(res, Err(ImageError::InvalidImageSize(3, 2, 2, 2)));
        Ok(())
    }
}
