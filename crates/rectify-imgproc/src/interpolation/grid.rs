use rayon::prelude::*;

use rectify_image::{Image, ImageError, ImageSize};

/// Create the x and y coordinate maps of a grid of the given size.
///
/// Every entry of the returned maps holds its own column (x) and row (y) index.
///
/// # Arguments
///
/// * `cols` - The number of columns indicating the width of the grid
/// * `rows` - The number of rows indicating the height of the grid
pub fn meshgrid(cols: usize, rows: usize) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    meshgrid_from_fn(cols, rows, |x, y| Ok((x as f32, y as f32)))
}

/// Create a pair of coordinate maps by evaluating `f` on every grid position.
///
/// Rows are evaluated in parallel. The first error returned by `f` aborts the
/// construction.
///
/// # Arguments
///
/// * `cols` - The width of the grid.
/// * `rows` - The height of the grid.
/// * `f` - Maps a destination pixel `(x, y)` to a source coordinate `(u, v)`.
///
/// # Example
///
/// ```
/// use rectify_imgproc::interpolation::grid::meshgrid_from_fn;
/// use rectify_image::ImageError;
///
/// let (map_x, map_y) =
///     meshgrid_from_fn(3, 2, |x, y| Ok::<_, ImageError>((x as f32 * 2.0, y as f32))).unwrap();
///
/// assert_eq!(map_x.as_slice(), &[0.0, 2.0, 4.0, 0.0, 2.0, 4.0]);
/// assert_eq!(map_y.as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
/// ```
pub fn meshgrid_from_fn<E>(
    cols: usize,
    rows: usize,
    f: impl Fn(usize, usize) -> Result<(f32, f32), E> + Send + Sync,
) -> Result<(Image<f32, 1>, Image<f32, 1>), E>
where
    E: From<ImageError> + Send,
{
    let size = ImageSize::new(cols, rows)?;
    let mut map_x = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut map_y = Image::<f32, 1>::from_size_val(size, 0.0)?;

    map_x
        .as_slice_mut()
        .par_chunks_exact_mut(cols)
        .zip(map_y.as_slice_mut().par_chunks_exact_mut(cols))
        .enumerate()
        .try_for_each(|(y, (row_x, row_y))| {
            for (x, (mx, my)) in row_x.iter_mut().zip(row_y.iter_mut()).enumerate() {
                let (u, v) = f(x, y)?;
                *mx = u;
                *my = v;
            }
            Ok::<(), E>(())
        })?;

    Ok((map_x, map_y))
}
