use rayon::prelude::*;

use rectify_image::Image;

/// Apply a function to each pixel for grid sampling in parallel.
///
/// The destination is walked row by row together with the matching rows of
/// the coordinate maps; `f` receives the source coordinate and the
/// destination pixel.
pub fn par_iter_rows_resample<T, const C: usize>(
    dst: &mut Image<T, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    f: impl Fn(&f32, &f32, &mut [T]) + Send + Sync,
) where
    T: Send + Sync,
{
    let cols = dst.cols();
    let map_x_slice = map_x.as_slice();
    let map_y_slice = map_y.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .zip(map_x_slice.par_chunks_exact(cols))
        .zip(map_y_slice.par_chunks_exact(cols))
        .for_each(|((dst_chunk, map_x_chunk), map_y_chunk)| {
            dst_chunk
                .chunks_exact_mut(C)
                .zip(map_x_chunk.iter().zip(map_y_chunk.iter()))
                .for_each(|(dst_pixel, (x, y))| {
                    f(x, y, dst_pixel);
                });
        });
}

/// Fill every row of a row-major buffer in parallel.
///
/// `f` receives the row index and the mutable row slice of length `stride`.
pub fn par_iter_rows_indexed<T>(dst: &mut [T], stride: usize, f: impl Fn(usize, &mut [T]) + Send + Sync)
where
    T: Send,
{
    if stride == 0 {
        return;
    }

    dst.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(row, chunk)| f(row, chunk));
}
