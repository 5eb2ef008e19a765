use crate::interpolation::{bicubic::cubic_weights, InterpolationMode};
use crate::parallel;
use rectify_image::{Image, ImageDtype, ImageError, ImageSize};

/// Source samples contributing to one destination index, with their weights.
type Taps = Vec<(usize, f32)>;

/// Resize an image to a new size.
///
/// The resampling is separable: rows are filtered first, then columns, each
/// axis with its own table of source taps. Pixel centres are aligned, i.e.
/// destination index `d` maps to source coordinate `(d + 0.5) * scale - 0.5`.
/// Kernels reaching past the border replicate the edge pixels.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container, already allocated at the new size.
/// * `interpolation` - The interpolation mode to use.
///
/// # Example
///
/// ```
/// use rectify_image::{Image, ImageSize};
/// use rectify_imgproc::interpolation::InterpolationMode;
/// use rectify_imgproc::resize::resize_native;
///
/// let image = Image::<_, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let new_size = ImageSize {
///     width: 2,
///     height: 3,
/// };
///
/// let mut image_resized = Image::<_, 3>::from_size_val(new_size, 0.0).unwrap();
///
/// resize_native(&image, &mut image_resized, InterpolationMode::Area).unwrap();
///
/// assert_eq!(image_resized.num_channels(), 3);
/// assert_eq!(image_resized.size().width, 2);
/// assert_eq!(image_resized.size().height, 3);
/// ```
pub fn resize_native<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    let x_taps = axis_taps(src.width(), dst.width(), interpolation);
    let y_taps = axis_taps(src.height(), dst.height(), interpolation);

    // horizontal pass: (src.rows, dst.cols)
    let src_stride = src.cols() * C;
    let tmp_stride = dst.cols() * C;
    let src_data = src.as_slice();
    let mut tmp = vec![0f32; src.rows() * tmp_stride];

    parallel::par_iter_rows_indexed(&mut tmp, tmp_stride, |row, out| {
        let src_row = &src_data[row * src_stride..(row + 1) * src_stride];
        for (px, taps) in out.chunks_exact_mut(C).zip(x_taps.iter()) {
            for &(sx, w) in taps {
                for (k, p) in px.iter_mut().enumerate() {
                    let v: f32 = src_row[sx * C + k].into();
                    *p += v * w;
                }
            }
        }
    });

    // vertical pass: (dst.rows, dst.cols)
    parallel::par_iter_rows_indexed(dst.as_slice_mut(), tmp_stride, |row, out| {
        let mut acc = vec![0f32; tmp_stride];
        for &(sy, w) in &y_taps[row] {
            let tmp_row = &tmp[sy * tmp_stride..(sy + 1) * tmp_stride];
            for (a, v) in acc.iter_mut().zip(tmp_row.iter()) {
                *a += v * w;
            }
        }
        for (o, a) in out.iter_mut().zip(acc) {
            *o = T::from_f32(a);
        }
    });

    Ok(())
}

/// Resize an image, allocating the output.
///
/// # Errors
///
/// Fails when `new_size` has a zero dimension.
pub fn resize<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    new_size: ImageSize,
    interpolation: InterpolationMode,
) -> Result<Image<T, C>, ImageError> {
    let mut dst = Image::from_size_val(new_size, T::default())?;
    resize_native(src, &mut dst, interpolation)?;
    Ok(dst)
}

/// Build the per destination index taps for one axis.
fn axis_taps(src_len: usize, dst_len: usize, interpolation: InterpolationMode) -> Vec<Taps> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len - 1;

    (0..dst_len)
        .map(|d| match interpolation {
            InterpolationMode::Nearest => {
                let sx = ((d as f64 * scale).floor() as usize).min(last);
                vec![(sx, 1.0)]
            }
            InterpolationMode::Bilinear => linear_taps(d, scale, last),
            InterpolationMode::Bicubic => {
                let fx = (d as f64 + 0.5) * scale - 0.5;
                let sx = fx.floor();
                let w = cubic_weights((fx - sx) as f32);
                let sx = sx as i64;
                (0..4)
                    .map(|i| ((sx - 1 + i as i64).clamp(0, last as i64) as usize, w[i]))
                    .collect()
            }
            InterpolationMode::Area if scale > 1.0 => box_taps(d, scale, src_len),
            InterpolationMode::Area => {
                // enlarging with the area filter degenerates to a sharpened linear ramp
                let sx = (d as f64 * scale).floor();
                let mut f = (d as f64 + 1.0) - (sx + 1.0) / scale;
                f = if f <= 0.0 { 0.0 } else { f - f.floor() };
                let sx = (sx as usize).min(last);
                vec![(sx, (1.0 - f) as f32), ((sx + 1).min(last), f as f32)]
            }
        })
        .collect()
}

fn linear_taps(d: usize, scale: f64, last: usize) -> Taps {
    let fx = (d as f64 + 0.5) * scale - 0.5;
    let mut sx = fx.floor();
    let mut f = fx - sx;
    if sx < 0.0 {
        sx = 0.0;
        f = 0.0;
    }
    let mut sx = sx as usize;
    if sx >= last {
        sx = last;
        f = 0.0;
    }
    vec![(sx, (1.0 - f) as f32), ((sx + 1).min(last), f as f32)]
}

/// Area coverage of the destination cell `[d * scale, (d + 1) * scale)`.
fn box_taps(d: usize, scale: f64, src_len: usize) -> Taps {
    let start = d as f64 * scale;
    let end = (start + scale).min(src_len as f64);

    let first = start.floor() as usize;
    let past = (end.ceil() as usize).min(src_len);

    let mut taps: Taps = (first..past)
        .filter_map(|i| {
            let overlap = end.min(i as f64 + 1.0) - start.max(i as f64);
            (overlap > 1e-9).then_some((i, overlap))
        })
        .map(|(i, overlap)| (i, overlap as f32))
        .collect();

    let total: f32 = taps.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        taps.iter_mut().for_each(|(_, w)| *w /= total);
    }
    taps
}
