use super::interpolate::fetch;
use rectify_image::{Image, ImageDtype};

/// Kernel for bilinear interpolation
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values. Neighbours outside the image count as zero.
pub(crate) fn bilinear_interpolation<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let u0 = u.floor();
    let v0 = v.floor();

    let frac_u = u - u0;
    let frac_v = v - v0;

    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let (iu, iv) = (u0 as i64, v0 as i64);

    let taps = [
        (iu, iv, frac_uu * frac_vv),
        (iu + 1, iv, frac_u * frac_vv),
        (iu, iv + 1, frac_uu * frac_v),
        (iu + 1, iv + 1, frac_u * frac_v),
    ];

    let mut pixel = [0.0; C];
    for (x, y, w) in taps {
        if w == 0.0 {
            continue;
        }
        if let Some(p) = fetch(image, x, y) {
            for k in 0..C {
                pixel[k] += p[k] * w;
            }
        }
    }

    pixel
}
