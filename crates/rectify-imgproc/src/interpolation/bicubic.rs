use super::interpolate::fetch;
use rectify_image::{Image, ImageDtype};

/// Free parameter of the cubic convolution kernel.
pub(crate) const CUBIC_A: f32 = -0.75;

/// Weights of the four cubic taps at offsets -1, 0, 1, 2 for a fractional position `x`.
#[inline]
pub(crate) fn cubic_weights(x: f32) -> [f32; 4] {
    let a = CUBIC_A;
    let w0 = ((a * (x + 1.0) - 5.0 * a) * (x + 1.0) + 8.0 * a) * (x + 1.0) - 4.0 * a;
    let w1 = ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0;
    let w2 = ((a + 2.0) * (1.0 - x) - (a + 3.0)) * (1.0 - x) * (1.0 - x) + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

pub(crate) fn bicubic_interpolation<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let u0 = u.floor();
    let v0 = v.floor();

    let wx = cubic_weights(u - u0);
    let wy = cubic_weights(v - v0);

    let (iu, iv) = (u0 as i64, v0 as i64);

    let mut pixel = [0.0; C];
    for (j, wyj) in wy.iter().enumerate() {
        for (i, wxi) in wx.iter().enumerate() {
            let w = wxi * wyj;
            if let Some(p) = fetch(image, iu - 1 + i as i64, iv - 1 + j as i64) {
                for k in 0..C {
                    pixel[k] += p[k] * w;
                }
            }
        }
    }

    pixel
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectify_image::ImageError;

    #[test]
    fn cubic_weights_partition_of_unity() {
        for x in [0.0, 0.25, 0.5, 0.9] {
            let w = cubic_weights(x);
            assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        }
        assert_eq!(cubic_weights(0.0), [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn bicubic_on_grid_is_exact() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new(
            [4, 4].into(),
            (0..16).map(|v| v as u8 * 10).collect(),
        )?;
        assert_eq!(bicubic_interpolation(&image, 1.0, 2.0), [90.0]);
        Ok(())
    }
}
