use nalgebra::{Matrix3, Matrix3x4, Point2, Vector3};
use rectify_image::ImageSize;
use rectify_imgproc::interpolation::grid::meshgrid_from_fn;

use crate::error::CalibError;
use crate::rectify::RemapTable;

/// Number of fixed point iterations used to invert the distortion model.
const UNDISTORT_ITERATIONS: usize = 5;

/// Represents the polynomial (Brown-Conrady) distortion parameters of a camera
///
/// Coefficients are stored in the OpenCV order `(k1, k2, p1, p2, k3)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Distortion {
    /// The first radial distortion coefficient
    pub k1: f64,
    /// The second radial distortion coefficient
    pub k2: f64,
    /// The first tangential distortion coefficient
    pub p1: f64,
    /// The second tangential distortion coefficient
    pub p2: f64,
    /// The third radial distortion coefficient
    pub k3: f64,
}

impl Distortion {
    /// Build the distortion from a coefficient vector of length 4 or 5.
    ///
    /// Longer vectors (rational or thin prism models) keep their first five
    /// coefficients and the rest is ignored with a warning.
    pub fn from_coefficients(coeffs: &[f64]) -> Result<Self, CalibError> {
        if coeffs.len() < 4 {
            return Err(CalibError::InvalidCalibration(format!(
                "expected 4 or 5 distortion coefficients, got {}",
                coeffs.len()
            )));
        }
        if coeffs.len() > 5 {
            log::warn!(
                "ignoring {} distortion coefficients beyond k3",
                coeffs.len() - 5
            );
        }
        if let Some(c) = coeffs.iter().find(|c| !c.is_finite()) {
            return Err(CalibError::InvalidCalibration(format!(
                "non finite distortion coefficient {c}"
            )));
        }

        Ok(Self {
            k1: coeffs[0],
            k2: coeffs[1],
            p1: coeffs[2],
            p2: coeffs[3],
            k3: coeffs.get(4).copied().unwrap_or(0.0),
        })
    }

    /// The five coefficients `(k1, k2, p1, p2, k3)`.
    pub fn coefficients(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Apply the distortion to a point in normalized image coordinates.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let kr = 1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2;
        let xd = x * kr + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * kr + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (xd, yd)
    }

    /// Remove the distortion from a point in normalized image coordinates.
    ///
    /// The model has no closed form inverse; a fixed number of fixed point
    /// iterations is run. If the radial factor turns negative the distorted
    /// point is returned unchanged.
    pub fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let icdist = 1.0 / (1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2);
            if icdist < 0.0 {
                return (xd, yd);
            }
            let delta_x = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let delta_y = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (xd - delta_x) * icdist;
            y = (yd - delta_y) * icdist;
        }
        (x, y)
    }
}

/// Undistort pixel coordinates and map them through a rectification.
///
/// Each point is normalized with `camera_matrix`, undistorted, rotated by
/// `rotation` and projected with the left 3x3 block of `projection`. Without
/// a projection the normalized rotated coordinates are returned.
///
/// # Arguments
///
/// * `points` - Distorted pixel coordinates.
/// * `camera_matrix` - The intrinsic matrix of the camera.
/// * `distortion` - The distortion of the camera.
/// * `rotation` - The rectifying rotation.
/// * `projection` - The optional new projection matrix.
pub fn undistort_points(
    points: &[Point2<f64>],
    camera_matrix: &Matrix3<f64>,
    distortion: &Distortion,
    rotation: &Matrix3<f64>,
    projection: Option<&Matrix3x4<f64>>,
) -> Vec<Point2<f64>> {
    let (fx, fy) = (camera_matrix[(0, 0)], camera_matrix[(1, 1)]);
    let (cx, cy) = (camera_matrix[(0, 2)], camera_matrix[(1, 2)]);

    let rr = match projection {
        Some(p) => p.fixed_view::<3, 3>(0, 0).into_owned() * rotation,
        None => *rotation,
    };

    points
        .iter()
        .map(|p| {
            let (x, y) = distortion.undistort((p.x - cx) / fx, (p.y - cy) / fy);
            let v = rr * Vector3::new(x, y, 1.0);
            Point2::new(v.x / v.z, v.y / v.z)
        })
        .collect()
}

/// Generate the undistort and rectify remap table of one camera.
///
/// For every pixel of the rectified image of size `size`, the table holds
/// the source coordinate in the raw image. The inverse of the new camera
/// matrix times the rectifying rotation brings the pixel back to a
/// normalized ray, which is then distorted and projected with the original
/// intrinsics.
///
/// # Arguments
///
/// * `camera_matrix` - The intrinsic matrix of the raw camera.
/// * `distortion` - The distortion of the raw camera.
/// * `rotation` - The rectifying rotation of the camera.
/// * `projection` - The new projection matrix, in `size` pixel units.
/// * `size` - The size of the rectified image.
///
/// # Errors
///
/// [`CalibError::Degenerate`] when the new camera matrix times the rotation
/// is singular.
pub fn init_undistort_rectify_map(
    camera_matrix: &Matrix3<f64>,
    distortion: &Distortion,
    rotation: &Matrix3<f64>,
    projection: &Matrix3x4<f64>,
    size: ImageSize,
) -> Result<RemapTable, CalibError> {
    let new_camera_matrix: Matrix3<f64> = projection.fixed_view::<3, 3>(0, 0).into_owned();
    let ir = (new_camera_matrix * rotation)
        .try_inverse()
        .filter(|m| m.iter().all(|v| v.is_finite()))
        .ok_or_else(|| {
            CalibError::Degenerate("singular rectified camera matrix".to_string())
        })?;

    let (fx, fy) = (camera_matrix[(0, 0)], camera_matrix[(1, 1)]);
    let (cx, cy) = (camera_matrix[(0, 2)], camera_matrix[(1, 2)]);

    let (map_x, map_y) = meshgrid_from_fn(size.width, size.height, |u, v| {
        let ray = ir * Vector3::new(u as f64, v as f64, 1.0);
        let (x, y) = distortion.distort(ray.x / ray.z, ray.y / ray.z);
        Ok::<_, CalibError>(((fx * x + cx) as f32, (fy * y + cy) as f32))
    })?;

    Ok(RemapTable { map_x, map_y })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> Matrix3<f64> {
        Matrix3::new(
            500.0, 0.0, 320.0, //
            0.0, 510.0, 240.0, //
            0.0, 0.0, 1.0,
        )
    }

    #[test]
    fn from_coefficients() -> Result<(), CalibError> {
        let d4 = Distortion::from_coefficients(&[0.1, 0.01, 0.001, 0.002])?;
        assert_eq!(d4.coefficients(), [0.1, 0.01, 0.001, 0.002, 0.0]);

        let d8 = Distortion::from_coefficients(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])?;
        assert_eq!(d8.coefficients(), [1.0, 2.0, 3.0, 4.0, 5.0]);

        assert!(Distortion::from_coefficients(&[0.1, 0.2]).is_err());
        assert!(Distortion::from_coefficients(&[0.1, f64::NAN, 0.0, 0.0]).is_err());
        Ok(())
    }

    #[test]
    fn undistort_inverts_distort() {
        let distortion = Distortion {
            k1: -0.28,
            k2: 0.07,
            p1: 0.0002,
            p2: -0.0001,
            k3: 0.0,
        };
        let (xd, yd) = distortion.distort(0.21, -0.13);
        let (x, y) = distortion.undistort(xd, yd);
        assert_relative_eq!(x, 0.21, epsilon = 1e-4);
        assert_relative_eq!(y, -0.13, epsilon = 1e-4);
    }

    #[test]
    fn undistort_points_no_distortion() {
        let k = camera();
        let points = [Point2::new(320.0, 240.0), Point2::new(820.0, 750.0)];
        let out = undistort_points(
            &points,
            &k,
            &Distortion::default(),
            &Matrix3::identity(),
            None,
        );
        assert_relative_eq!(out[0].x, 0.0);
        assert_relative_eq!(out[0].y, 0.0);
        assert_relative_eq!(out[1].x, 1.0);
        assert_relative_eq!(out[1].y, 1.0);
    }

    #[test]
    fn identity_map_without_distortion() -> Result<(), CalibError> {
        let k = camera();
        let p = Matrix3x4::new(
            500.0, 0.0, 320.0, 0.0, //
            0.0, 510.0, 240.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        );
        let table = init_undistort_rectify_map(
            &k,
            &Distortion::default(),
            &Matrix3::identity(),
            &p,
            [8, 6].into(),
        )?;

        for v in 0..6 {
            for u in 0..8 {
                assert_relative_eq!(table.map_x.get_pixel(u, v, 0)?, u as f32, epsilon = 1e-4);
                assert_relative_eq!(table.map_y.get_pixel(u, v, 0)?, v as f32, epsilon = 1e-4);
            }
        }
        Ok(())
    }

    #[test]
    fn map_follows_distortion() -> Result<(), CalibError> {
        let k = camera();
        let distortion = Distortion {
            k1: 0.1,
            ..Default::default()
        };
        let p = Matrix3x4::new(
            500.0, 0.0, 320.0, 0.0, //
            0.0, 510.0, 240.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        );
        let table =
            init_undistort_rectify_map(&k, &distortion, &Matrix3::identity(), &p, [640, 480].into())?;

        // the principal point is a fixed point of the radial model
        assert_relative_eq!(table.map_x.get_pixel(320, 240, 0)?, 320.0, epsilon = 1e-3);
        assert_relative_eq!(table.map_y.get_pixel(320, 240, 0)?, 240.0, epsilon = 1e-3);

        // positive k1 pushes the corner outwards
        assert!(table.map_x.get_pixel(0, 0, 0)? < 0.0);
        assert!(table.map_y.get_pixel(0, 0, 0)? < 0.0);
        Ok(())
    }

    #[test]
    fn singular_projection_is_degenerate() {
        let res = init_undistort_rectify_map(
            &camera(),
            &Distortion::default(),
            &Matrix3::identity(),
            &Matrix3x4::zeros(),
            [4, 4].into(),
        );
        assert!(matches!(res, Err(CalibError::Degenerate(_))));
    }
}
