use nalgebra::{Matrix3, Matrix3x4, Matrix4, Point2, Rotation3, Vector2, Vector3};
use rectify_image::{Image, ImageSize};

use crate::distortion::{init_undistort_rectify_map, undistort_points, Distortion};
use crate::error::CalibError;
use crate::model::CalibrationModel;

/// Side of the sampling grid used to find the valid region of a rectified image.
const RECT_GRID: usize = 9;

/// A pair of coordinate maps for [`rectify_imgproc::interpolation::remap`].
#[derive(Clone, Debug, PartialEq)]
pub struct RemapTable {
    /// Source x coordinate of every destination pixel.
    pub map_x: Image<f32, 1>,
    /// Source y coordinate of every destination pixel.
    pub map_y: Image<f32, 1>,
}

impl RemapTable {
    /// The size of the destination image.
    pub fn size(&self) -> ImageSize {
        self.map_x.size()
    }
}

/// Axis along which the rectified cameras are displaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaselineAxis {
    /// Side by side cameras, epipolar lines are image rows.
    Horizontal,
    /// Stacked cameras, epipolar lines are image columns.
    Vertical,
}

impl BaselineAxis {
    fn index(self) -> usize {
        match self {
            BaselineAxis::Horizontal => 0,
            BaselineAxis::Vertical => 1,
        }
    }
}

/// Output of the stereo rectification.
#[derive(Clone, Debug, PartialEq)]
pub struct StereoRectification {
    /// Rectifying rotation of the left camera.
    pub r1: Matrix3<f64>,
    /// Rectifying rotation of the right camera.
    pub r2: Matrix3<f64>,
    /// Projection matrix of the rectified left camera.
    pub p1: Matrix3x4<f64>,
    /// Projection matrix of the rectified right camera, with the baseline in its last column.
    pub p2: Matrix3x4<f64>,
    /// Disparity-to-depth mapping matrix.
    pub q: Matrix4<f64>,
    /// Dominant axis of the baseline.
    pub axis: BaselineAxis,
}

/// Everything the frame transformer needs, computed once per run.
#[derive(Clone, Debug)]
pub struct WorkingGeometry {
    /// Size of the rectified images before the final resize.
    pub intermediate_size: ImageSize,
    /// The rectification the remap tables were built from.
    pub rectification: StereoRectification,
    /// Remap table of the left camera.
    pub map_left: RemapTable,
    /// Remap table of the right camera.
    pub map_right: RemapTable,
}

#[derive(Clone, Copy, Debug)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Compute the working size that has the target aspect ratio.
///
/// Only one dimension of the original size changes: a too wide image keeps
/// its height, a too tall one keeps its width.
///
/// # Example
///
/// ```
/// use rectify_calib::rectify::intermediate_size;
///
/// let size = intermediate_size([1280, 960].into(), 1.0);
///
/// assert_eq!(size.width, 960);
/// assert_eq!(size.height, 960);
/// ```
pub fn intermediate_size(original: ImageSize, target_aspect: f64) -> ImageSize {
    let (mut width, mut height) = (original.width as f64, original.height as f64);

    if original.aspect_ratio() > target_aspect {
        width = height * target_aspect;
    } else {
        height = width / target_aspect;
    }

    // ties go to even, as cvRound does
    ImageSize {
        width: (width.round_ties_even() as usize).max(1),
        height: (height.round_ties_even() as usize).max(1),
    }
}

/// Bouguet stereo rectification.
///
/// The relative rotation is split in two halves so that both cameras turn by
/// the same amount, then a common rotation aligns the baseline with the
/// image x axis (or y for vertical rigs). Principal points are averaged so
/// that points at infinity have zero disparity, and the focal length is
/// scaled so that the rectified images of size `new_size` only show valid
/// pixels.
///
/// # Arguments
///
/// * `model` - The stereo calibration.
/// * `new_size` - The size of the rectified images; projection matrices are
///   expressed in its pixel units.
///
/// # Errors
///
/// [`CalibError::Degenerate`] on a zero baseline or when the projection does
/// not come out finite.
pub fn stereo_rectify(
    model: &CalibrationModel,
    new_size: ImageSize,
) -> Result<StereoRectification, CalibError> {
    let image_size = model.image_size();
    let (nx, ny) = (image_size.width as f64, image_size.height as f64);
    let translation = model.translation();

    if translation.norm() <= f64::EPSILON {
        return Err(CalibError::Degenerate("zero baseline".to_string()));
    }

    // half rotation of each camera
    let om = Rotation3::from_matrix(model.rotation()).scaled_axis();
    let r_r = Rotation3::new(om * -0.5).into_inner();
    let t = r_r * translation;

    let axis = if t.x.abs() > t.y.abs() {
        BaselineAxis::Horizontal
    } else {
        BaselineAxis::Vertical
    };
    let idx = axis.index();

    // rotate the baseline onto the chosen axis
    let c = t[idx];
    let mut uu = Vector3::<f64>::zeros();
    uu[idx] = if c > 0.0 { 1.0 } else { -1.0 };
    let mut ww = t.cross(&uu);
    let nw = ww.norm();
    if nw > 0.0 {
        ww *= (c.abs() / t.norm()).acos() / nw;
    }
    let w_r = Rotation3::new(ww).into_inner();

    let r1 = w_r * r_r.transpose();
    let r2 = w_r * r_r;
    let t_rect = r2 * translation;

    let cameras = [
        (model.camera_matrix_left(), model.distortion_left(), &r1),
        (model.camera_matrix_right(), model.distortion_right(), &r2),
    ];

    // common focal length, shrunk for barrel distortion
    let fc_new = cameras
        .iter()
        .map(|(k, d, _)| {
            let mut fc = k[(idx ^ 1, idx ^ 1)];
            if d.k1 < 0.0 {
                fc *= 1.0 + d.k1 * (nx * nx + ny * ny) / (4.0 * fc * fc);
            }
            fc
        })
        .fold(f64::MAX, f64::min);

    // principal points centring the rectified corners
    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(nx - 1.0, 0.0),
        Point2::new(0.0, ny - 1.0),
        Point2::new(nx - 1.0, ny - 1.0),
    ];
    let centre = Vector2::new((nx - 1.0) / 2.0, (ny - 1.0) / 2.0);
    let cc_sum = cameras
        .iter()
        .map(|(k, d, r)| {
            let normalized = undistort_points(&corners, k, d, &Matrix3::identity(), None);
            let sum = normalized.iter().fold(Vector2::zeros(), |acc, p| {
                let v = *r * Vector3::new(p.x, p.y, 1.0);
                acc + Vector2::new(fc_new * v.x / v.z, fc_new * v.y / v.z)
            });
            centre - sum / corners.len() as f64
        })
        .fold(Vector2::zeros(), |acc, cc| acc + cc);
    // zero disparity: both cameras share the averaged principal point
    let cc_new = cc_sum * 0.5;

    let p1 = projection(fc_new, &cc_new, axis, 0.0);
    let p2 = projection(fc_new, &cc_new, axis, t_rect[idx] * fc_new);

    let inner = [
        inner_rectangle(cameras[0].0, cameras[0].1, &r1, &p1, image_size),
        inner_rectangle(cameras[1].0, cameras[1].1, &r2, &p2, image_size),
    ];

    let (new_w, new_h) = (new_size.width as f64, new_size.height as f64);
    let cc_scaled = Vector2::new(new_w * cc_new.x / nx, new_h * cc_new.y / ny);

    // zoom until the image only covers the inscribed rectangles of both cameras
    let s = inner
        .iter()
        .map(|rect| {
            let (cx, cy) = (cc_scaled.x, cc_scaled.y);
            (cx / (cc_new.x - rect.x))
                .max(cy / (cc_new.y - rect.y))
                .max((new_w - cx) / (rect.x + rect.width - cc_new.x))
                .max((new_h - cy) / (rect.y + rect.height - cc_new.y))
        })
        .fold(f64::MIN, f64::max);

    if !s.is_finite() || s <= 0.0 {
        return Err(CalibError::Degenerate(format!(
            "invalid rectification scale {s}"
        )));
    }

    let fc = fc_new * s;
    let tx = t_rect[idx];

    let p1 = projection(fc, &cc_scaled, axis, 0.0);
    let p2 = projection(fc, &cc_scaled, axis, tx * fc);

    let mut q = Matrix4::zeros();
    q[(0, 0)] = 1.0;
    q[(0, 3)] = -cc_scaled.x;
    q[(1, 1)] = 1.0;
    q[(1, 3)] = -cc_scaled.y;
    q[(2, 3)] = fc;
    q[(3, 2)] = -1.0 / tx;
    // principal points are shared, so the last entry vanishes
    q[(3, 3)] = 0.0;

    let finite = p1.iter().chain(p2.iter()).chain(q.iter()).all(|v| v.is_finite());
    if !finite || fc <= 0.0 {
        return Err(CalibError::Degenerate(
            "non finite projection matrices".to_string(),
        ));
    }

    log::debug!("R1: {r1}");
    log::debug!("R2: {r2}");
    log::debug!("P1: {p1}");
    log::debug!("P2: {p2}");

    Ok(StereoRectification {
        r1,
        r2,
        p1,
        p2,
        q,
        axis,
    })
}

fn projection(fc: f64, cc: &Vector2<f64>, axis: BaselineAxis, shift: f64) -> Matrix3x4<f64> {
    let mut p = Matrix3x4::zeros();
    p[(0, 0)] = fc;
    p[(1, 1)] = fc;
    p[(0, 2)] = cc.x;
    p[(1, 2)] = cc.y;
    p[(2, 2)] = 1.0;
    p[(axis.index(), 3)] = shift;
    p
}

/// Largest axis aligned rectangle inside the rectified image of the raw frame.
///
/// A regular grid over the raw image is undistorted and projected; the
/// rectangle is bounded by the innermost points of the grid border.
fn inner_rectangle(
    camera_matrix: &Matrix3<f64>,
    distortion: &Distortion,
    rotation: &Matrix3<f64>,
    projection: &Matrix3x4<f64>,
    size: ImageSize,
) -> Rect {
    let step_x = size.width as f64 / (RECT_GRID - 1) as f64;
    let step_y = size.height as f64 / (RECT_GRID - 1) as f64;

    let grid = (0..RECT_GRID)
        .flat_map(|y| (0..RECT_GRID).map(move |x| Point2::new(x as f64 * step_x, y as f64 * step_y)))
        .collect::<Vec<_>>();

    let points = undistort_points(
        &grid,
        camera_matrix,
        distortion,
        rotation,
        Some(projection),
    );

    let (mut x0, mut x1) = (f64::MIN, f64::MAX);
    let (mut y0, mut y1) = (f64::MIN, f64::MAX);
    for (i, p) in points.iter().enumerate() {
        let (x, y) = (i % RECT_GRID, i / RECT_GRID);
        if x == 0 {
            x0 = x0.max(p.x);
        }
        if x == RECT_GRID - 1 {
            x1 = x1.min(p.x);
        }
        if y == 0 {
            y0 = y0.max(p.y);
        }
        if y == RECT_GRID - 1 {
            y1 = y1.min(p.y);
        }
    }

    Rect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    }
}

/// Plan the geometry of a run.
///
/// Computes the intermediate size for the target aspect ratio, the stereo
/// rectification expressed at that size and the remap tables of both
/// cameras.
///
/// # Arguments
///
/// * `model` - The stereo calibration.
/// * `original_size` - The size of the raw frames on disk.
/// * `target_size` - The size of the output frames.
///
/// # Errors
///
/// [`CalibError::SizeMismatch`] when the frames do not have the calibrated
/// size, [`CalibError::Degenerate`] when the rectification fails.
pub fn plan_geometry(
    model: &CalibrationModel,
    original_size: ImageSize,
    target_size: ImageSize,
) -> Result<WorkingGeometry, CalibError> {
    if model.image_size() != original_size {
        return Err(CalibError::SizeMismatch(model.image_size(), original_size));
    }

    let intermediate_size = intermediate_size(original_size, target_size.aspect_ratio());
    log::info!(
        "intermediate size {intermediate_size} for {original_size} -> {target_size}"
    );

    let rectification = stereo_rectify(model, intermediate_size)?;
    log::info!("disparity-to-depth matrix Q: {}", rectification.q);

    let map_left = init_undistort_rectify_map(
        model.camera_matrix_left(),
        model.distortion_left(),
        &rectification.r1,
        &rectification.p1,
        intermediate_size,
    )?;
    let map_right = init_undistort_rectify_map(
        model.camera_matrix_right(),
        model.distortion_right(),
        &rectification.r2,
        &rectification.p2,
        intermediate_size,
    )?;

    Ok(WorkingGeometry {
        intermediate_size,
        rectification,
        map_left,
        map_right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera(f: f64, cx: f64, cy: f64) -> Matrix3<f64> {
        Matrix3::new(
            f, 0.0, cx, //
            0.0, f, cy, //
            0.0, 0.0, 1.0,
        )
    }

    fn rig(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<CalibrationModel, CalibError> {
        CalibrationModel::new(
            [640, 480].into(),
            camera(500.0, 320.0, 240.0),
            camera(505.0, 316.0, 244.0),
            Distortion {
                k1: -0.2,
                k2: 0.05,
                ..Default::default()
            },
            Distortion {
                k1: -0.18,
                k2: 0.04,
                ..Default::default()
            },
            rotation,
            translation,
        )
    }

    #[test]
    fn intermediate_size_keeps_one_dimension() {
        let cases = [
            ([1280, 960], 1.0, [960, 960]),
            ([960, 1280], 1.0, [960, 960]),
            ([1280, 960], 16.0 / 9.0, [1280, 720]),
            ([640, 480], 4.0 / 3.0, [640, 480]),
            ([1920, 1080], 4.0 / 3.0, [1440, 1080]),
        ];
        for (original, aspect, expected) in cases {
            let size = intermediate_size(original.into(), aspect);
            assert_eq!(size, ImageSize::from(expected));
            assert!(size.width == original[0] || size.height == original[1]);
            assert!((size.height as f64 * aspect - size.width as f64).abs() <= 1.0);
        }
    }

    #[test]
    fn intermediate_size_ties_to_even() {
        assert_eq!(intermediate_size([10, 1].into(), 2.5), ImageSize::from([2, 1]));
        assert_eq!(intermediate_size([20, 1].into(), 3.5), ImageSize::from([4, 1]));
        assert_eq!(intermediate_size([5, 100].into(), 2.0), ImageSize::from([5, 2]));
        assert_eq!(intermediate_size([7, 100].into(), 2.0), ImageSize::from([7, 4]));
    }

    #[test]
    fn ideal_rig_is_unchanged() -> Result<(), CalibError> {
        let k = camera(500.0, 320.0, 240.0);
        let model = CalibrationModel::new(
            [640, 480].into(),
            k,
            k,
            Distortion::default(),
            Distortion::default(),
            Matrix3::identity(),
            Vector3::new(-0.1, 0.0, 0.0),
        )?;

        let rect = stereo_rectify(&model, [640, 480].into())?;
        assert_eq!(rect.axis, BaselineAxis::Horizontal);
        assert_relative_eq!(rect.r1, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(rect.r2, Matrix3::identity(), epsilon = 1e-12);

        let expected_p1 = Matrix3x4::new(
            500.0, 0.0, 320.0, 0.0, //
            0.0, 500.0, 240.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        );
        assert_relative_eq!(rect.p1, expected_p1, epsilon = 1e-6);
        assert_relative_eq!(rect.p2[(0, 3)], -50.0, epsilon = 1e-6);
        assert_relative_eq!(rect.q[(3, 2)], 10.0, epsilon = 1e-9);
        assert_relative_eq!(rect.q[(2, 3)], 500.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn rectified_rows_align() -> Result<(), CalibError> {
        let rotation = Rotation3::from_euler_angles(0.01, 0.02, -0.015).into_inner();
        let translation = Vector3::new(-0.12, 0.004, 0.002);
        let model = rig(rotation, translation)?;

        let rect = stereo_rectify(&model, [480, 480].into())?;
        assert_eq!(rect.axis, BaselineAxis::Horizontal);

        // the baseline lies on the x axis after rectification
        let t_rect = rect.r2 * translation;
        assert_relative_eq!(t_rect.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(t_rect.z, 0.0, epsilon = 1e-12);

        let k1 = rect.p1.fixed_view::<3, 3>(0, 0).into_owned();
        let k2 = rect.p2.fixed_view::<3, 3>(0, 0).into_owned();
        for point in [
            Vector3::new(0.3, -0.2, 2.0),
            Vector3::new(-1.0, 0.5, 5.0),
            Vector3::new(0.0, 0.0, 1.0),
        ] {
            let left = k1 * rect.r1 * point;
            let right = k2 * rect.r2 * (rotation * point + translation);
            assert_relative_eq!(left.y / left.z, right.y / right.z, epsilon = 1e-9);
            // positive disparity for points in front of the rig
            assert!(left.x / left.z > right.x / right.z);
        }

        // principal point scaled to the new width
        assert!(rect.p1[(0, 2)] > 0.0 && rect.p1[(0, 2)] < 480.0);
        assert_eq!(rect.p1[(0, 2)], rect.p2[(0, 2)]);
        Ok(())
    }

    #[test]
    fn valid_region_fills_the_image() -> Result<(), CalibError> {
        let model = rig(
            Rotation3::from_euler_angles(0.0, 0.01, 0.0).into_inner(),
            Vector3::new(-0.1, 0.0, 0.0),
        )?;
        let geometry = plan_geometry(&model, [640, 480].into(), [512, 512].into())?;
        assert_eq!(geometry.intermediate_size, ImageSize::from([480, 480]));
        assert_eq!(geometry.map_left.size(), geometry.intermediate_size);
        assert_eq!(geometry.map_right.size(), geometry.intermediate_size);

        // the corners of the rectified images sample inside the raw frames
        for table in [&geometry.map_left, &geometry.map_right] {
            for (u, v) in [(0, 0), (479, 0), (0, 479), (479, 479), (240, 240)] {
                let x = table.map_x.get_pixel(u, v, 0)?;
                let y = table.map_y.get_pixel(u, v, 0)?;
                assert!((-2.0..=642.0).contains(&x), "x = {x} at ({u}, {v})");
                assert!((-2.0..=482.0).contains(&y), "y = {y} at ({u}, {v})");
            }
        }
        Ok(())
    }

    #[test]
    fn vertical_rig() -> Result<(), CalibError> {
        let model = rig(Matrix3::identity(), Vector3::new(0.002, -0.15, 0.0))?;
        let rect = stereo_rectify(&model, [640, 480].into())?;

        assert_eq!(rect.axis, BaselineAxis::Vertical);
        assert_eq!(rect.p2[(0, 3)], 0.0);
        assert!(rect.p2[(1, 3)] != 0.0);

        let point = Vector3::new(0.2, 0.1, 3.0);
        let left = rect.p1.fixed_view::<3, 3>(0, 0) * rect.r1 * point;
        let right = rect.p2.fixed_view::<3, 3>(0, 0) * rect.r2 * (point + model.translation());
        assert_relative_eq!(left.x / left.z, right.x / right.z, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn zero_baseline_is_degenerate() -> Result<(), CalibError> {
        let model = rig(Matrix3::identity(), Vector3::zeros())?;
        let res = stereo_rectify(&model, [640, 480].into());
        assert!(matches!(res, Err(CalibError::Degenerate(_))));
        Ok(())
    }

    #[test]
    fn size_mismatch() -> Result<(), CalibError> {
        let model = rig(Matrix3::identity(), Vector3::new(-0.1, 0.0, 0.0))?;
        let res = plan_geometry(&model, [1280, 960].into(), [512, 512].into());
        assert!(matches!(res, Err(CalibError::SizeMismatch(..))));
        Ok(())
    }
}
