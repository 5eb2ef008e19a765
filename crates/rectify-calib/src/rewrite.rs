use nalgebra::{Matrix3, Matrix3x4, Vector3};
use rectify_image::ImageSize;

use crate::{distortion::Distortion, error::CalibError, model::CalibrationModel};

/// Derive the calibration of the rectified and resized output.
///
/// The camera matrix is the left 3x3 block of `p2` with its first row scaled
/// by `target.width / intermediate.width` and its second row by
/// `target.height / intermediate.height`. Both cameras share it, have no
/// distortion and no relative rotation; the translation is the baseline
/// along the rectified axis, `-p2[0][3] / p2[0][0]` for side by side rigs.
///
/// # Arguments
///
/// * `p2` - Projection matrix of the rectified right camera.
/// * `intermediate` - The size `p2` is expressed in.
/// * `target` - The size of the output frames.
///
/// # Errors
///
/// [`CalibError::Degenerate`] when `p2` carries no baseline.
pub fn derive_output_calibration(
    p2: &Matrix3x4<f64>,
    intermediate: ImageSize,
    target: ImageSize,
) -> Result<CalibrationModel, CalibError> {
    let xfactor = target.width as f64 / intermediate.width as f64;
    let yfactor = target.height as f64 / intermediate.height as f64;

    let mut camera_matrix: Matrix3<f64> = p2.fixed_view::<3, 3>(0, 0).into_owned();
    camera_matrix.row_mut(0).scale_mut(xfactor);
    camera_matrix.row_mut(1).scale_mut(yfactor);

    let translation = if p2[(0, 3)] != 0.0 {
        Vector3::new(-p2[(0, 3)] / p2[(0, 0)], 0.0, 0.0)
    } else if p2[(1, 3)] != 0.0 {
        Vector3::new(0.0, -p2[(1, 3)] / p2[(1, 1)], 0.0)
    } else {
        return Err(CalibError::Degenerate(
            "rectified projection has zero baseline".to_string(),
        ));
    };

    log::debug!("output camera matrix: {camera_matrix}");
    log::debug!("output translation: {translation}");

    CalibrationModel::new(
        target,
        camera_matrix,
        camera_matrix,
        Distortion::default(),
        Distortion::default(),
        Matrix3::identity(),
        translation,
    )
}
