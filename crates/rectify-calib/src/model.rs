use nalgebra::{Matrix3, Vector3};
use rectify_image::ImageSize;

use crate::{distortion::Distortion, error::CalibError};

/// Tolerance on the orthonormality of the stereo rotation.
const ROTATION_TOLERANCE: f64 = 1e-3;

/// Intrinsic and extrinsic calibration of a stereo rig.
///
/// The rotation and translation map points from the left camera frame to
/// the right camera frame. Values are validated on construction and the
/// model is immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationModel {
    image_size: ImageSize,
    camera_matrix_left: Matrix3<f64>,
    camera_matrix_right: Matrix3<f64>,
    distortion_left: Distortion,
    distortion_right: Distortion,
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl CalibrationModel {
    /// Create a new calibration model.
    ///
    /// # Errors
    ///
    /// [`CalibError::InvalidCalibration`] when a camera matrix is not upper
    /// triangular with positive focal lengths, the rotation is not a proper
    /// rotation, the image size is empty or a value is not finite.
    pub fn new(
        image_size: ImageSize,
        camera_matrix_left: Matrix3<f64>,
        camera_matrix_right: Matrix3<f64>,
        distortion_left: Distortion,
        distortion_right: Distortion,
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
    ) -> Result<Self, CalibError> {
        if image_size.width == 0 || image_size.height == 0 {
            return Err(CalibError::InvalidCalibration(format!(
                "empty image size {image_size}"
            )));
        }

        check_camera_matrix("left", &camera_matrix_left)?;
        check_camera_matrix("right", &camera_matrix_right)?;
        check_rotation(&rotation)?;

        if translation.iter().any(|v| !v.is_finite()) {
            return Err(CalibError::InvalidCalibration(
                "non finite translation".to_string(),
            ));
        }

        Ok(Self {
            image_size,
            camera_matrix_left,
            camera_matrix_right,
            distortion_left,
            distortion_right,
            rotation,
            translation,
        })
    }

    /// The image size the calibration was estimated for.
    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    /// The intrinsic matrix of the left camera.
    pub fn camera_matrix_left(&self) -> &Matrix3<f64> {
        &self.camera_matrix_left
    }

    /// The intrinsic matrix of the right camera.
    pub fn camera_matrix_right(&self) -> &Matrix3<f64> {
        &self.camera_matrix_right
    }

    /// The distortion of the left camera.
    pub fn distortion_left(&self) -> &Distortion {
        &self.distortion_left
    }

    /// The distortion of the right camera.
    pub fn distortion_right(&self) -> &Distortion {
        &self.distortion_right
    }

    /// Rotation from the left to the right camera frame.
    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// Translation from the left to the right camera frame.
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }
}

fn check_camera_matrix(name: &str, k: &Matrix3<f64>) -> Result<(), CalibError> {
    if k.iter().any(|v| !v.is_finite()) {
        return Err(CalibError::InvalidCalibration(format!(
            "{name} camera matrix has non finite entries"
        )));
    }
    if k[(1, 0)] != 0.0 || k[(2, 0)] != 0.0 || k[(2, 1)] != 0.0 {
        return Err(CalibError::InvalidCalibration(format!(
            "{name} camera matrix is not upper triangular"
        )));
    }
    if k[(0, 0)] <= 0.0 || k[(1, 1)] <= 0.0 {
        return Err(CalibError::InvalidCalibration(format!(
            "{name} camera matrix has non positive focal lengths ({}, {})",
            k[(0, 0)],
            k[(1, 1)]
        )));
    }
    Ok(())
}

fn check_rotation(r: &Matrix3<f64>) -> Result<(), CalibError> {
    if r.iter().any(|v| !v.is_finite()) {
        return Err(CalibError::InvalidCalibration(
            "rotation has non finite entries".to_string(),
        ));
    }

    let orthogonality = (r * r.transpose() - Matrix3::identity()).amax();
    let det = r.determinant();
    if orthogonality > ROTATION_TOLERANCE || (det - 1.0).abs() > ROTATION_TOLERANCE {
        return Err(CalibError::InvalidCalibration(format!(
            "rotation is not orthonormal (det = {det})"
        )));
    }
    Ok(())
}
