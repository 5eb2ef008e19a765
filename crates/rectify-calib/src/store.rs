use std::path::Path;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{distortion::Distortion, error::CalibError, model::CalibrationModel};

/// Serialization format of a calibration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationFormat {
    /// OpenCV `FileStorage` YAML, with `!!opencv-matrix` nodes.
    Yaml,
    /// JSON with the same keys and matrix layout.
    Json,
}

impl CalibrationFormat {
    /// Guess the format from the file extension; anything but `.json` is YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CalibrationFormat::Json,
            _ => CalibrationFormat::Yaml,
        }
    }
}

/// A matrix node as written by OpenCV: shape, element type and row major data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct MatrixNode {
    rows: usize,
    cols: usize,
    dt: String,
    data: Vec<f64>,
}

impl MatrixNode {
    fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        Self {
            rows,
            cols,
            dt: "d".to_string(),
            data,
        }
    }

    fn checked_data(&self, key: &str) -> Result<&[f64], CalibError> {
        if self.data.len() != self.rows * self.cols {
            return Err(CalibError::InvalidMatrix(
                key.to_string(),
                format!(
                    "{} values for a {}x{} matrix",
                    self.data.len(),
                    self.rows,
                    self.cols
                ),
            ));
        }
        Ok(&self.data)
    }

    fn matrix3(&self, key: &str) -> Result<Matrix3<f64>, CalibError> {
        let data = self.checked_data(key)?;
        if self.rows != 3 || self.cols != 3 {
            return Err(CalibError::InvalidMatrix(
                key.to_string(),
                format!("expected 3x3, got {}x{}", self.rows, self.cols),
            ));
        }
        Ok(Matrix3::from_row_slice(data))
    }

    fn vector3(&self, key: &str) -> Result<Vector3<f64>, CalibError> {
        let data = self.checked_data(key)?;
        if data.len() != 3 {
            return Err(CalibError::InvalidMatrix(
                key.to_string(),
                format!("expected 3 values, got {}x{}", self.rows, self.cols),
            ));
        }
        Ok(Vector3::from_column_slice(data))
    }

    fn distortion(&self, key: &str) -> Result<Distortion, CalibError> {
        let data = self.checked_data(key)?;
        if self.rows != 1 && self.cols != 1 {
            return Err(CalibError::InvalidMatrix(
                key.to_string(),
                format!("expected a vector, got {}x{}", self.rows, self.cols),
            ));
        }
        Distortion::from_coefficients(data)
            .map_err(|e| CalibError::InvalidMatrix(key.to_string(), e.to_string()))
    }
}

/// The on-disk schema, keys in the order they are written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct CalibrationRecord {
    image_width: usize,
    image_height: usize,
    camera_matrix_1: MatrixNode,
    distortion_coefficients_1: MatrixNode,
    camera_matrix_2: MatrixNode,
    distortion_coefficients_2: MatrixNode,
    rotation_matrix: MatrixNode,
    translation_coefficients: MatrixNode,
}

impl CalibrationRecord {
    fn into_model(self) -> Result<CalibrationModel, CalibError> {
        CalibrationModel::new(
            [self.image_width, self.image_height].into(),
            self.camera_matrix_1.matrix3("camera_matrix_1")?,
            self.camera_matrix_2.matrix3("camera_matrix_2")?,
            self.distortion_coefficients_1
                .distortion("distortion_coefficients_1")?,
            self.distortion_coefficients_2
                .distortion("distortion_coefficients_2")?,
            self.rotation_matrix.matrix3("rotation_matrix")?,
            self.translation_coefficients
                .vector3("translation_coefficients")?,
        )
    }

    fn from_model(model: &CalibrationModel) -> Self {
        let matrix = |m: &Matrix3<f64>| MatrixNode::new(3, 3, m.transpose().as_slice().to_vec());
        let coeffs = |d: &Distortion| MatrixNode::new(1, 5, d.coefficients().to_vec());

        Self {
            image_width: model.image_size().width,
            image_height: model.image_size().height,
            camera_matrix_1: matrix(model.camera_matrix_left()),
            distortion_coefficients_1: coeffs(model.distortion_left()),
            camera_matrix_2: matrix(model.camera_matrix_right()),
            distortion_coefficients_2: coeffs(model.distortion_right()),
            rotation_matrix: matrix(model.rotation()),
            translation_coefficients: MatrixNode::new(3, 1, model.translation().as_slice().to_vec()),
        }
    }

    fn matrices(&self) -> [(&'static str, &MatrixNode); 6] {
        [
            ("camera_matrix_1", &self.camera_matrix_1),
            ("distortion_coefficients_1", &self.distortion_coefficients_1),
            ("camera_matrix_2", &self.camera_matrix_2),
            ("distortion_coefficients_2", &self.distortion_coefficients_2),
            ("rotation_matrix", &self.rotation_matrix),
            ("translation_coefficients", &self.translation_coefficients),
        ]
    }
}

/// Remove YAML tags, keeping the tagged values.
fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        Value::Mapping(mapping) => {
            Value::Mapping(mapping.into_iter().map(|(k, v)| (k, untag(v))).collect())
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(untag).collect()),
        other => other,
    }
}

/// Parse a calibration from OpenCV `FileStorage` YAML.
///
/// The `%YAML:1.0` directive and the `!!opencv-matrix` tags are accepted.
///
/// # Example
///
/// ```
/// use rectify_calib::store::from_yaml_str;
///
/// let text = r#"%YAML:1.0
/// ---
/// image_width: 640
/// image_height: 480
/// camera_matrix_1: !!opencv-matrix
///    rows: 3
///    cols: 3
///    dt: d
///    data: [ 5.0e+02, 0., 3.2e+02, 0., 5.0e+02, 2.4e+02, 0., 0., 1. ]
/// distortion_coefficients_1: !!opencv-matrix
///    rows: 1
///    cols: 5
///    dt: d
///    data: [ -0.1, 0.01, 0., 0., 0. ]
/// camera_matrix_2: !!opencv-matrix
///    rows: 3
///    cols: 3
///    dt: d
///    data: [ 5.0e+02, 0., 3.2e+02, 0., 5.0e+02, 2.4e+02, 0., 0., 1. ]
/// distortion_coefficients_2: !!opencv-matrix
///    rows: 1
///    cols: 5
///    dt: d
///    data: [ -0.1, 0.01, 0., 0., 0. ]
/// rotation_matrix: !!opencv-matrix
///    rows: 3
///    cols: 3
///    dt: d
///    data: [ 1., 0., 0., 0., 1., 0., 0., 0., 1. ]
/// translation_coefficients: !!opencv-matrix
///    rows: 3
///    cols: 1
///    dt: d
///    data: [ -0.12, 0., 0. ]
/// "#;
///
/// let model = from_yaml_str(text).unwrap();
///
/// assert_eq!(model.image_size().width, 640);
/// assert_eq!(model.camera_matrix_left()[(0, 2)], 320.0);
/// ```
pub fn from_yaml_str(text: &str) -> Result<CalibrationModel, CalibError> {
    // `%YAML:1.0` is not a valid YAML 1.2 directive
    let body = text
        .lines()
        .filter(|line| !line.starts_with('%'))
        .collect::<Vec<_>>()
        .join("\n")
        .replace("!!opencv-matrix", "");

    let parse_error = |e: serde_yaml::Error| CalibError::ParseError("yaml".to_string(), e.to_string());
    let value: Value = serde_yaml::from_str(&body).map_err(parse_error)?;
    let record: CalibrationRecord = serde_yaml::from_value(untag(value)).map_err(parse_error)?;

    record.into_model()
}

/// Parse a calibration from JSON with the same schema as the YAML files.
pub fn from_json_str(text: &str) -> Result<CalibrationModel, CalibError> {
    let record: CalibrationRecord = serde_json::from_str(text)
        .map_err(|e| CalibError::ParseError("json".to_string(), e.to_string()))?;
    record.into_model()
}

/// Serialize a calibration as OpenCV `FileStorage` YAML.
pub fn to_yaml_string(model: &CalibrationModel) -> String {
    let record = CalibrationRecord::from_model(model);

    let mut out = String::from("%YAML:1.0\n---\n");
    out.push_str(&format!("image_width: {}\n", record.image_width));
    out.push_str(&format!("image_height: {}\n", record.image_height));

    for (key, node) in record.matrices() {
        let data = node
            .data
            .iter()
            .map(|v| format!("{v:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "{key}: !!opencv-matrix\n   rows: {}\n   cols: {}\n   dt: {}\n   data: [ {data} ]\n",
            node.rows, node.cols, node.dt
        ));
    }
    out
}

/// Serialize a calibration as pretty printed JSON.
pub fn to_json_string(model: &CalibrationModel) -> Result<String, CalibError> {
    Ok(serde_json::to_string_pretty(&CalibrationRecord::from_model(
        model,
    ))?)
}

/// Read a calibration file, the format chosen by [`CalibrationFormat::from_path`].
///
/// # Errors
///
/// [`CalibError::FileDoesNotExist`] for a missing file, [`CalibError::ParseError`]
/// for a missing or mistyped key, [`CalibError::InvalidMatrix`] or
/// [`CalibError::InvalidCalibration`] for values violating the model.
pub fn read_calibration(file_path: impl AsRef<Path>) -> Result<CalibrationModel, CalibError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(CalibError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let text = std::fs::read_to_string(file_path)?;
    let source = file_path.display().to_string();
    let with_source = |e: CalibError| match e {
        CalibError::ParseError(_, msg) => CalibError::ParseError(source.clone(), msg),
        other => other,
    };

    match CalibrationFormat::from_path(file_path) {
        CalibrationFormat::Yaml => from_yaml_str(&text),
        CalibrationFormat::Json => from_json_str(&text),
    }
    .map_err(with_source)
}

/// Write a calibration file, overwriting it.
pub fn write_calibration(
    file_path: impl AsRef<Path>,
    model: &CalibrationModel,
) -> Result<(), CalibError> {
    let file_path = file_path.as_ref();
    let text = match CalibrationFormat::from_path(file_path) {
        CalibrationFormat::Yaml => to_yaml_string(model),
        CalibrationFormat::Json => to_json_string(model)?,
    };
    std::fs::write(file_path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Result<CalibrationModel, CalibError> {
        CalibrationModel::new(
            [1280, 960].into(),
            Matrix3::new(
                812.5, 0.0, 641.25, //
                0.0, 811.0, 479.5, //
                0.0, 0.0, 1.0,
            ),
            Matrix3::new(
                810.0, 0.0, 636.0, //
                0.0, 809.75, 482.0, //
                0.0, 0.0, 1.0,
            ),
            Distortion {
                k1: -0.3012,
                k2: 0.0987,
                p1: 1e-5,
                p2: -2.5e-4,
                k3: 0.0,
            },
            Distortion {
                k1: -0.2998,
                k2: 0.1011,
                ..Default::default()
            },
            nalgebra::Rotation3::from_euler_angles(0.001, -0.004, 0.002).into_inner(),
            Vector3::new(-0.1203, 0.0004, -0.0011),
        )
    }

    #[test]
    fn yaml_round_trip() -> Result<(), CalibError> {
        let model = model()?;
        let text = to_yaml_string(&model);
        assert!(text.starts_with("%YAML:1.0\n"));
        assert!(text.contains("camera_matrix_1: !!opencv-matrix"));
        assert_eq!(from_yaml_str(&text)?, model);
        Ok(())
    }

    #[test]
    fn json_round_trip() -> Result<(), CalibError> {
        let model = model()?;
        let text = to_json_string(&model)?;
        assert_eq!(from_json_str(&text)?, model);
        Ok(())
    }

    #[test]
    fn missing_key_is_named() -> Result<(), CalibError> {
        let text = to_yaml_string(&model()?);
        let without_rotation = text
            .replace("rotation_matrix", "rotation")
            .replace("image_height", "height");

        match from_yaml_str(&without_rotation) {
            Err(CalibError::ParseError(_, msg)) => {
                assert!(msg.contains("image_height") || msg.contains("rotation_matrix"), "{msg}")
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn wrong_shape_is_named() -> Result<(), CalibError> {
        let text = to_yaml_string(&model()?).replacen("rows: 3", "rows: 2", 1);
        match from_yaml_str(&text) {
            Err(CalibError::InvalidMatrix(key, _)) => assert_eq!(key, "camera_matrix_1"),
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn format_from_path() {
        assert_eq!(CalibrationFormat::from_path("a/b.JSON"), CalibrationFormat::Json);
        assert_eq!(CalibrationFormat::from_path("a/b.yaml"), CalibrationFormat::Yaml);
        assert_eq!(CalibrationFormat::from_path("a/b.yml"), CalibrationFormat::Yaml);
        assert_eq!(CalibrationFormat::from_path("calib"), CalibrationFormat::Yaml);
    }
}
