use std::path::PathBuf;

use crate::template::FrameTemplate;

/// One of the two cameras of a stereo rig.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Camera {
    /// The left (or top) camera, the reference of the rectified pair.
    Left,
    /// The right (or bottom) camera.
    Right,
}

impl Camera {
    /// Both cameras, left first.
    pub const BOTH: [Camera; 2] = [Camera::Left, Camera::Right];
}

impl std::fmt::Display for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Camera::Left => write!(f, "left"),
            Camera::Right => write!(f, "right"),
        }
    }
}

/// Per camera location of the frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraLayout {
    /// Path fragment appended to the dataset root, e.g. `"raw/left/"`.
    pub path: String,
    /// Mark substituted for `%s` in the file template, e.g. `"r"`.
    pub mark: String,
}

/// Where the frames of a stereo dataset live.
///
/// A frame path is the plain concatenation `root + camera.path + template(mark, index)`,
/// so the fragments carry their own separators and may be empty.
///
/// # Example
///
/// ```
/// use rectify_io::{Camera, CameraLayout, StereoLayout};
///
/// let layout = StereoLayout {
///     root: "/data/".into(),
///     left: CameraLayout { path: "left/".into(), mark: "".into() },
///     right: CameraLayout { path: "right/".into(), mark: "r".into() },
///     template: "%s%05d.pgm".parse().unwrap(),
/// };
///
/// assert_eq!(
///     layout.frame_path(Camera::Right, 2),
///     std::path::PathBuf::from("/data/right/r00002.pgm")
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StereoLayout {
    /// Dataset root prefix.
    pub root: String,
    /// Left camera location.
    pub left: CameraLayout,
    /// Right camera location.
    pub right: CameraLayout,
    /// File-name template shared by both cameras.
    pub template: FrameTemplate,
}

impl StereoLayout {
    /// The layout of one camera.
    pub fn camera(&self, camera: Camera) -> &CameraLayout {
        match camera {
            Camera::Left => &self.left,
            Camera::Right => &self.right,
        }
    }

    /// The directory prefix of one camera, `root + path`.
    pub fn camera_dir(&self, camera: Camera) -> String {
        format!("{}{}", self.root, self.camera(camera).path)
    }

    /// The file path of frame `index` of `camera`.
    pub fn frame_path(&self, camera: Camera, index: usize) -> PathBuf {
        let cam = self.camera(camera);
        let file_name = self.template.render(&cam.mark, index);
        PathBuf::from(format!("{}{}", self.camera_dir(camera), file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IoError;

    fn layout(root: &str) -> Result<StereoLayout, IoError> {
        Ok(StereoLayout {
            root: root.into(),
            left: CameraLayout {
                path: "".into(),
                mark: "".into(),
            },
            right: CameraLayout {
                path: "".into(),
                mark: "r".into(),
            },
            template: "%s%05d.pgm".parse()?,
        })
    }

    #[test]
    fn flat_layout_with_marks() -> Result<(), IoError> {
        let layout = layout("/extra_files/")?;
        assert_eq!(
            layout.frame_path(Camera::Left, 2),
            PathBuf::from("/extra_files/00002.pgm")
        );
        assert_eq!(
            layout.frame_path(Camera::Right, 2),
            PathBuf::from("/extra_files/r00002.pgm")
        );
        Ok(())
    }

    #[test]
    fn root_is_a_prefix() -> Result<(), IoError> {
        let layout = layout("out/seq1_")?;
        assert_eq!(
            layout.frame_path(Camera::Left, 10),
            PathBuf::from("out/seq1_00010.pgm")
        );
        assert_eq!(layout.camera_dir(Camera::Right), "out/seq1_");
        Ok(())
    }
}
