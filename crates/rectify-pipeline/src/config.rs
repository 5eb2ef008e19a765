use std::path::PathBuf;

use rectify_image::ImageSize;
use rectify_io::StereoLayout;

use crate::{error::RectifyError, scheduler::FrameRange};

/// How frames are decoded and written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// Single channel 8 bit frames.
    Grayscale,
    /// Three channel 8 bit frames.
    Color,
}

impl ColorMode {
    /// Grayscale when `grayscale` is set, color otherwise.
    pub fn from_flag(grayscale: bool) -> Self {
        if grayscale {
            ColorMode::Grayscale
        } else {
            ColorMode::Color
        }
    }
}

/// The parameters of one run.
///
/// Built once from the command line and shared by reference afterwards.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Size of the output frames.
    pub target_size: ImageSize,
    /// Source frame indices.
    pub input_range: FrameRange,
    /// Output index of the first source frame.
    pub output_start: usize,
    /// Decode and encode mode of the frames.
    pub color_mode: ColorMode,
    /// Where source frames are read from.
    pub input: StereoLayout,
    /// Where output frames are written to.
    pub output: StereoLayout,
    /// The calibration of the source rig.
    pub calibration_input: PathBuf,
    /// The calibration written for the output frames.
    pub calibration_output: PathBuf,
    /// Worker count override, `None` picks from the hardware.
    pub workers: Option<usize>,
}

impl PipelineConfig {
    /// Check the run parameters.
    ///
    /// Frame templates are validated when parsed into a [`StereoLayout`].
    pub fn validate(&self) -> Result<(), RectifyError> {
        if self.target_size.width == 0 || self.target_size.height == 0 {
            return Err(RectifyError::Configuration(format!(
                "target size {} must be positive",
                self.target_size
            )));
        }
        if self.input_range.start > self.input_range.end {
            return Err(RectifyError::Configuration(format!(
                "input range start {} is after its end {}",
                self.input_range.start, self.input_range.end
            )));
        }
        if self.workers == Some(0) {
            return Err(RectifyError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The output index of source frame `index`.
    pub fn output_index(&self, index: usize) -> usize {
        index - self.input_range.start + self.output_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectify_io::CameraLayout;

    fn config() -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let layout = |root: &str| -> Result<StereoLayout, Box<dyn std::error::Error>> {
            Ok(StereoLayout {
                root: root.into(),
                left: CameraLayout {
                    path: "left/".into(),
                    mark: "l".into(),
                },
                right: CameraLayout {
                    path: "right/".into(),
                    mark: "r".into(),
                },
                template: "%s%05d.pgm".parse()?,
            })
        };
        Ok(PipelineConfig {
            target_size: [512, 512].into(),
            input_range: FrameRange { start: 100, end: 200 },
            output_start: 0,
            color_mode: ColorMode::Grayscale,
            input: layout("/data/")?,
            output: layout("/out/")?,
            calibration_input: "/data/calib.yaml".into(),
            calibration_output: "/out/calib_rectified.yaml".into(),
            workers: None,
        })
    }

    #[test]
    fn valid_config() -> Result<(), Box<dyn std::error::Error>> {
        let config = config()?;
        config.validate()?;
        assert_eq!(config.output_index(100), 0);
        assert_eq!(config.output_index(150), 50);
        assert_eq!(ColorMode::from_flag(false), ColorMode::Color);
        Ok(())
    }

    #[test]
    fn invalid_config() -> Result<(), Box<dyn std::error::Error>> {
        let mut empty = config()?;
        empty.target_size = ImageSize { width: 0, height: 512 };
        assert!(matches!(empty.validate(), Err(RectifyError::Configuration(_))));

        let mut reversed = config()?;
        reversed.input_range = FrameRange { start: 10, end: 9 };
        assert!(reversed.validate().is_err());

        let mut no_workers = config()?;
        no_workers.workers = Some(0);
        assert!(no_workers.validate().is_err());
        Ok(())
    }
}
