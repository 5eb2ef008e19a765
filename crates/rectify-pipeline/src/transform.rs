use rectify_calib::{RemapTable, WorkingGeometry};
use rectify_image::{Image, ImageSize};
use rectify_imgproc::{
    interpolation::{remap, InterpolationMode},
    resize::resize_native,
};
use rectify_io::{
    functional::{read_image, write_image},
    Camera,
};

use crate::{
    config::{ColorMode, PipelineConfig},
    error::RectifyError,
};

/// The interpolation used to go from the intermediate to the target size.
///
/// Area averaging when shrinking the height, bicubic otherwise.
pub fn resize_interpolation(intermediate: ImageSize, target: ImageSize) -> InterpolationMode {
    if target.height < intermediate.height {
        InterpolationMode::Area
    } else {
        InterpolationMode::Bicubic
    }
}

/// Rectify one frame and resize it to `target`.
///
/// The frame is sampled bilinearly through `table` into an image of the
/// table size, with zeros outside the source, then resized.
///
/// # Arguments
///
/// * `image` - The raw frame.
/// * `table` - The remap table of the camera that captured `image`.
/// * `target` - The output size.
pub fn transform_frame<const C: usize>(
    image: &Image<u8, C>,
    table: &RemapTable,
    target: ImageSize,
) -> Result<Image<u8, C>, RectifyError> {
    let src = image.convert::<f32>();

    let mut rectified = Image::<f32, C>::from_size_val(table.size(), 0.0)?;
    remap(
        &src,
        &mut rectified,
        &table.map_x,
        &table.map_y,
        InterpolationMode::Bilinear,
    )?;

    let mut resized = Image::<f32, C>::from_size_val(target, 0.0)?;
    resize_native(
        &rectified,
        &mut resized,
        resize_interpolation(table.size(), target),
    )?;

    Ok(resized.convert::<u8>())
}

/// Transforms the frame pairs of a run.
///
/// Holds only shared references, so one transformer serves every worker.
pub struct FrameTransformer<'a> {
    config: &'a PipelineConfig,
    geometry: &'a WorkingGeometry,
}

impl<'a> FrameTransformer<'a> {
    /// Create a transformer for `config` with the planned `geometry`.
    pub fn new(config: &'a PipelineConfig, geometry: &'a WorkingGeometry) -> Self {
        Self { config, geometry }
    }

    /// Rectify and resize both frames of source index `index`.
    ///
    /// # Errors
    ///
    /// [`RectifyError::MissingFrame`] when a source frame cannot be read,
    /// [`RectifyError::IoError`] when an output frame cannot be written.
    pub fn transform_pair(&self, index: usize) -> Result<(), RectifyError> {
        match self.config.color_mode {
            ColorMode::Grayscale => self.transform_pair_with::<1>(index),
            ColorMode::Color => self.transform_pair_with::<3>(index),
        }
    }

    fn transform_pair_with<const C: usize>(&self, index: usize) -> Result<(), RectifyError> {
        let output_index = self.config.output_index(index);

        for camera in Camera::BOTH {
            let table = match camera {
                Camera::Left => &self.geometry.map_left,
                Camera::Right => &self.geometry.map_right,
            };

            let src_path = self.config.input.frame_path(camera, index);
            let image = read_image::<C>(&src_path)
                .map_err(|e| RectifyError::MissingFrame(src_path.clone(), e))?;

            let output = transform_frame(&image, table, self.config.target_size)?;

            let dst_path = self.config.output.frame_path(camera, output_index);
            write_image(&dst_path, &output)?;

            log::debug!(
                "{camera} frame {} -> {}",
                src_path.display(),
                dst_path.display()
            );
        }

        Ok(())
    }
}
