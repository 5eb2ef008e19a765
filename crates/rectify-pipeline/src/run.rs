use std::{path::Path, time::Duration};

use rectify_calib::{
    rectify::plan_geometry,
    rewrite::derive_output_calibration,
    store::{read_calibration, write_calibration},
};
use rectify_image::ImageSize;
use rectify_io::{functional::probe_image_size, Camera};

use crate::{
    config::PipelineConfig,
    error::RectifyError,
    scheduler::{default_worker_count, effective_worker_count, partition, run_batch},
    transform::FrameTransformer,
};

/// What a completed run did.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// The number of frame pairs written.
    pub frames: usize,
    /// The number of workers used.
    pub workers: usize,
    /// The intermediate working size.
    pub intermediate_size: ImageSize,
    /// Wall-clock time of the batch.
    pub elapsed: Duration,
}

/// Rectify and resize the stereo sequence described by `config`.
///
/// The calibration is loaded, the first frame of each camera is probed and
/// the geometry is planned before anything is written. The output
/// calibration is then written once, followed by every frame pair.
///
/// # Errors
///
/// * [`RectifyError::Configuration`] for invalid parameters, an unreadable
///   calibration or frames that do not have the calibrated size. No output
///   is written in that case.
/// * [`RectifyError::MissingFrame`] when a source frame cannot be read.
/// * [`RectifyError::GeometryDegenerate`] when the rig cannot be rectified.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, RectifyError> {
    config.validate()?;

    let model = read_calibration(&config.calibration_input)?;
    log::info!(
        "loaded calibration {} for {} images",
        config.calibration_input.display(),
        model.image_size()
    );

    let original_size = probe_original_size(config)?;
    let geometry = plan_geometry(&model, original_size, config.target_size)?;

    let output_model = derive_output_calibration(
        &geometry.rectification.p2,
        geometry.intermediate_size,
        config.target_size,
    )?;

    create_output_dirs(config)?;
    write_calibration(&config.calibration_output, &output_model)
        .map_err(RectifyError::CalibrationWrite)?;
    log::info!(
        "wrote output calibration {}",
        config.calibration_output.display()
    );

    let requested = config.workers.unwrap_or_else(default_worker_count);
    let workers = effective_worker_count(config.input_range, requested);
    let ranges = partition(config.input_range, workers);
    log::info!(
        "processing frames {}..={} on {} workers",
        config.input_range.start,
        config.input_range.end,
        ranges.len()
    );

    let transformer = FrameTransformer::new(config, &geometry);
    let elapsed = run_batch(&ranges, |index| transformer.transform_pair(index))?;

    Ok(RunSummary {
        frames: config.input_range.len(),
        workers: ranges.len(),
        intermediate_size: geometry.intermediate_size,
        elapsed,
    })
}

/// Probe the first frame of both cameras, they must agree.
fn probe_original_size(config: &PipelineConfig) -> Result<ImageSize, RectifyError> {
    let index = config.input_range.start;

    let mut sizes = Vec::with_capacity(2);
    for camera in Camera::BOTH {
        let path = config.input.frame_path(camera, index);
        let size =
            probe_image_size(&path).map_err(|e| RectifyError::MissingFrame(path.clone(), e))?;
        log::debug!("probed {} as {size}", path.display());
        sizes.push(size);
    }

    if sizes[0] != sizes[1] {
        return Err(RectifyError::Configuration(format!(
            "left frames are {} but right frames are {}",
            sizes[0], sizes[1]
        )));
    }

    Ok(sizes[0])
}

fn create_output_dirs(config: &PipelineConfig) -> Result<(), RectifyError> {
    let mut paths = vec![config.calibration_output.clone()];
    for camera in Camera::BOTH {
        paths.push(config.output.frame_path(camera, config.output_start));
    }

    for path in &paths {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<(), RectifyError> {
    std::fs::create_dir_all(dir).map_err(|e| RectifyError::IoError(e.into()))
}
