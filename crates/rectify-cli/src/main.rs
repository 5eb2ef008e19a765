use argh::FromArgs;
use std::path::PathBuf;

use rectify_io::{CameraLayout, FrameTemplate, StereoLayout};
use rectify_pipeline::{ColorMode, FrameRange, PipelineConfig};

#[derive(FromArgs, Debug)]
/// Rectify a stereo frame sequence and resize it to a target size.
// paths are plain concatenations: root + camera path + template(mark, index)
struct Args {
    /// width of the output frames
    #[argh(positional)]
    target_width: usize,

    /// height of the output frames
    #[argh(positional)]
    target_height: usize,

    /// first input frame index
    #[argh(positional)]
    input_start: usize,

    /// last input frame index, included
    #[argh(positional)]
    input_end: usize,

    /// output index of the first input frame
    #[argh(positional)]
    output_start: usize,

    /// grayscale flag, 1 for grayscale frames and 0 for color
    #[argh(positional, from_str_fn(parse_flag))]
    grayscale: bool,

    /// input dataset root
    #[argh(positional)]
    input_root: String,

    /// left camera directory under the input root
    #[argh(positional)]
    left_input_path: String,

    /// right camera directory under the input root
    #[argh(positional)]
    right_input_path: String,

    /// left camera mark of the input file names
    #[argh(positional)]
    left_input_mark: String,

    /// right camera mark of the input file names
    #[argh(positional)]
    right_input_mark: String,

    /// input file name template, e.g. "%s%05d.pgm"
    #[argh(positional)]
    input_template: FrameTemplate,

    /// calibration file name under the input root
    #[argh(positional)]
    calibration_file: String,

    /// output dataset root
    #[argh(positional)]
    output_root: String,

    /// left camera directory under the output root
    #[argh(positional)]
    left_output_path: String,

    /// right camera directory under the output root
    #[argh(positional)]
    right_output_path: String,

    /// left camera mark of the output file names
    #[argh(positional)]
    left_output_mark: String,

    /// right camera mark of the output file names
    #[argh(positional)]
    right_output_mark: String,

    /// output file name template
    #[argh(positional)]
    output_template: FrameTemplate,

    /// directory of the output calibration
    #[argh(positional)]
    output_calibration_dir: String,

    /// file name of the output calibration, .json writes JSON
    #[argh(positional)]
    output_calibration_file: String,

    /// log per frame details
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// number of workers, defaults to half the available cores
    #[argh(option, short = 'j')]
    workers: Option<usize>,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("expected 0 or 1, got '{value}'")),
    }
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let calibration_input = PathBuf::from(format!("{}{}", self.input_root, self.calibration_file));
        let calibration_output = PathBuf::from(format!(
            "{}{}",
            self.output_calibration_dir, self.output_calibration_file
        ));

        PipelineConfig {
            target_size: [self.target_width, self.target_height].into(),
            input_range: FrameRange {
                start: self.input_start,
                end: self.input_end,
            },
            output_start: self.output_start,
            color_mode: ColorMode::from_flag(self.grayscale),
            input: StereoLayout {
                root: self.input_root,
                left: CameraLayout {
                    path: self.left_input_path,
                    mark: self.left_input_mark,
                },
                right: CameraLayout {
                    path: self.right_input_path,
                    mark: self.right_input_mark,
                },
                template: self.input_template,
            },
            output: StereoLayout {
                root: self.output_root,
                left: CameraLayout {
                    path: self.left_output_path,
                    mark: self.left_output_mark,
                },
                right: CameraLayout {
                    path: self.right_output_path,
                    mark: self.right_output_mark,
                },
                template: self.output_template,
            },
            calibration_input,
            calibration_output,
            workers: self.workers,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = args.into_config();
    log::debug!("{config:?}");

    let summary = rectify_pipeline::run(&config)?;
    log::info!(
        "rectified {} frame pairs to {} in {:?}",
        summary.frames,
        config.target_size,
        summary.elapsed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectify_io::Camera;

    const POSITIONALS: [&str; 21] = [
        "512", "512", "100", "3000", "0", "1", "/data/", "left/", "right/", "l", "r",
        "%s%05d.pgm", "calib.yaml", "/out/", "", "", "left_", "right_", "%s%06d.png",
        "/out/calib/", "calib_512x512_rectified.yaml",
    ];

    #[test]
    fn positional_arguments() -> Result<(), Box<dyn std::error::Error>> {
        let args = Args::from_args(&["rectify"], &POSITIONALS).map_err(|e| e.output)?;
        assert!(args.grayscale);
        assert_eq!(args.workers, None);

        let config = args.into_config();
        config.validate()?;
        assert_eq!(config.input_range, FrameRange { start: 100, end: 3000 });
        assert_eq!(config.color_mode, ColorMode::Grayscale);
        assert_eq!(config.calibration_input, PathBuf::from("/data/calib.yaml"));
        assert_eq!(
            config.calibration_output,
            PathBuf::from("/out/calib/calib_512x512_rectified.yaml")
        );
        assert_eq!(
            config.input.frame_path(Camera::Right, 7),
            PathBuf::from("/data/right/r00007.pgm")
        );
        assert_eq!(
            config.output.frame_path(Camera::Left, 7),
            PathBuf::from("/out/left_000007.png")
        );
        Ok(())
    }

    #[test]
    fn options() -> Result<(), Box<dyn std::error::Error>> {
        let mut argv: Vec<&str> = POSITIONALS.to_vec();
        argv.extend(["--verbose", "--workers", "3"]);
        let args = Args::from_args(&["rectify"], &argv).map_err(|e| e.output)?;
        assert!(args.verbose);
        assert_eq!(args.workers, Some(3));
        Ok(())
    }

    #[test]
    fn argument_mismatch() {
        assert!(Args::from_args(&["rectify"], &POSITIONALS[..20]).is_err());

        let mut bad_flag = POSITIONALS;
        bad_flag[5] = "yes";
        assert!(Args::from_args(&["rectify"], &bad_flag).is_err());

        let mut bad_template = POSITIONALS;
        bad_template[11] = "%s.pgm";
        assert!(Args::from_args(&["rectify"], &bad_template).is_err());
    }

    #[test]
    fn help_lists_positionals() {
        let help = match Args::from_args(&["rectify"], &["--help"]) {
            Err(early_exit) => early_exit,
            Ok(args) => panic!("help parsed as arguments {args:?}"),
        };
        assert!(help.status.is_ok());
        assert!(help.output.contains("grayscale flag, 1 for grayscale frames"));
        assert!(help.output.contains("--workers"));
    }
}
