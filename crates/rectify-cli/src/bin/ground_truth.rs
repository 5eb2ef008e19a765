use argh::FromArgs;
use std::path::PathBuf;

use rectify_io::poses::{read_poses, relative_poses, write_poses};

/// Fields 3..10 of a metadata line hold position and orientation.
const POSE_COLUMNS: std::ops::Range<usize> = 3..10;

/// Position fields within a pose.
const POSITION_FIELDS: [usize; 3] = [0, 1, 2];

#[derive(FromArgs, Debug)]
/// Extract ground-truth positions from the metadata recorded with a stereo sequence.
struct Args {
    /// metadata file, one whitespace separated line per frame
    #[argh(positional)]
    metadata: PathBuf,

    /// output file, one indexed tab separated line per frame
    #[argh(positional)]
    output: PathBuf,

    /// index of the first output line, matching the output start of the frames
    #[argh(option, default = "0")]
    first_index: usize,

    /// keep absolute positions instead of offsetting them to the first pose
    #[argh(switch)]
    absolute: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let poses = read_poses(&args.metadata, POSE_COLUMNS)?;
    let reference = if args.absolute { None } else { Some(0) };
    let positions = relative_poses(&poses, &POSITION_FIELDS, reference)?;

    write_poses(&args.output, &positions, args.first_index)?;
    log::info!(
        "wrote {} positions from {} to {}",
        positions.len(),
        args.metadata.display(),
        args.output.display()
    );

    Ok(())
}
