use std::{
    fs::File,
    io::{BufWriter, Write},
    ops::Range,
    path::Path,
};

use crate::error::IoError;

/// One pose record: the selected columns of a metadata line.
pub type Pose = Vec<f64>;

/// Read the `columns` of every line of a whitespace separated metadata file.
///
/// Blank lines are skipped. Each remaining line must hold numbers and reach
/// at least `columns.end` fields.
///
/// # Arguments
///
/// * `file_path` - The metadata file recorded with the frames, one line per frame.
/// * `columns` - The fields holding the pose, e.g. `3..10` for position and quaternion.
pub fn read_poses(file_path: impl AsRef<Path>, columns: Range<usize>) -> Result<Vec<Pose>, IoError> {
    let file_path = file_path.as_ref();
    if columns.is_empty() {
        return Err(IoError::InvalidPoseSelection(format!(
            "empty column range {columns:?}"
        )));
    }
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let text = std::fs::read_to_string(file_path)?;
    let invalid = |line: usize, reason: String| {
        IoError::InvalidPoseData(file_path.to_path_buf(), line, reason)
    };

    let mut poses = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.len() < columns.end {
            return Err(invalid(
                i + 1,
                format!("{} fields, expected at least {}", fields.len(), columns.end),
            ));
        }

        let pose = fields[columns.clone()]
            .iter()
            .map(|f| f.parse::<f64>().map_err(|e| invalid(i + 1, format!("{f:?}: {e}"))))
            .collect::<Result<Pose, _>>()?;
        poses.push(pose);
    }

    log::debug!("read {} poses from {}", poses.len(), file_path.display());

    Ok(poses)
}

/// Keep the `fields` of every pose, relative to the pose at `reference`.
///
/// With a reference, that pose becomes the origin: each kept value has the
/// reference value subtracted.
///
/// # Errors
///
/// [`IoError::InvalidPoseSelection`] when a field or the reference pose is out
/// of range.
pub fn relative_poses(
    poses: &[Pose],
    fields: &[usize],
    reference: Option<usize>,
) -> Result<Vec<Pose>, IoError> {
    if let Some(&field) = fields
        .iter()
        .find(|&&f| poses.iter().any(|pose| f >= pose.len()))
    {
        return Err(IoError::InvalidPoseSelection(format!(
            "field {field} is not part of every pose"
        )));
    }

    let offsets = match reference {
        Some(r) => {
            let origin = poses.get(r).ok_or_else(|| {
                IoError::InvalidPoseSelection(format!(
                    "reference pose {r} of {} poses",
                    poses.len()
                ))
            })?;
            fields.iter().map(|&f| origin[f]).collect::<Vec<_>>()
        }
        None => vec![0.0; fields.len()],
    };

    Ok(poses
        .iter()
        .map(|pose| {
            fields
                .iter()
                .zip(offsets.iter())
                .map(|(&f, offset)| pose[f] - offset)
                .collect()
        })
        .collect())
}

/// Write poses as tab separated lines, each prefixed by its frame index.
///
/// Indices count up from `first_index` so that they match the renumbered
/// output frames. Values are written with six decimals.
pub fn write_poses(
    file_path: impl AsRef<Path>,
    poses: &[Pose],
    first_index: usize,
) -> Result<(), IoError> {
    let mut writer = BufWriter::new(File::create(file_path)?);

    for (i, pose) in poses.iter().enumerate() {
        write!(writer, "{}", first_index + i)?;
        for value in pose {
            write!(writer, "\t{value:.6}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = "\
1700000000.1 0 17 1.5 -2.0 0.25 0.0 0.0 0.0 1.0 12
1700000000.2 1 17 1.75 -2.5 0.25 0.0 0.0 0.1 0.99 12

1700000000.3 2 17 2.0 -3.0 0.5 0.0 0.0 0.2 0.98 12
";

    #[test]
    fn read_pose_columns() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("metadata.txt");
        std::fs::write(&file_path, METADATA)?;

        let poses = read_poses(&file_path, 3..10)?;
        assert_eq!(poses.len(), 3);
        assert_eq!(poses[0], vec![1.5, -2.0, 0.25, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(poses[2][6], 0.98);
        Ok(())
    }

    #[test]
    fn read_short_line() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("metadata.txt");
        std::fs::write(&file_path, "1 2 3 4\n")?;

        let res = read_poses(&file_path, 3..10);
        assert!(matches!(res, Err(IoError::InvalidPoseData(_, 1, _))));

        std::fs::write(&file_path, "1 2 3 4 5 6 7 8 9 10\n1 2 3 x 5 6 7 8 9 10\n")?;
        let res = read_poses(&file_path, 3..10);
        assert!(matches!(res, Err(IoError::InvalidPoseData(_, 2, _))));

        let res = read_poses(&file_path, 5..3);
        assert!(matches!(res, Err(IoError::InvalidPoseSelection(_))));
        Ok(())
    }

    #[test]
    fn poses_relative_to_first() -> Result<(), IoError> {
        let poses = vec![vec![1.5, -2.0, 0.25, 9.0], vec![2.0, -3.0, 0.5, 9.0]];

        let relative = relative_poses(&poses, &[0, 1, 2], Some(0))?;
        assert_eq!(relative, vec![vec![0.0, 0.0, 0.0], vec![0.5, -1.0, 0.25]]);

        let absolute = relative_poses(&poses, &[3], None)?;
        assert_eq!(absolute, vec![vec![9.0], vec![9.0]]);

        assert!(relative_poses(&poses, &[4], None).is_err());
        assert!(relative_poses(&poses, &[0], Some(2)).is_err());
        Ok(())
    }

    #[test]
    fn write_indexed_lines() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("poses.txt");

        write_poses(&file_path, &[vec![0.0, 0.0], vec![0.5, -1.0]], 10)?;

        let text = std::fs::read_to_string(&file_path)?;
        assert_eq!(text, "10\t0.000000\t0.000000\n11\t0.500000\t-1.000000\n");
        Ok(())
    }
}
