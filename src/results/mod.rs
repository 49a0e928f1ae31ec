//! Output directories and the timestamped results file.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{Result, SweepError};

/// Header row of the results CSV. Rows are appended by the simulator.
pub const RESULTS_HEADER: &str = "Hello Resolution (Milliseconds);Mobile Nodes;Propagation Range (Meters);Area (Square Meters);Seed;Sent Packets;Received Packets\n";

pub const RESULTS_PREFIX: &str = "Simulation";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Create every directory in `dirs` that does not exist yet.
pub fn prepare_dirs(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        ensure_dir(dir)?;
    }
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| SweepError::setup(dir, e))?;
    debug!(dir = %dir.display(), "created directory");
    Ok(())
}

/// `Simulation<YYYYmmdd_HHMMSS>.csv`
pub fn results_file_name(now: NaiveDateTime) -> String {
    format!("{RESULTS_PREFIX}{}.csv", now.format(STAMP_FORMAT))
}

/// Create a fresh results file in `dir` holding only the header row.
///
/// An existing file is never truncated: if the timestamped name is taken,
/// `_1`, `_2`, ... is appended to the stem until a free name is found.
pub fn init_results_file(dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    let stamp = now.format(STAMP_FORMAT).to_string();
    let mut suffix = 0u32;
    loop {
        let name = if suffix == 0 {
            format!("{RESULTS_PREFIX}{stamp}.csv")
        } else {
            format!("{RESULTS_PREFIX}{stamp}_{suffix}.csv")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(RESULTS_HEADER.as_bytes())
                    .and_then(|_| file.flush())
                    .map_err(|e| SweepError::setup(&path, e))?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(SweepError::setup(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn file_name_uses_compact_stamp() {
        assert_eq!(results_file_name(at(9, 5, 1)), "Simulation20240307_090501.csv");
    }

    #[test]
    fn header_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_results_file(dir.path(), at(12, 0, 0)).unwrap();
        assert_eq!(path.file_name().unwrap(), "Simulation20240307_120000.csv");
        assert_eq!(fs::read(&path).unwrap(), RESULTS_HEADER.as_bytes());
    }

    #[test]
    fn same_second_gets_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = init_results_file(dir.path(), at(12, 0, 0)).unwrap();
        fs::write(&first, "kept").unwrap();
        let second = init_results_file(dir.path(), at(12, 0, 0)).unwrap();
        let third = init_results_file(dir.path(), at(12, 0, 0)).unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(second.file_name().unwrap(), "Simulation20240307_120000_1.csv");
        assert_eq!(third.file_name().unwrap(), "Simulation20240307_120000_2.csv");
        assert_eq!(fs::read_to_string(&first).unwrap(), "kept");
    }

    #[test]
    fn prepare_dirs_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let results = root.path().join(".Results");
        let animations = root.path().join(".Animations");

        prepare_dirs(&[results.as_path(), animations.as_path()]).unwrap();
        prepare_dirs(&[results.as_path(), animations.as_path()]).unwrap();

        assert!(results.is_dir());
        assert!(animations.is_dir());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 2);
    }

    #[test]
    fn file_in_place_of_directory_is_a_setup_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join(".Results");
        fs::write(&blocker, "").unwrap();
        assert!(matches!(
            ensure_dir(&blocker),
            Err(SweepError::Setup { .. })
        ));
    }

    #[test]
    fn missing_results_dir_is_a_setup_error() {
        let root = tempfile::tempdir().unwrap();
        let err = init_results_file(&root.path().join("absent"), at(1, 2, 3));
        assert!(matches!(err, Err(SweepError::Setup { .. })));
    }
}
