//! JSON record of a finished sweep, written next to the results file.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{config::SweepConfig, orchestrator::RunRecord};

#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub config: &'a SweepConfig,
    pub results_file: &'a Path,
    /// The `--outFile` value the simulator was given.
    pub tool_out_file: &'a Path,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub aborted: bool,
    pub runs: &'a [RunRecord],
}

/// `Simulation20240307_120000.csv` -> `Simulation20240307_120000.manifest.json`
pub fn manifest_path(results_file: &Path) -> PathBuf {
    results_file.with_extension("manifest.json")
}

pub fn write(path: &Path, manifest: &Manifest<'_>) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, manifest)?;
    out.write_all(b"\n")?;
    out.flush()
}
