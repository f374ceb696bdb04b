use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::FaceReport;

/// Write `report` as JSON to `path`, replacing whatever was there.
///
/// The file is truncated and rewritten in place; a crash mid-write can leave
/// it partial.
pub fn write_report(path: impl AsRef<Path>, report: &FaceReport) -> Result<PathBuf> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, report)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    writer.flush()?;
    Ok(path.to_path_buf())
}

/// Read a report written by [`write_report`].
pub fn read_report(path: impl AsRef<Path>) -> Result<FaceReport> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open report {}", path.display()))?;
    let report = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse report {}", path.display()))?;
    Ok(report)
}
