//! Result sink: writes a finished harvest to an output directory.
//!
//! Layout of the directory after a run:
//! - `output.csv`: one row per (place, channel), columns in [`OutputRow::COLUMNS`] order
//! - `output_previous.csv`: the `output.csv` of the previous run, if any
//! - `output.json`: the same rows as a JSON array
//! - `places.json`: the harvested place list

use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::model::{OutputRow, Place};

pub const OUTPUT_CSV: &str = "output.csv";
pub const PREVIOUS_CSV: &str = "output_previous.csv";
pub const OUTPUT_JSON: &str = "output.json";
pub const PLACES_JSON: &str = "places.json";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the output directory and backs up a previous `output.csv`.
    ///
    /// Returns the backup path when a backup was made.
    pub fn prepare(&self) -> Result<Option<PathBuf>, SinkError> {
        if !self.dir.exists() {
            info!(dir = %self.dir.display(), "Creating output directory");
            fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        }

        let current = self.dir.join(OUTPUT_CSV);
        if !current.exists() {
            return Ok(None);
        }

        let backup = self.dir.join(PREVIOUS_CSV);
        info!("Backing up {} to {}", current.display(), backup.display());
        fs::copy(&current, &backup).map_err(io_err(&backup))?;
        Ok(Some(backup))
    }

    /// Writes `output.csv` and `output.json`, replacing previous files.
    pub fn write_rows(&self, rows: &[OutputRow]) -> Result<(), SinkError> {
        let csv_path = self.dir.join(OUTPUT_CSV);
        fs::write(&csv_path, rows_to_csv(rows)).map_err(io_err(&csv_path))?;
        info!(rows = rows.len(), "WROTE {}", csv_path.display());

        let json_path = self.write_json(OUTPUT_JSON, rows)?;
        info!("WROTE {}", json_path.display());
        Ok(())
    }

    pub fn write_places(&self, places: &[Place]) -> Result<PathBuf, SinkError> {
        let path = self.write_json(PLACES_JSON, places)?;
        info!(places = places.len(), "WROTE {}", path.display());
        Ok(path)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(name);
        let body = serde_json::to_vec_pretty(value)?;
        fs::write(&path, body).map_err(io_err(&path))?;
        Ok(path)
    }
}

/// Renders rows as CSV with a header line. A missing resolved stream URL is
/// an empty cell.
pub fn rows_to_csv(rows: &[OutputRow]) -> String {
    let mut out = String::new();
    out.push_str(&OutputRow::COLUMNS.join(","));
    out.push('\n');

    for row in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            escape_csv(&row.place_id),
            escape_csv(&row.channel_id),
            escape_csv(&row.channel_url),
            escape_csv(&row.place_name),
            escape_csv(&row.channel_name),
            escape_csv(&row.channel_stream),
            row.channel_secure,
            row.place_size,
            row.boost,
            escape_csv(&row.country),
            row.geo_lat,
            row.geo_lon,
            escape_csv(row.channel_resolved_url.as_deref().unwrap_or("")),
        );
    }
    out
}

// Quotes only fields that need it, to avoid allocating for the common case.
fn escape_csv(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}
