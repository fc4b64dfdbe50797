// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::models::{Dataset, Value};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, NaiveTime};
use csv::Writer;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Dates print as `YYYY-MM-DD` when the whole column sits on midnight.
fn midnight_only_columns(dataset: &Dataset) -> Vec<bool> {
    (0..dataset.columns().len())
        .map(|idx| {
            dataset.rows().iter().all(|row| match row.get(idx) {
                Some(Value::Date(dt)) => dt.time() == NaiveTime::MIN,
                _ => true,
            })
        })
        .collect()
}

fn render_cell(value: &Value, midnight_only: bool) -> String {
    match value {
        Value::Date(dt) if !midnight_only => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        other => other.to_string(),
    }
}

/// Serialise the dataset as CSV, header first.
pub fn write_csv<W: Write>(dataset: &Dataset, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(dataset.columns())?;

    let midnight = midnight_only_columns(dataset);
    for row in dataset.rows() {
        writer.write_record(
            row.iter()
                .zip(&midnight)
                .map(|(value, midnight_only)| render_cell(value, *midnight_only)),
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn csv_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(dataset, &mut buffer)?;
    Ok(buffer)
}

/// `<prefix>_YYYYMMDD_HHMM.<extension>`
pub fn timestamped_name(prefix: &str, extension: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.{}", prefix, at.format("%Y%m%d_%H%M"), extension)
}

/// Write `bytes` to `dir/file_name`, creating the directory when needed.
pub fn save_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "export written");
    Ok(path)
}
