use csv::{ReaderBuilder, Terminator, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::{AppError, AppResult, BatchError};

/// A serde row type with a fixed column order.
///
/// `HEADER` must list the serialized field names in declaration order.
pub trait TabularRow: Serialize + DeserializeOwned {
    const HEADER: &'static [&'static str];
}

fn malformed(e: csv::Error) -> AppError {
    let line = e.position().map_or(0, |p| p.line() as usize);
    BatchError::MalformedRow {
        line,
        message: e.to_string(),
    }
    .into()
}

/// Write `rows` under a header line, replacing any existing file.
///
/// The header is written even when `rows` is empty.
pub fn write_rows<R: TabularRow>(path: &Path, rows: &[R]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?;
    writer.write_record(R::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the rows of a file written by `write_rows::<R>`.
///
/// The header must match `R::HEADER`. An empty file has no rows.
pub fn read_rows<R: TabularRow>(path: &Path) -> AppResult<Vec<R>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;

    let headers = reader.headers().map_err(malformed)?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    if !headers.iter().eq(R::HEADER.iter().copied()) {
        return Err(BatchError::MalformedRow {
            line: 1,
            message: format!("expected header {:?}, found {:?}", R::HEADER, headers),
        }
        .into());
    }

    reader
        .deserialize()
        .map(|row| row.map_err(malformed))
        .collect()
}
