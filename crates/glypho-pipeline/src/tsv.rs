//! Tab-separated table I/O
//!
//! Every file the pipeline reads or writes is TSV. Untyped tables (abundance
//! profiles, metadata) go through [`Table`]; typed rows go through
//! [`read_records`] / [`write_records`].

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Cells treated as missing values
const MISSING: [&str; 5] = ["", "NA", "NaN", "nan", "None"];

pub fn is_missing(cell: &str) -> bool {
    MISSING.contains(&cell.trim())
}

fn builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(b'\t').has_headers(true);
    builder
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    Ok(File::open(path)?)
}

/// An untyped table: header row plus string cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a TSV file, skipping `#` comment lines before and between rows
    pub fn read(path: &Path) -> Result<Self> {
        let file = open(path)?;
        Self::from_reader(path.display().to_string(), file, true)
    }

    /// Parse TSV text; `comments` enables `#` line skipping
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R, comments: bool) -> Result<Self> {
        let name = name.into();
        let mut builder = builder();
        if comments {
            builder.comment(Some(b'#'));
        }
        let mut reader = builder.from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(PipelineError::invalid_table(&name, "no header row"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Self { name, headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of `column`, or a `MissingColumn` error naming this table
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::missing_column(&self.name, column))
    }

    /// All values of `column`, in row order
    pub fn column(&self, column: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }
}

/// Deserialize every row of a TSV file into `T`
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = open(path)?;
    parse_records(file)
}

/// Deserialize TSV text into `T`, without quote handling
pub fn parse_records<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = builder().quoting(false).flexible(true).from_reader(reader);
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Write `records` under `header`; the header is written even with no rows
pub fn write_records<T: Serialize>(path: &Path, header: &[&str], records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_records_to(File::create(path)?, header, records)
}

/// Write `records` under `header` to any writer
pub fn write_records_to<T: Serialize, W: Write>(writer: W, header: &[&str], records: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(header)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a table of raw string rows
pub fn write_rows(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
