//! Row sources
//!
//! Reads spreadsheet exports into raw rows. Supported inputs:
//! - CSV with a header row
//! - JSON array of row objects
//! - NDJSON, one row object per line
//!
//! Cells are not interpreted here; typing is the record parser's job.

use crate::error::DashboardError;
use crate::types::{RawRow, RawValue};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Anything that can produce a batch of raw rows
pub trait RowSource {
    /// Human-readable origin, for logs and error messages
    fn describe(&self) -> String;

    /// Fetch all rows. Failures are reported as [`DashboardError::SourceFetch`].
    fn fetch(&self) -> Result<Vec<RawRow>, DashboardError>;
}

/// On-disk encoding of the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Csv,
    Json,
    Ndjson,
}

impl RowFormat {
    /// Infer from the file extension
    pub fn from_path(path: &Path) -> Option<RowFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(RowFormat::Csv),
            "json" => Some(RowFormat::Json),
            "ndjson" | "jsonl" => Some(RowFormat::Ndjson),
            _ => None,
        }
    }
}

/// Parsers for the supported encodings
pub struct RowReader;

impl RowReader {
    /// Parse CSV with a header row. Empty cells become `Null`; rows shorter
    /// than the header simply lack the trailing columns.
    pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, DashboardError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut rows = Vec::new();

        for record in csv_reader.records() {
            let record = record?;
            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| {
                    let value = if cell.trim().is_empty() {
                        RawValue::Null
                    } else {
                        RawValue::Text(cell.to_string())
                    };
                    (header.trim().to_string(), value)
                })
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }

    /// Parse a JSON array of row objects
    pub fn parse_array(json: &str) -> Result<Vec<RawRow>, DashboardError> {
        serde_json::from_str(json).map_err(|e| DashboardError::SourceFetch(e.to_string()))
    }

    /// Parse NDJSON (one row object per line; blank lines are skipped)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawRow>, DashboardError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row = serde_json::from_str::<RawRow>(trimmed).map_err(|e| {
                DashboardError::SourceFetch(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Rows stored in a local file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: RowFormat,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, format: RowFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Open a file, inferring the format from its extension
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DashboardError> {
        let path = path.into();
        let format = RowFormat::from_path(&path).ok_or_else(|| {
            DashboardError::SourceFetch(format!(
                "{}: unsupported file type (expected .csv, .json, .ndjson or .jsonl)",
                path.display()
            ))
        })?;
        Ok(Self { path, format })
    }

    fn io_error(&self, e: std::io::Error) -> DashboardError {
        DashboardError::SourceFetch(format!("{}: {}", self.path.display(), e))
    }
}

impl RowSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<RawRow>, DashboardError> {
        match self.format {
            RowFormat::Csv => {
                let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
                RowReader::parse_csv(file)
            }
            RowFormat::Json => {
                let text = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
                RowReader::parse_array(&text)
            }
            RowFormat::Ndjson => {
                let text = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
                RowReader::parse_ndjson(&text)
            }
        }
    }
}
