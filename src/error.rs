//! Error types for Physio Dash

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Errors that abort a dashboard operation
///
/// None of these are fatal to a session: the previously loaded dataset and
/// cursor stay active after any of them.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("No valid rows to display ({dropped} row(s) dropped)")]
    EmptyDataset { dropped: usize },

    #[error("No data for {0}")]
    UnknownDay(NaiveDate),

    #[error("Failed to load source: {0}")]
    SourceFetch(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DashboardError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            DashboardError::EmptyDataset { .. } => "EMPTY_DATASET",
            DashboardError::UnknownDay(_) => "UNKNOWN_DAY",
            DashboardError::SourceFetch(_) => "SOURCE_FETCH_ERROR",
            DashboardError::Config(_) => "CONFIG_ERROR",
            DashboardError::Json(_) => "JSON_ERROR",
        }
    }
}

impl From<csv::Error> for DashboardError {
    fn from(e: csv::Error) -> Self {
        DashboardError::SourceFetch(e.to_string())
    }
}

/// Why a single row was excluded from the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowParseReason {
    MissingDatetime,
    NotText,
    BadFormat { value: String },
}

/// A row that failed validation. Non-fatal: the row is dropped and parsing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("row {row}: {}", describe(.reason))]
pub struct RowParseError {
    /// Zero-based index of the row in the raw input
    pub row: usize,
    pub reason: RowParseReason,
}

fn describe(reason: &RowParseReason) -> String {
    match reason {
        RowParseReason::MissingDatetime => "missing datetime".to_string(),
        RowParseReason::NotText => "datetime cell is not text".to_string(),
        RowParseReason::BadFormat { value } => format!("unparseable datetime {value:?}"),
    }
}
