//! Core types for the Physio Dash pipeline
//!
//! This module defines the data structures that flow through each stage:
//! raw spreadsheet rows, validated records, the dataset, and the chart
//! payloads handed to the rendering layer.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A loosely typed spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell. Text is trimmed and parsed; anything that is
    /// not a finite number yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Null | RawValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Textual view of the cell, trimmed. Empty text and nulls yield `None`.
    pub fn as_label(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Number(n) if n.is_finite() => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

/// One spreadsheet row: column name to cell value
pub type RawRow = BTreeMap<String, RawValue>;

/// One validated measurement sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Sample time (local, as written in the log)
    pub timestamp: NaiveDateTime,
    /// Calendar day of `timestamp`
    pub date: NaiveDate,
    /// Metric column to value; the set of columns depends on the log layout
    pub measurements: BTreeMap<String, f64>,
    /// Event label or code, if any
    pub event_label: Option<String>,
    /// Free-text annotation shown as a tooltip
    pub event_details: Option<String>,
    /// Columns the parser does not interpret
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, RawValue>,
}

impl Record {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            date: timestamp.date(),
            measurements: BTreeMap::new(),
            event_label: None,
            event_details: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, column: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(column.into(), value);
        self
    }

    pub fn with_event(mut self, label: impl Into<String>, details: Option<&str>) -> Self {
        self.event_label = Some(label.into());
        self.event_details = details.map(str::to_string);
        self
    }

    pub fn metric(&self, column: &str) -> Option<f64> {
        self.measurements.get(column).copied()
    }
}

/// The validated records of a session, kept in timestamp order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredDataset")]
pub struct Dataset {
    records: Vec<Record>,
}

/// Serialized form; deserializing re-sorts through [`Dataset::from_records`]
#[derive(Deserialize)]
struct StoredDataset {
    records: Vec<Record>,
}

impl From<StoredDataset> for Dataset {
    fn from(stored: StoredDataset) -> Self {
        Dataset::from_records(stored.records)
    }
}

impl Dataset {
    /// Build a dataset; records are sorted by timestamp (stable for ties)
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct calendar days, ascending
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.records.iter().map(|r| r.date).collect();
        days.dedup();
        days
    }

    /// Records whose date equals `date`, in timestamp order
    pub fn records_on(&self, date: NaiveDate) -> &[Record] {
        let start = self.records.partition_point(|r| r.date < date);
        let end = self.records.partition_point(|r| r.date <= date);
        &self.records[start..end]
    }

    /// Whether any record carries a value for `column`
    pub fn has_metric(&self, column: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.measurements.contains_key(column))
    }

    /// Metric columns present in at least one record
    pub fn metric_columns(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .flat_map(|r| r.measurements.keys().cloned())
            .collect()
    }

    /// Combine two exports of the same log into one history
    pub fn merge(self, other: Dataset) -> Dataset {
        let mut records = self.records;
        records.extend(other.records);
        Dataset::from_records(records)
    }
}

/// Non-blocking notice that rows were excluded during the last parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub dropped: usize,
    pub message: String,
}

impl ParseWarning {
    pub fn dropped_rows(dropped: usize) -> Self {
        Self {
            dropped,
            message: format!("{dropped} row(s) dropped: unparseable datetime"),
        }
    }
}

/// Fixed value-axis bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Time-axis bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    /// `[day 00:00:00, day 23:59:59]`
    pub fn whole_day(day: NaiveDate) -> Self {
        Self::spanning_days(day, day)
    }

    /// From the start of `first` to the last second of `last`
    pub fn spanning_days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: last.and_time(NaiveTime::MIN) + Duration::seconds(SECONDS_PER_DAY - 1),
        }
    }
}

/// Line dash pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashStyle {
    Solid,
    Dash,
    Dot,
    DashDot,
}

/// Point marker shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSymbol {
    Circle,
    Diamond,
    Square,
    TriangleUp,
}

/// How a series' points are drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub symbol: MarkerSymbol,
    pub size: u32,
    pub color: String,
    pub outline_color: Option<String>,
    pub outline_width: u32,
}

impl MarkerStyle {
    pub fn new(symbol: MarkerSymbol, size: u32, color: &str) -> Self {
        Self {
            symbol,
            size,
            color: color.to_string(),
            outline_color: None,
            outline_width: 0,
        }
    }

    pub fn outlined(mut self, color: &str, width: u32) -> Self {
        self.outline_color = Some(color.to_string());
        self.outline_width = width;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: NaiveDateTime,
    pub y: f64,
}

/// One plotted metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// Index into the payload's panels (0 for the overall chart)
    pub panel: usize,
    pub points: Vec<Point>,
    pub marker: MarkerStyle,
}

/// One subplot row of the daily chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub y_range: AxisRange,
}

/// Event line spanning every panel at `x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalMarker {
    pub x: NaiveDateTime,
    pub color: String,
    pub width: u32,
    pub dash: DashStyle,
    pub tooltip: String,
}

/// Invisible zero-size hover target at the top of a panel.
/// Never legended and excluded from axis scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipPoint {
    pub panel: usize,
    pub x: NaiveDateTime,
    pub y: f64,
    pub color: String,
    pub text: String,
}

/// Everything the renderer needs for the single-day chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChartPayload {
    pub title: String,
    pub day: NaiveDate,
    pub x_range: TimeRange,
    pub panels: Vec<Panel>,
    pub series: Vec<Series>,
    pub vertical_markers: Vec<VerticalMarker>,
    pub tooltips: Vec<TooltipPoint>,
}

impl DailyChartPayload {
    /// True when no series has a point and no event was marked
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty()) && self.vertical_markers.is_empty()
    }
}

/// Fixed horizontal threshold line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub y: f64,
    pub label: Option<String>,
    pub color: String,
    pub dash: DashStyle,
}

/// Everything the renderer needs for the full-history trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallChartPayload {
    pub title: String,
    pub series: Vec<Series>,
    pub x_range: Option<TimeRange>,
    pub y_range: AxisRange,
    pub reference_line: Option<ReferenceLine>,
}
