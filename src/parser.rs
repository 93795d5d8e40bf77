//! Record parsing
//!
//! Turns raw spreadsheet rows into validated records. A row is kept only if its
//! datetime cell parses under the configured format; every other problem with a
//! row (missing or non-numeric metrics, blank events) degrades to "absent"
//! rather than dropping the row.

use crate::error::{RowParseError, RowParseReason};
use crate::layout::KNOWN_METRIC_COLUMNS;
use crate::types::{Dataset, ParseWarning, RawRow, RawValue, Record};
use chrono::NaiveDateTime;
use tracing::{debug, warn};

pub const DEFAULT_DATETIME_COLUMN: &str = "Datetime";
/// `DD/MM/YYYY HH:MM`
pub const DEFAULT_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";
pub const DEFAULT_EVENT_COLUMN: &str = "Events";
pub const DEFAULT_DETAILS_COLUMN: &str = "Event details";

/// Result of parsing one batch of rows
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub dataset: Dataset,
    pub dropped: Vec<RowParseError>,
    pub total_rows: usize,
}

impl ParseOutcome {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Combine the outcomes of several exports of the same log.
    ///
    /// Row numbers in `dropped` stay relative to the batch they came from.
    pub fn merge(self, other: ParseOutcome) -> ParseOutcome {
        let mut dropped = self.dropped;
        dropped.extend(other.dropped);
        ParseOutcome {
            dataset: self.dataset.merge(other.dataset),
            dropped,
            total_rows: self.total_rows + other.total_rows,
        }
    }

    /// Aggregate warning for the whole batch, if any row was dropped
    pub fn warning(&self) -> Option<ParseWarning> {
        (!self.dropped.is_empty()).then(|| ParseWarning::dropped_rows(self.dropped.len()))
    }
}

/// Parser for raw log rows
#[derive(Debug, Clone)]
pub struct RecordParser {
    datetime_column: String,
    datetime_format: String,
    event_column: String,
    details_column: String,
    metric_columns: Vec<String>,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser {
    /// Parser for the standard log columns, recognizing every known metric
    pub fn new() -> Self {
        Self {
            datetime_column: DEFAULT_DATETIME_COLUMN.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            event_column: DEFAULT_EVENT_COLUMN.to_string(),
            details_column: DEFAULT_DETAILS_COLUMN.to_string(),
            metric_columns: KNOWN_METRIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_datetime(mut self, column: impl Into<String>, format: impl Into<String>) -> Self {
        self.datetime_column = column.into();
        self.datetime_format = format.into();
        self
    }

    pub fn with_event_columns(
        mut self,
        label_column: impl Into<String>,
        details_column: impl Into<String>,
    ) -> Self {
        self.event_column = label_column.into();
        self.details_column = details_column.into();
        self
    }

    /// Replace the set of columns coerced to numbers
    pub fn with_metric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metric_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a batch of rows. Never fails as a whole: bad rows are reported in
    /// [`ParseOutcome::dropped`] and excluded from the dataset.
    pub fn parse(&self, rows: &[RawRow]) -> ParseOutcome {
        let mut records = Vec::with_capacity(rows.len());
        let mut dropped = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match self.parse_row(index, row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(row = e.row, reason = ?e.reason, "dropping row");
                    dropped.push(e);
                }
            }
        }

        if !dropped.is_empty() {
            warn!(
                dropped = dropped.len(),
                total = rows.len(),
                "rows with unparseable datetime were dropped"
            );
        }

        ParseOutcome {
            dataset: Dataset::from_records(records),
            dropped,
            total_rows: rows.len(),
        }
    }

    fn parse_row(&self, index: usize, row: &RawRow) -> Result<Record, RowParseError> {
        let timestamp = self.parse_timestamp(row).map_err(|reason| RowParseError {
            row: index,
            reason,
        })?;

        let mut record = Record::new(timestamp);

        for (column, value) in row {
            if column == &self.datetime_column {
                continue;
            } else if column == &self.event_column {
                record.event_label = value.as_label();
            } else if column == &self.details_column {
                record.event_details = value.as_label();
            } else if self.metric_columns.iter().any(|c| c == column) {
                if let Some(v) = value.as_f64() {
                    record.measurements.insert(column.clone(), v);
                }
            } else {
                record.extra.insert(column.clone(), value.clone());
            }
        }

        Ok(record)
    }

    fn parse_timestamp(&self, row: &RawRow) -> Result<NaiveDateTime, RowParseReason> {
        let text = match row.get(&self.datetime_column) {
            None | Some(RawValue::Null) => return Err(RowParseReason::MissingDatetime),
            Some(RawValue::Text(s)) if s.trim().is_empty() => {
                return Err(RowParseReason::MissingDatetime)
            }
            Some(RawValue::Text(s)) => s.trim(),
            Some(_) => return Err(RowParseReason::NotText),
        };

        NaiveDateTime::parse_from_str(text, &self.datetime_format).map_err(|_| {
            RowParseReason::BadFormat {
                value: text.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ANGLE_COLUMN, CIRC_HIGH_COLUMN, SWELLING_COLUMN};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn row(cells: &[(&str, RawValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> RawValue {
        RawValue::from(s)
    }

    #[test]
    fn test_parse_valid_rows() {
        let rows = vec![
            row(&[
                ("Datetime", text("24/09/2024 08:00")),
                (ANGLE_COLUMN, RawValue::Number(45.0)),
                (SWELLING_COLUMN, text("7.5")),
                ("Events", text("Rest")),
                ("Event details", text("Lying down")),
                ("Notes", text("felt fine")),
            ]),
            row(&[
                ("Datetime", text("25/09/2024 09:00")),
                (ANGLE_COLUMN, RawValue::Number(60.0)),
                ("Events", text("")),
            ]),
        ];

        let outcome = RecordParser::new().parse(&rows);
        assert_eq!(outcome.dropped_count(), 0);
        assert!(outcome.warning().is_none());
        assert_eq!(outcome.total_rows, 2);

        let records = outcome.dataset.records();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(
            first.timestamp,
            NaiveDate::from_ymd_opt(2024, 9, 24)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
        assert_eq!(first.metric(ANGLE_COLUMN), Some(45.0));
        assert_eq!(first.metric(SWELLING_COLUMN), Some(7.5));
        assert_eq!(first.event_label.as_deref(), Some("Rest"));
        assert_eq!(first.event_details.as_deref(), Some("Lying down"));
        assert_eq!(first.extra.get("Notes"), Some(&text("felt fine")));

        assert_eq!(records[1].event_label, None);
    }

    #[test]
    fn test_impossible_date_is_dropped() {
        let rows = vec![
            row(&[("Datetime", text("31/02/2024 10:00"))]),
            row(&[("Datetime", text("01/03/2024 10:00"))]),
        ];

        let outcome = RecordParser::new().parse(&rows);
        assert_eq!(outcome.dropped_count(), 1);
        assert_eq!(outcome.dropped[0].row, 0);
        assert_eq!(
            outcome.dropped[0].reason,
            RowParseReason::BadFormat {
                value: "31/02/2024 10:00".to_string()
            }
        );
        assert_eq!(outcome.dataset.len(), 1);

        let warning = outcome.warning().unwrap();
        assert_eq!(warning.dropped, 1);
        assert!(warning.message.contains("1 row(s) dropped"));
    }

    #[test]
    fn test_drop_reasons() {
        let rows = vec![
            row(&[(ANGLE_COLUMN, RawValue::Number(10.0))]),
            row(&[("Datetime", RawValue::Null)]),
            row(&[("Datetime", RawValue::Number(45558.33))]),
            row(&[("Datetime", text("2024-09-24 08:00"))]),
            row(&[("Datetime", text("24/09/2024 08:00:00"))]),
        ];

        let outcome = RecordParser::new().parse(&rows);
        assert!(outcome.dataset.is_empty());
        let reasons: Vec<_> = outcome.dropped.iter().map(|e| e.reason.clone()).collect();
        assert_eq!(reasons[0], RowParseReason::MissingDatetime);
        assert_eq!(reasons[1], RowParseReason::MissingDatetime);
        assert_eq!(reasons[2], RowParseReason::NotText);
        assert!(matches!(reasons[3], RowParseReason::BadFormat { .. }));
        assert!(matches!(reasons[4], RowParseReason::BadFormat { .. }));
    }

    #[test]
    fn test_garbage_metric_is_absent_not_fatal() {
        let rows = vec![row(&[
            ("Datetime", text(" 24/09/2024 08:00 ")),
            (ANGLE_COLUMN, text("about forty")),
            (CIRC_HIGH_COLUMN, text("")),
            (SWELLING_COLUMN, RawValue::Bool(true)),
        ])];

        let outcome = RecordParser::new().parse(&rows);
        assert_eq!(outcome.dropped_count(), 0);
        let record = &outcome.dataset.records()[0];
        assert!(record.measurements.is_empty());
    }

    #[test]
    fn test_numeric_event_code_becomes_label() {
        let rows = vec![row(&[
            ("Datetime", text("24/09/2024 08:00")),
            ("Events", RawValue::Number(2.0)),
        ])];

        let outcome = RecordParser::new().parse(&rows);
        assert_eq!(outcome.dataset.records()[0].event_label.as_deref(), Some("2"));
    }

    #[test]
    fn test_custom_columns() {
        let parser = RecordParser::new()
            .with_datetime("When", "%Y-%m-%d %H:%M")
            .with_event_columns("Code", "Note")
            .with_metric_columns(["Flexion"]);
        let rows = vec![row(&[
            ("When", text("2024-09-24 08:00")),
            ("Flexion", text("88")),
            (ANGLE_COLUMN, text("45")),
            ("Code", text("H")),
            ("Note", text("sharp pain")),
        ])];

        let outcome = parser.parse(&rows);
        let record = &outcome.dataset.records()[0];
        assert_eq!(record.metric("Flexion"), Some(88.0));
        // Not configured as a metric, so passed through untouched
        assert_eq!(record.metric(ANGLE_COLUMN), None);
        assert_eq!(record.extra.get(ANGLE_COLUMN), Some(&text("45")));
        assert_eq!(record.event_label.as_deref(), Some("H"));
        assert_eq!(record.event_details.as_deref(), Some("sharp pain"));
    }

    #[test]
    fn test_merge_outcomes() {
        let parser = RecordParser::new();
        let first = parser.parse(&[
            row(&[("Datetime", text("24/09/2024 08:00")), (ANGLE_COLUMN, RawValue::Number(45.0))]),
            row(&[("Datetime", text("31/02/2024 10:00"))]),
        ]);
        let second = parser.parse(&[
            row(&[("Datetime", text("23/09/2024 18:00")), (ANGLE_COLUMN, RawValue::Number(30.0))]),
            row(&[("Datetime", RawValue::Null)]),
        ]);

        let merged = first.merge(second);
        assert_eq!(merged.total_rows, 4);
        assert_eq!(merged.dropped_count(), 2);
        assert_eq!(merged.warning().unwrap().dropped, 2);
        assert_eq!(merged.dataset.days().len(), 2);
        assert_eq!(
            merged.dataset.records()[0].date,
            NaiveDate::from_ymd_opt(2024, 9, 23).unwrap()
        );
    }
}
