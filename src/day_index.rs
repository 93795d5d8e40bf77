//! Day navigation
//!
//! Partitions a dataset into its distinct calendar days and keeps a clamped
//! cursor over them. Moving past either end is a no-op, never an error.

use crate::error::DashboardError;
use crate::types::Dataset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where the cursor lands when a dataset is (re)loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorDefault {
    First,
    /// Most recent day
    #[default]
    Last,
}

impl FromStr for CursorDefault {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "oldest" => Ok(CursorDefault::First),
            "last" | "latest" | "newest" => Ok(CursorDefault::Last),
            other => Err(DashboardError::Config(format!(
                "unknown start position: {other} (expected first or last)"
            ))),
        }
    }
}

/// Sorted distinct days plus a cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayIndex {
    days: Vec<NaiveDate>,
    cursor: usize,
    default: CursorDefault,
}

impl DayIndex {
    /// Build from a dataset. An empty dataset yields an empty index on which
    /// navigation is a no-op and [`DayIndex::current_day`] fails.
    pub fn new(dataset: &Dataset, default: CursorDefault) -> Self {
        let mut index = Self {
            days: Vec::new(),
            cursor: 0,
            default,
        };
        index.rebuild(dataset);
        index
    }

    /// Replace the days and reset the cursor to the default position
    pub fn rebuild(&mut self, dataset: &Dataset) {
        self.days = dataset.days();
        self.reset();
    }

    fn reset(&mut self) {
        self.cursor = match self.default {
            CursorDefault::First => 0,
            CursorDefault::Last => self.last_index(),
        };
    }

    fn last_index(&self) -> usize {
        self.days.len().saturating_sub(1)
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_day(&self) -> Result<NaiveDate, DashboardError> {
        self.days
            .get(self.cursor)
            .copied()
            .ok_or(DashboardError::EmptyDataset { dropped: 0 })
    }

    pub fn go_previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn go_next(&mut self) {
        self.cursor = (self.cursor + 1).min(self.last_index());
    }

    pub fn go_first(&mut self) {
        self.cursor = 0;
    }

    pub fn go_last(&mut self) {
        self.cursor = self.last_index();
    }

    /// Jump to `date` if it is one of the days; returns whether the cursor moved there
    pub fn go_to_date(&mut self, date: NaiveDate) -> bool {
        match self.days.binary_search(&date) {
            Ok(position) => {
                self.cursor = position;
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_at_first(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_at_last(&self) -> bool {
        self.cursor == self.last_index()
    }
}
