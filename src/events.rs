//! Event classification
//!
//! Maps an event label to the style of its vertical marker. The mapping is a
//! lookup table per label vocabulary; labels outside the table get no marker.

use crate::types::DashStyle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default stroke width of event markers
pub const DEFAULT_EVENT_WIDTH: u32 = 2;

/// Free-text activity labels used by the angle+swelling log
const ACTIVITY_LABELS: &[(&str, &str)] = &[("Rest", "green"), ("Move", "orange"), ("Exercise", "red")];

/// Severity codes used by the circumference and angle-only logs
const SEVERITY_LABELS: &[(&str, &str)] = &[("L", "green"), ("M", "orange"), ("H", "red")];

/// Rendering directive for a recognized event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStyle {
    pub color: String,
    #[serde(default = "default_dash")]
    pub dash: DashStyle,
    #[serde(default = "default_width")]
    pub width: u32,
}

fn default_dash() -> DashStyle {
    DashStyle::Dash
}

fn default_width() -> u32 {
    DEFAULT_EVENT_WIDTH
}

impl EventStyle {
    pub fn dashed(color: &str) -> Self {
        Self {
            color: color.to_string(),
            dash: default_dash(),
            width: DEFAULT_EVENT_WIDTH,
        }
    }
}

/// Label vocabulary: label to marker style
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventVocabulary {
    styles: BTreeMap<String, EventStyle>,
}

impl EventVocabulary {
    /// Rest / Move / Exercise
    pub fn activity() -> Self {
        Self::from_table(ACTIVITY_LABELS)
    }

    /// L / M / H
    pub fn severity() -> Self {
        Self::from_table(SEVERITY_LABELS)
    }

    /// Activity and severity labels together. The two sets do not overlap, so
    /// a log using either one is classified correctly.
    pub fn standard() -> Self {
        let mut vocabulary = Self::activity();
        vocabulary.styles.extend(Self::severity().styles);
        vocabulary
    }

    fn from_table(table: &[(&str, &str)]) -> Self {
        let styles = table
            .iter()
            .map(|(label, color)| (label.to_string(), EventStyle::dashed(color)))
            .collect();
        Self { styles }
    }

    /// Add or replace one label
    pub fn insert(&mut self, label: impl Into<String>, style: EventStyle) {
        self.styles.insert(label.into(), style);
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl FromIterator<(String, EventStyle)> for EventVocabulary {
    fn from_iter<I: IntoIterator<Item = (String, EventStyle)>>(iter: I) -> Self {
        Self {
            styles: iter.into_iter().collect(),
        }
    }
}

/// Classifies event labels against a vocabulary
#[derive(Debug, Clone)]
pub struct EventClassifier {
    vocabulary: EventVocabulary,
}

impl EventClassifier {
    pub fn new(vocabulary: EventVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Style for `label`, or `None` when the record gets no marker.
    ///
    /// Labels are compared after trimming, case-sensitively.
    pub fn classify(&self, label: Option<&str>) -> Option<&EventStyle> {
        let label = label?.trim();
        self.vocabulary.styles.get(label)
    }

    pub fn vocabulary(&self) -> &EventVocabulary {
        &self.vocabulary
    }
}
