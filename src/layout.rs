//! Metric layouts
//!
//! The three log layouts (angle only, angle + swelling, angle + three-point
//! circumference) differ only in which columns are plotted, on which panel,
//! and with which fixed value range. This module describes each layout as a
//! table of panel and series rows consumed by the chart projector.

use crate::error::DashboardError;
use crate::events::EventVocabulary;
use crate::types::{AxisRange, Dataset, MarkerStyle, MarkerSymbol};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ANGLE_COLUMN: &str = "Angle [deg]";
pub const SWELLING_COLUMN: &str = "Swelling";
pub const CIRC_LOW_COLUMN: &str = "Circ low [cm]";
pub const CIRC_MED_COLUMN: &str = "Circ med [cm]";
pub const CIRC_HIGH_COLUMN: &str = "Circ high [cm]";

/// Every metric column any layout knows how to plot
pub const KNOWN_METRIC_COLUMNS: &[&str] = &[
    ANGLE_COLUMN,
    SWELLING_COLUMN,
    CIRC_LOW_COLUMN,
    CIRC_MED_COLUMN,
    CIRC_HIGH_COLUMN,
];

const ANGLE_RANGE: AxisRange = AxisRange::new(0.0, 100.0);
const SWELLING_RANGE: AxisRange = AxisRange::new(0.0, 20.0);
const CIRCUMFERENCE_RANGE: AxisRange = AxisRange::new(30.0, 60.0);

/// Log layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    AngleOnly,
    AngleSwelling,
    AngleCircumference,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::AngleOnly => "angle_only",
            Variant::AngleSwelling => "angle_swelling",
            Variant::AngleCircumference => "angle_circumference",
        }
    }

    /// Pick the layout from the metric columns present.
    ///
    /// Circumference columns win over `Swelling`; with neither the log is
    /// treated as angle-only.
    pub fn detect_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Variant {
        let mut variant = Variant::AngleOnly;
        for column in columns {
            match column {
                CIRC_LOW_COLUMN | CIRC_MED_COLUMN | CIRC_HIGH_COLUMN => {
                    return Variant::AngleCircumference
                }
                SWELLING_COLUMN => variant = Variant::AngleSwelling,
                _ => {}
            }
        }
        variant
    }

    pub fn detect(dataset: &Dataset) -> Variant {
        let columns = dataset.metric_columns();
        Variant::detect_columns(columns.iter().map(String::as_str))
    }
}

impl FromStr for Variant {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angle_only" | "angle-only" | "angle" => Ok(Variant::AngleOnly),
            "angle_swelling" | "angle-swelling" | "swelling" => Ok(Variant::AngleSwelling),
            "angle_circumference" | "angle-circumference" | "circumference" => {
                Ok(Variant::AngleCircumference)
            }
            other => Err(DashboardError::Config(format!("unknown variant: {other}"))),
        }
    }
}

/// Table row for a panel
struct PanelRow {
    title: &'static str,
    range: AxisRange,
}

/// Table row for a plotted metric
struct SeriesRow {
    column: &'static str,
    name: &'static str,
    panel: usize,
    symbol: MarkerSymbol,
    color: &'static str,
    outline: &'static str,
}

const ANGLE_PANEL: PanelRow = PanelRow {
    title: "Angle (degrees)",
    range: ANGLE_RANGE,
};

const ANGLE_SERIES: SeriesRow = SeriesRow {
    column: ANGLE_COLUMN,
    name: "Angle (degrees)",
    panel: 0,
    symbol: MarkerSymbol::Circle,
    color: "blue",
    outline: "darkblue",
};

const ANGLE_ONLY_PANELS: &[PanelRow] = &[ANGLE_PANEL];
const ANGLE_ONLY_SERIES: &[SeriesRow] = &[ANGLE_SERIES];

const ANGLE_SWELLING_PANELS: &[PanelRow] = &[
    ANGLE_PANEL,
    PanelRow {
        title: "Swelling (dimensionless)",
        range: SWELLING_RANGE,
    },
];
const ANGLE_SWELLING_SERIES: &[SeriesRow] = &[
    ANGLE_SERIES,
    SeriesRow {
        column: SWELLING_COLUMN,
        name: "Swelling (dimensionless)",
        panel: 1,
        symbol: MarkerSymbol::Diamond,
        color: "red",
        outline: "black",
    },
];

const ANGLE_CIRCUMFERENCE_PANELS: &[PanelRow] = &[
    ANGLE_PANEL,
    PanelRow {
        title: "Circumference (cm)",
        range: CIRCUMFERENCE_RANGE,
    },
];
const ANGLE_CIRCUMFERENCE_SERIES: &[SeriesRow] = &[
    ANGLE_SERIES,
    SeriesRow {
        column: CIRC_LOW_COLUMN,
        name: "Circumference low (cm)",
        panel: 1,
        symbol: MarkerSymbol::Diamond,
        color: "teal",
        outline: "black",
    },
    SeriesRow {
        column: CIRC_MED_COLUMN,
        name: "Circumference med (cm)",
        panel: 1,
        symbol: MarkerSymbol::Square,
        color: "purple",
        outline: "black",
    },
    SeriesRow {
        column: CIRC_HIGH_COLUMN,
        name: "Circumference high (cm)",
        panel: 1,
        symbol: MarkerSymbol::TriangleUp,
        color: "brown",
        outline: "black",
    },
];

/// One subplot row of the daily chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelDescriptor {
    pub title: String,
    pub y_range: AxisRange,
}

/// One plotted metric of the daily chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    /// Source column in the record's measurements
    pub column: String,
    /// Legend name
    pub name: String,
    /// Index into the layout's panels
    pub panel: usize,
    pub marker: MarkerStyle,
}

/// Metric shown on the overall trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDescriptor {
    pub column: String,
    pub name: String,
    /// Panel whose fixed range the trend chart reuses
    pub panel: usize,
    pub marker: MarkerStyle,
    /// Emphasis style for the selected day's overlay
    pub highlight: MarkerStyle,
}

/// Complete description of one log layout
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLayout {
    pub variant: Variant,
    pub panels: Vec<PanelDescriptor>,
    pub series: Vec<SeriesDescriptor>,
    pub trend: TrendDescriptor,
    /// Event labels classified on the daily chart
    pub events: EventVocabulary,
}

impl MetricLayout {
    pub fn for_variant(variant: Variant) -> Self {
        let (panels, series, events) = match variant {
            Variant::AngleOnly => (
                ANGLE_ONLY_PANELS,
                ANGLE_ONLY_SERIES,
                EventVocabulary::severity(),
            ),
            Variant::AngleSwelling => (
                ANGLE_SWELLING_PANELS,
                ANGLE_SWELLING_SERIES,
                EventVocabulary::activity(),
            ),
            Variant::AngleCircumference => (
                ANGLE_CIRCUMFERENCE_PANELS,
                ANGLE_CIRCUMFERENCE_SERIES,
                EventVocabulary::severity(),
            ),
        };

        Self {
            variant,
            panels: panels
                .iter()
                .map(|p| PanelDescriptor {
                    title: p.title.to_string(),
                    y_range: p.range,
                })
                .collect(),
            series: series
                .iter()
                .map(|s| SeriesDescriptor {
                    column: s.column.to_string(),
                    name: s.name.to_string(),
                    panel: s.panel,
                    marker: MarkerStyle::new(s.symbol, 10, s.color).outlined(s.outline, 2),
                })
                .collect(),
            trend: TrendDescriptor {
                column: ANGLE_COLUMN.to_string(),
                name: "All Angle Data".to_string(),
                panel: 0,
                marker: MarkerStyle::new(MarkerSymbol::Circle, 6, "blue").outlined("darkblue", 1),
                highlight: MarkerStyle::new(MarkerSymbol::Circle, 10, "orange").outlined("black", 2),
            },
            events,
        }
    }

    /// Layout for a log whose variant was not pinned.
    ///
    /// Panels follow the detected variant. Events are classified against the
    /// standard vocabulary, since the metric columns say nothing about which
    /// label set the log uses.
    pub fn detect(dataset: &Dataset) -> Self {
        let mut layout = Self::for_variant(Variant::detect(dataset));
        layout.events = EventVocabulary::standard();
        layout
    }

    /// Range of the panel a series or trend refers to
    pub fn panel_range(&self, panel: usize) -> AxisRange {
        self.panels
            .get(panel)
            .map(|p| p.y_range)
            .unwrap_or(ANGLE_RANGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventClassifier;
    use crate::types::Record;
    use chrono::NaiveDate;

    fn recognizes(layout: &MetricLayout, label: &str) -> bool {
        EventClassifier::new(layout.events.clone())
            .classify(Some(label))
            .is_some()
    }

    #[test]
    fn test_detect_columns() {
        assert_eq!(Variant::detect_columns([ANGLE_COLUMN]), Variant::AngleOnly);
        assert_eq!(
            Variant::detect_columns([ANGLE_COLUMN, SWELLING_COLUMN]),
            Variant::AngleSwelling
        );
        assert_eq!(
            Variant::detect_columns([SWELLING_COLUMN, CIRC_MED_COLUMN]),
            Variant::AngleCircumference
        );
        assert_eq!(Variant::detect_columns(std::iter::empty()), Variant::AngleOnly);
    }

    #[test]
    fn test_detect_from_dataset() {
        let ts = NaiveDate::from_ymd_opt(2024, 9, 24)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let dataset = Dataset::from_records(vec![Record::new(ts)
            .with_metric(ANGLE_COLUMN, 45.0)
            .with_metric(CIRC_LOW_COLUMN, 41.5)]);

        assert_eq!(Variant::detect(&dataset), Variant::AngleCircumference);
    }

    #[test]
    fn test_layout_tables() {
        let layout = MetricLayout::for_variant(Variant::AngleSwelling);
        assert_eq!(layout.panels.len(), 2);
        assert_eq!(layout.panels[0].y_range, AxisRange::new(0.0, 100.0));
        assert_eq!(layout.panels[1].y_range, AxisRange::new(0.0, 20.0));
        assert_eq!(layout.series[1].column, SWELLING_COLUMN);
        assert_eq!(layout.series[1].marker.symbol, MarkerSymbol::Diamond);
        assert!(recognizes(&layout, "Exercise"));

        let layout = MetricLayout::for_variant(Variant::AngleCircumference);
        assert_eq!(layout.series.len(), 4);
        assert!(layout.series[1..].iter().all(|s| s.panel == 1));
        assert!(recognizes(&layout, "H"));
        assert!(!recognizes(&layout, "Rest"));

        let layout = MetricLayout::for_variant(Variant::AngleOnly);
        assert_eq!(layout.panels.len(), 1);
        assert_eq!(layout.trend.column, ANGLE_COLUMN);
    }

    #[test]
    fn test_detected_layout_recognizes_every_standard_label() {
        let ts = NaiveDate::from_ymd_opt(2024, 9, 24)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let dataset = Dataset::from_records(vec![Record::new(ts)
            .with_metric(ANGLE_COLUMN, 45.0)
            .with_event("Rest", None)]);

        let layout = MetricLayout::detect(&dataset);
        assert_eq!(layout.variant, Variant::AngleOnly);
        assert!(recognizes(&layout, "Rest"));
        assert!(recognizes(&layout, "L"));
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("angle-swelling".parse::<Variant>().unwrap(), Variant::AngleSwelling);
        assert_eq!(" Circumference ".parse::<Variant>().unwrap(), Variant::AngleCircumference);
        assert!("knee".parse::<Variant>().is_err());
    }
}
