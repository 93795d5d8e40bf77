//! Chart projection
//!
//! Derives the declarative chart payloads from the dataset:
//! - the daily view: one day's samples on fixed axes with event markers
//! - the overall view: the full-history trend of the primary metric
//!
//! Axis ranges come from the layout table and never from the data, so
//! consecutive days and the two views stay visually comparable.

use crate::events::{EventClassifier, EventVocabulary};
use crate::layout::MetricLayout;
use crate::types::{
    DailyChartPayload, Dataset, OverallChartPayload, Panel, Point, Record, ReferenceLine, Series,
    TimeRange, TooltipPoint, VerticalMarker,
};
use chrono::NaiveDate;

/// Name of the overlay series marking the selected day on the trend chart
pub const SELECTED_DAY_SERIES: &str = "Selected day";

/// Chart projector for one layout
#[derive(Debug, Clone)]
pub struct ChartProjector {
    layout: MetricLayout,
    classifier: EventClassifier,
    highlight_current_day: bool,
    reference_line: Option<ReferenceLine>,
}

impl ChartProjector {
    /// Projector using the layout's own event vocabulary
    pub fn new(layout: MetricLayout) -> Self {
        let classifier = EventClassifier::new(layout.events.clone());
        Self {
            layout,
            classifier,
            highlight_current_day: true,
            reference_line: None,
        }
    }

    /// Replace the event vocabulary
    pub fn with_vocabulary(mut self, vocabulary: EventVocabulary) -> Self {
        self.classifier = EventClassifier::new(vocabulary);
        self
    }

    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.highlight_current_day = enabled;
        self
    }

    pub fn with_reference_line(mut self, line: Option<ReferenceLine>) -> Self {
        self.reference_line = line;
        self
    }

    pub fn layout(&self) -> &MetricLayout {
        &self.layout
    }

    /// Payload for a single day.
    ///
    /// Panels and series are the same for every day of a dataset; a day with
    /// no samples yields series without points rather than an error.
    pub fn project_daily(&self, dataset: &Dataset, day: NaiveDate) -> DailyChartPayload {
        let records = dataset.records_on(day);

        let panels: Vec<Panel> = self
            .layout
            .panels
            .iter()
            .map(|p| Panel {
                title: p.title.clone(),
                y_range: p.y_range,
            })
            .collect();

        let series = self
            .layout
            .series
            .iter()
            .filter(|descriptor| dataset.has_metric(&descriptor.column))
            .map(|descriptor| Series {
                name: descriptor.name.clone(),
                panel: descriptor.panel,
                points: points_for(records, &descriptor.column),
                marker: descriptor.marker.clone(),
            })
            .collect();

        let mut vertical_markers = Vec::new();
        let mut tooltips = Vec::new();

        for record in records {
            let Some(style) = self.classifier.classify(record.event_label.as_deref()) else {
                continue;
            };

            let text = record
                .event_details
                .clone()
                .or_else(|| record.event_label.clone())
                .unwrap_or_default();

            vertical_markers.push(VerticalMarker {
                x: record.timestamp,
                color: style.color.clone(),
                width: style.width,
                dash: style.dash,
                tooltip: text.clone(),
            });

            // Hover target at the top of every panel the line crosses
            for (index, panel) in panels.iter().enumerate() {
                tooltips.push(TooltipPoint {
                    panel: index,
                    x: record.timestamp,
                    y: panel.y_range.max,
                    color: style.color.clone(),
                    text: text.clone(),
                });
            }
        }

        DailyChartPayload {
            title: format!("Data for {}", day.format("%Y-%m-%d")),
            day,
            x_range: TimeRange::whole_day(day),
            panels,
            series,
            vertical_markers,
            tooltips,
        }
    }

    /// Payload for the full-history trend, optionally highlighting `current_day`
    pub fn project_overall(
        &self,
        dataset: &Dataset,
        current_day: Option<NaiveDate>,
    ) -> OverallChartPayload {
        let trend = &self.layout.trend;

        let mut series = vec![Series {
            name: trend.name.clone(),
            panel: 0,
            points: points_for(dataset.records(), &trend.column),
            marker: trend.marker.clone(),
        }];

        if let Some(day) = current_day.filter(|_| self.highlight_current_day) {
            series.push(Series {
                name: SELECTED_DAY_SERIES.to_string(),
                panel: 0,
                points: points_for(dataset.records_on(day), &trend.column),
                marker: trend.highlight.clone(),
            });
        }

        let days = dataset.days();
        let x_range = match (days.first(), days.last()) {
            (Some(first), Some(last)) => Some(TimeRange::spanning_days(*first, *last)),
            _ => None,
        };

        OverallChartPayload {
            title: trend.name.clone(),
            series,
            x_range,
            y_range: self.layout.panel_range(trend.panel),
            reference_line: self.reference_line.clone(),
        }
    }
}

fn points_for(records: &[Record], column: &str) -> Vec<Point> {
    records
        .iter()
        .filter_map(|r| {
            r.metric(column).map(|y| Point {
                x: r.timestamp,
                y,
            })
        })
        .collect()
}
