//! Dashboard session controller
//!
//! The only component holding mutable state. Each request (a navigation
//! command or a re-import) reads the current state, computes the next one and
//! returns freshly projected chart payloads. Failed requests leave the active
//! dataset and cursor exactly as they were.

use crate::config::DashboardConfig;
use crate::day_index::DayIndex;
use crate::error::DashboardError;
use crate::layout::Variant;
use crate::parser::{ParseOutcome, RecordParser};
use crate::projector::ChartProjector;
use crate::source::RowSource;
use crate::types::{DailyChartPayload, Dataset, OverallChartPayload, ParseWarning, RawRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A single user interaction
#[derive(Debug, Clone)]
pub enum Command {
    Previous,
    Next,
    First,
    Last,
    GoTo(NaiveDate),
    Reimport(Vec<RawRow>),
    /// Several exports of the same log, merged into one history
    ReimportBatches(Vec<Vec<RawRow>>),
}

/// Everything the rendering layer needs after one request
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub session_id: Uuid,
    /// Selected day as `YYYY-MM-DD`
    pub day_label: String,
    pub day: NaiveDate,
    pub cursor: usize,
    pub day_count: usize,
    /// Previous is a no-op
    pub at_first: bool,
    /// Next is a no-op
    pub at_last: bool,
    pub variant: Variant,
    pub daily: DailyChartPayload,
    pub overall: OverallChartPayload,
    /// Set when the parse that produced the active dataset dropped rows
    pub warning: Option<ParseWarning>,
}

/// State that exists once a dataset has been loaded
#[derive(Debug)]
struct LoadedData {
    dataset: Dataset,
    index: DayIndex,
    projector: ChartProjector,
    warning: Option<ParseWarning>,
}

/// Session-scoped dashboard state machine
#[derive(Debug)]
pub struct DashboardController {
    session_id: Uuid,
    config: DashboardConfig,
    parser: RecordParser,
    loaded: Option<LoadedData>,
}

impl DashboardController {
    /// Start a session with no data; navigation fails until a load succeeds
    pub fn new(config: DashboardConfig) -> Self {
        let parser = config.parser();
        Self {
            session_id: Uuid::new_v4(),
            config,
            parser,
            loaded: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.loaded.as_ref().map(|l| &l.dataset)
    }

    pub fn day_index(&self) -> Option<&DayIndex> {
        self.loaded.as_ref().map(|l| &l.index)
    }

    /// Dispatch one command
    pub fn handle(&mut self, command: Command) -> Result<DashboardView, DashboardError> {
        match command {
            Command::Previous => self.previous(),
            Command::Next => self.next(),
            Command::First => self.first(),
            Command::Last => self.last(),
            Command::GoTo(date) => self.go_to_date(date),
            Command::Reimport(rows) => self.reimport(&rows),
            Command::ReimportBatches(batches) => self.reimport_batches(&batches),
        }
    }

    pub fn previous(&mut self) -> Result<DashboardView, DashboardError> {
        self.navigate(DayIndex::go_previous)
    }

    pub fn next(&mut self) -> Result<DashboardView, DashboardError> {
        self.navigate(DayIndex::go_next)
    }

    pub fn first(&mut self) -> Result<DashboardView, DashboardError> {
        self.navigate(DayIndex::go_first)
    }

    pub fn last(&mut self) -> Result<DashboardView, DashboardError> {
        self.navigate(DayIndex::go_last)
    }

    /// Jump to a specific day; unknown days leave the cursor where it was
    pub fn go_to_date(&mut self, date: NaiveDate) -> Result<DashboardView, DashboardError> {
        let loaded = self.loaded_mut()?;
        if !loaded.index.go_to_date(date) {
            return Err(DashboardError::UnknownDay(date));
        }
        self.view()
    }

    /// Recompute the payloads for the current cursor
    pub fn view(&self) -> Result<DashboardView, DashboardError> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or(DashboardError::EmptyDataset { dropped: 0 })?;
        let day = loaded.index.current_day()?;

        Ok(DashboardView {
            session_id: self.session_id,
            day_label: day.format("%Y-%m-%d").to_string(),
            day,
            cursor: loaded.index.cursor(),
            day_count: loaded.index.len(),
            at_first: loaded.index.is_at_first(),
            at_last: loaded.index.is_at_last(),
            variant: loaded.projector.layout().variant,
            daily: loaded.projector.project_daily(&loaded.dataset, day),
            overall: loaded.projector.project_overall(&loaded.dataset, Some(day)),
            warning: loaded.warning.clone(),
        })
    }

    /// Replace the dataset with freshly imported rows.
    ///
    /// If no row survives parsing the previous dataset stays active and
    /// [`DashboardError::EmptyDataset`] is returned.
    pub fn reimport(&mut self, rows: &[RawRow]) -> Result<DashboardView, DashboardError> {
        let outcome = self.parser.parse(rows);
        self.apply(outcome)
    }

    /// Fetch rows from `source` and re-import them. A fetch failure is
    /// returned verbatim and leaves the active dataset untouched.
    pub fn reimport_from(&mut self, source: &dyn RowSource) -> Result<DashboardView, DashboardError> {
        let rows = fetch_rows(source)?;
        self.reimport(&rows)
    }

    /// Replace the dataset with the merge of several row batches.
    ///
    /// Each batch is parsed on its own; the dropped counts add up into a
    /// single warning. Fails like [`DashboardController::reimport`] when no
    /// batch yields a valid row.
    pub fn reimport_batches(&mut self, batches: &[Vec<RawRow>]) -> Result<DashboardView, DashboardError> {
        let outcome = batches
            .iter()
            .map(|rows| self.parser.parse(rows))
            .fold(ParseOutcome::default(), ParseOutcome::merge);
        self.apply(outcome)
    }

    /// Fetch every source and re-import the merged rows. Any fetch failure
    /// aborts the whole import and leaves the active dataset untouched.
    pub fn reimport_from_all(&mut self, sources: &[&dyn RowSource]) -> Result<DashboardView, DashboardError> {
        let batches = fetch_all(sources)?;
        self.reimport_batches(&batches)
    }

    fn apply(&mut self, outcome: ParseOutcome) -> Result<DashboardView, DashboardError> {
        let warning = outcome.warning();
        let dropped = outcome.dropped_count();
        let dataset = outcome.dataset;

        if dataset.is_empty() {
            warn!(
                session = %self.session_id,
                rows = outcome.total_rows,
                dropped,
                "re-import produced no valid rows, keeping previous dataset"
            );
            return Err(DashboardError::EmptyDataset { dropped });
        }

        let projector = self.config.projector_for(&dataset);
        let index = DayIndex::new(&dataset, self.config.start_at);

        info!(
            session = %self.session_id,
            records = dataset.len(),
            days = index.len(),
            dropped,
            variant = projector.layout().variant.as_str(),
            "dataset loaded"
        );

        self.loaded = Some(LoadedData {
            dataset,
            index,
            projector,
            warning,
        });
        self.view()
    }

    fn navigate(&mut self, step: fn(&mut DayIndex)) -> Result<DashboardView, DashboardError> {
        let loaded = self.loaded_mut()?;
        step(&mut loaded.index);
        debug!(cursor = loaded.index.cursor(), "navigated");
        self.view()
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedData, DashboardError> {
        self.loaded
            .as_mut()
            .ok_or(DashboardError::EmptyDataset { dropped: 0 })
    }
}

fn fetch_rows(source: &dyn RowSource) -> Result<Vec<RawRow>, DashboardError> {
    source.fetch().map_err(|e| {
        warn!(source = %source.describe(), error = %e, "source fetch failed");
        e
    })
}

fn fetch_all(sources: &[&dyn RowSource]) -> Result<Vec<Vec<RawRow>>, DashboardError> {
    sources.iter().map(|source| fetch_rows(*source)).collect()
}

/// Thread-safe handle to one session.
///
/// Every command runs under a single lock acquisition, so concurrent callers
/// never interleave cursor updates. Source fetching happens outside the lock;
/// when two re-imports overlap, the one that finishes last wins.
#[derive(Debug, Clone)]
pub struct SharedDashboard {
    inner: Arc<Mutex<DashboardController>>,
}

impl SharedDashboard {
    pub fn new(controller: DashboardController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn handle(&self, command: Command) -> Result<DashboardView, DashboardError> {
        self.lock().handle(command)
    }

    pub fn view(&self) -> Result<DashboardView, DashboardError> {
        self.lock().view()
    }

    pub fn reimport_from(&self, source: &dyn RowSource) -> Result<DashboardView, DashboardError> {
        let rows = fetch_rows(source)?;
        self.handle(Command::Reimport(rows))
    }

    pub fn reimport_from_all(&self, sources: &[&dyn RowSource]) -> Result<DashboardView, DashboardError> {
        let batches = fetch_all(sources)?;
        self.handle(Command::ReimportBatches(batches))
    }

    fn lock(&self) -> MutexGuard<'_, DashboardController> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_index::CursorDefault;
    use crate::layout::ANGLE_COLUMN;
    use crate::types::RawValue;
    use pretty_assertions::assert_eq;

    fn row(datetime: &str, angle: f64, event: &str) -> RawRow {
        let mut row = RawRow::new();
        row.insert("Datetime".to_string(), RawValue::from(datetime));
        row.insert(ANGLE_COLUMN.to_string(), RawValue::Number(angle));
        row.insert("Events".to_string(), RawValue::from(event));
        row
    }

    fn scenario_rows() -> Vec<RawRow> {
        vec![
            row("24/09/2024 08:00", 45.0, "Rest"),
            row("24/09/2024 20:00", 90.0, ""),
            row("25/09/2024 09:00", 60.0, "Move"),
        ]
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn loaded_controller() -> DashboardController {
        let mut controller = DashboardController::new(DashboardConfig {
            variant: Some(Variant::AngleSwelling),
            ..DashboardConfig::default()
        });
        controller.reimport(&scenario_rows()).unwrap();
        controller
    }

    struct FailingSource;

    impl RowSource for FailingSource {
        fn describe(&self) -> String {
            "https://example.invalid/sheet".to_string()
        }

        fn fetch(&self) -> Result<Vec<RawRow>, DashboardError> {
            Err(DashboardError::SourceFetch("connection refused".to_string()))
        }
    }

    struct StaticSource(Vec<RawRow>);

    impl RowSource for StaticSource {
        fn describe(&self) -> String {
            "static".to_string()
        }

        fn fetch(&self) -> Result<Vec<RawRow>, DashboardError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_three_row_scenario() {
        let mut controller = loaded_controller();

        let view = controller.view().unwrap();
        assert_eq!(view.day_count, 2);
        assert_eq!(view.cursor, 1);
        assert_eq!(view.day_label, "2024-09-25");
        assert_eq!(
            controller.day_index().unwrap().days(),
            &[day(24), day(25)]
        );

        let view = controller.previous().unwrap();
        assert_eq!(view.cursor, 0);
        assert_eq!(view.day, day(24));
        assert_eq!(view.daily.series[0].points.len(), 2);
        assert_eq!(view.daily.vertical_markers.len(), 1);
        assert!(view.warning.is_none());
    }

    #[test]
    fn test_boundary_navigation_is_silent() {
        let mut controller = loaded_controller();

        let view = controller.next().unwrap();
        assert_eq!(view.cursor, 1);
        assert!(view.at_last);

        controller.first().unwrap();
        let view = controller.previous().unwrap();
        assert_eq!(view.cursor, 0);

        let view = controller.last().unwrap();
        assert_eq!(view.cursor, 1);
    }

    #[test]
    fn test_navigation_before_load() {
        let mut controller = DashboardController::new(DashboardConfig::default());

        assert!(matches!(
            controller.next(),
            Err(DashboardError::EmptyDataset { .. })
        ));
        assert!(controller.view().is_err());
        assert!(controller.dataset().is_none());
    }

    #[test]
    fn test_empty_reimport_keeps_previous_view() {
        let mut controller = loaded_controller();
        let before = controller.previous().unwrap();

        let bad_rows = vec![row("not a date", 10.0, "Rest"), row("31/02/2024 10:00", 20.0, "")];
        let err = controller.reimport(&bad_rows).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyDataset { dropped: 2 }));

        let after = controller.view().unwrap();
        assert_eq!(after.cursor, before.cursor);
        assert_eq!(after.daily, before.daily);
        assert_eq!(after.overall, before.overall);
        assert_eq!(controller.dataset().unwrap().len(), 3);
    }

    #[test]
    fn test_fetch_error_keeps_previous_view() {
        let mut controller = loaded_controller();
        let before = controller.view().unwrap();

        let err = controller.reimport_from(&FailingSource).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load source: connection refused");
        assert_eq!(controller.view().unwrap().daily, before.daily);
    }

    #[test]
    fn test_reimport_surfaces_warning_and_resets_cursor() {
        let mut controller = loaded_controller();
        controller.first().unwrap();

        let mut rows = scenario_rows();
        rows.push(row("26/09/2024 07:30", 70.0, ""));
        rows.push(row("31/02/2024 10:00", 20.0, ""));

        let view = controller.reimport_from(&StaticSource(rows)).unwrap();
        assert_eq!(view.day_count, 3);
        assert_eq!(view.cursor, 2);
        assert_eq!(view.day, day(26));
        let warning = view.warning.unwrap();
        assert_eq!(warning.dropped, 1);

        // The warning belongs to the active dataset and stays visible while navigating
        assert!(controller.previous().unwrap().warning.is_some());
    }

    #[test]
    fn test_dropped_rows_excluded_everywhere() {
        let mut controller = loaded_controller();
        let mut rows = scenario_rows();
        rows.push(row("23/09/2024 25:00", 99.0, "Exercise"));

        let view = controller.reimport(&rows).unwrap();
        assert_eq!(view.day_count, 2);
        assert_eq!(view.overall.series[0].points.len(), 3);
        assert!(view
            .overall
            .series[0]
            .points
            .iter()
            .all(|p| p.y != 99.0));
        assert_eq!(view.warning.unwrap().dropped, 1);
    }

    #[test]
    fn test_go_to_date() {
        let mut controller = loaded_controller();

        let view = controller.handle(Command::GoTo(day(24))).unwrap();
        assert_eq!(view.cursor, 0);

        let err = controller.go_to_date(day(30)).unwrap_err();
        assert!(matches!(err, DashboardError::UnknownDay(d) if d == day(30)));
        assert_eq!(controller.view().unwrap().cursor, 0);
    }

    #[test]
    fn test_start_at_first() {
        let mut controller = DashboardController::new(DashboardConfig {
            start_at: CursorDefault::First,
            ..DashboardConfig::default()
        });

        let view = controller.reimport(&scenario_rows()).unwrap();
        assert_eq!(view.cursor, 0);
        assert!(view.at_first);
        assert!(!view.at_last);
        // No swelling column and no pinned variant: detected as angle-only
        assert_eq!(view.variant, Variant::AngleOnly);
        assert_eq!(view.daily.vertical_markers.len(), 1);
    }

    #[test]
    fn test_three_row_scenario_with_default_config() {
        let mut controller = DashboardController::new(DashboardConfig::default());
        controller.reimport(&scenario_rows()).unwrap();

        let view = controller.previous().unwrap();
        assert_eq!(view.day, day(24));
        assert_eq!(view.daily.series[0].points.len(), 2);
        assert_eq!(view.daily.vertical_markers.len(), 1);
        assert_eq!(view.daily.vertical_markers[0].color, "green");
        assert_eq!(view.daily.vertical_markers[0].tooltip, "Rest");
    }

    #[test]
    fn test_merged_sources() {
        let mut controller = DashboardController::new(DashboardConfig::default());
        let earlier = StaticSource(vec![
            row("22/09/2024 08:00", 30.0, "Rest"),
            row("31/02/2024 10:00", 20.0, ""),
        ]);
        let later = StaticSource(vec![
            row("25/09/2024 09:00", 60.0, "Move"),
            row("24/09/2024 08:00", 45.0, ""),
            row("24/09/2024 25:00", 50.0, ""),
        ]);

        let view = controller.reimport_from_all(&[&later, &earlier]).unwrap();
        assert_eq!(
            controller.day_index().unwrap().days(),
            &[day(22), day(24), day(25)]
        );
        assert_eq!(view.day_count, 3);
        assert_eq!(view.day, day(25));
        assert_eq!(view.overall.series[0].points.len(), 3);
        assert_eq!(view.warning.unwrap().dropped, 2);

        let before = controller.view().unwrap();
        let err = controller
            .reimport_from_all(&[&earlier, &FailingSource])
            .unwrap_err();
        assert_eq!(err.code(), "SOURCE_FETCH_ERROR");
        assert_eq!(controller.view().unwrap().day_count, before.day_count);
    }

    #[test]
    fn test_view_serializes() {
        let view = loaded_controller().view().unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["day_label"], "2024-09-25");
        assert_eq!(json["variant"], "angle_swelling");
        assert_eq!(json["daily"]["x_range"]["start"], "2024-09-25T00:00:00");
        assert_eq!(json["daily"]["vertical_markers"][0]["dash"], "dash");
        assert!(json["warning"].is_null());
    }

    #[test]
    fn test_shared_dashboard_across_threads() {
        let shared = SharedDashboard::new(loaded_controller());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let command = if i % 2 == 0 { Command::Next } else { Command::Previous };
                        let view = shared.handle(command).unwrap();
                        assert!(view.cursor < view.day_count);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let view = shared.view().unwrap();
        assert!(view.cursor < 2);

        let err = shared.reimport_from(&FailingSource).unwrap_err();
        assert_eq!(err.code(), "SOURCE_FETCH_ERROR");
        assert_eq!(shared.view().unwrap().day_count, 2);
    }
}
