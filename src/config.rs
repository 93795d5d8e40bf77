//! Dashboard configuration
//!
//! Configuration is resolved in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (`~/.config/physio-dash/config.toml` or an explicit path)
//! 3. Built-in defaults (lowest priority)

use crate::day_index::CursorDefault;
use crate::error::DashboardError;
use crate::events::EventVocabulary;
use crate::layout::{MetricLayout, Variant};
use crate::parser::{
    RecordParser, DEFAULT_DATETIME_COLUMN, DEFAULT_DATETIME_FORMAT, DEFAULT_DETAILS_COLUMN,
    DEFAULT_EVENT_COLUMN,
};
use crate::projector::ChartProjector;
use crate::types::{DashStyle, Dataset, ReferenceLine};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_VARIANT: &str = "PHYSIO_DASH_VARIANT";
pub const ENV_START_AT: &str = "PHYSIO_DASH_START_AT";
pub const ENV_LOG_LEVEL: &str = "PHYSIO_DASH_LOG_LEVEL";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Resolved dashboard configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Log layout; `None` detects it from each loaded dataset
    pub variant: Option<Variant>,
    /// Cursor position after every (re)load
    pub start_at: CursorDefault,
    pub datetime_column: String,
    pub datetime_format: String,
    pub event_column: String,
    pub details_column: String,
    /// Overlay the selected day on the trend chart
    pub highlight_current_day: bool,
    pub reference_line: Option<ReferenceLine>,
    /// Replaces the layout's event vocabulary when set
    pub events: Option<EventVocabulary>,
    pub logging: LoggingConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            variant: None,
            start_at: CursorDefault::Last,
            datetime_column: DEFAULT_DATETIME_COLUMN.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            event_column: DEFAULT_EVENT_COLUMN.to_string(),
            details_column: DEFAULT_DETAILS_COLUMN.to_string(),
            highlight_current_day: true,
            reference_line: None,
            events: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Reference line as written in the config file
#[derive(Debug, Deserialize)]
struct FileReferenceLine {
    y: f64,
    label: Option<String>,
    color: Option<String>,
    dash: Option<DashStyle>,
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
struct FileLogging {
    level: Option<String>,
}

/// Config file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    variant: Option<Variant>,
    start_at: Option<CursorDefault>,
    datetime_column: Option<String>,
    datetime_format: Option<String>,
    event_column: Option<String>,
    details_column: Option<String>,
    highlight_current_day: Option<bool>,

    /// Optional [reference_line] section
    reference_line: Option<FileReferenceLine>,

    /// Optional [events] section: label = { color, dash, width }
    events: Option<EventVocabulary>,

    /// Optional [logging] section
    logging: Option<FileLogging>,
}

impl DashboardConfig {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("physio-dash").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist and parse. Without one, the default
    /// location is used if present; a broken default file is logged and
    /// ignored. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, DashboardError> {
        let (config, ignored) = Self::resolve(path)?;
        if let Some(e) = ignored {
            warn!(error = %e, "ignoring invalid config file");
        }
        Ok(config)
    }

    /// Like [`DashboardConfig::load`], but hands back the error of an ignored
    /// default file instead of logging it. Callers that install logging from
    /// the resolved config use this to report the problem afterwards.
    pub fn resolve(path: Option<&Path>) -> Result<(Self, Option<DashboardError>), DashboardError> {
        Self::resolve_with(path, Self::config_path(), |key| std::env::var(key).ok())
    }

    fn resolve_with<F>(
        path: Option<&Path>,
        default_path: Option<PathBuf>,
        lookup: F,
    ) -> Result<(Self, Option<DashboardError>), DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, ignored) = match path {
            Some(path) => (Self::read_file(path)?, None),
            None => match default_path.filter(|p| p.exists()) {
                Some(default_path) => match Self::read_file(&default_path) {
                    Ok(config) => (config, None),
                    Err(e) => (Self::default(), Some(e)),
                },
                None => (Self::default(), None),
            },
        };

        config.apply_env_from(lookup)?;
        Ok((config, ignored))
    }

    fn read_file(path: &Path) -> Result<Self, DashboardError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            DashboardError::Config(message) => {
                DashboardError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, DashboardError> {
        let file: FileConfig =
            toml::from_str(contents).map_err(|e| DashboardError::Config(e.to_string()))?;

        let defaults = Self::default();
        let reference_line = file.reference_line.map(|line| ReferenceLine {
            y: line.y,
            label: line.label,
            color: line.color.unwrap_or_else(|| "gray".to_string()),
            dash: line.dash.unwrap_or(DashStyle::Dot),
        });

        let events = file.events.filter(|vocabulary| !vocabulary.is_empty());

        Ok(Self {
            variant: file.variant,
            start_at: file.start_at.unwrap_or(defaults.start_at),
            datetime_column: file.datetime_column.unwrap_or(defaults.datetime_column),
            datetime_format: file.datetime_format.unwrap_or(defaults.datetime_format),
            event_column: file.event_column.unwrap_or(defaults.event_column),
            details_column: file.details_column.unwrap_or(defaults.details_column),
            highlight_current_day: file
                .highlight_current_day
                .unwrap_or(defaults.highlight_current_day),
            reference_line,
            events,
            logging: LoggingConfig {
                level: file
                    .logging
                    .and_then(|l| l.level)
                    .unwrap_or(defaults.logging.level),
            },
        })
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_VARIANT) {
            self.variant = match value.trim() {
                "" | "auto" => None,
                other => Some(other.parse()?),
            };
        }
        if let Some(value) = lookup(ENV_START_AT) {
            self.start_at = value.parse()?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = value;
        }
        Ok(())
    }

    /// Record parser for the configured columns
    pub fn parser(&self) -> RecordParser {
        RecordParser::new()
            .with_datetime(&self.datetime_column, &self.datetime_format)
            .with_event_columns(&self.event_column, &self.details_column)
    }

    /// Layout for a dataset: the pinned variant, or the detected one
    pub fn layout_for(&self, dataset: &Dataset) -> MetricLayout {
        match self.variant {
            Some(variant) => MetricLayout::for_variant(variant),
            None => MetricLayout::detect(dataset),
        }
    }

    /// Chart projector for a dataset
    pub fn projector_for(&self, dataset: &Dataset) -> ChartProjector {
        let mut projector = ChartProjector::new(self.layout_for(dataset))
            .with_highlight(self.highlight_current_day)
            .with_reference_line(self.reference_line.clone());
        if let Some(vocabulary) = &self.events {
            projector = projector.with_vocabulary(vocabulary.clone());
        }
        projector
    }
}
