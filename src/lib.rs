//! Physio Dash - Day-by-day dashboard for physiotherapy recovery logs
//!
//! Physio Dash turns spreadsheet rows of timestamped joint measurements into
//! declarative chart payloads through a deterministic pipeline:
//! row parsing → day indexing → event classification → chart projection.
//!
//! ## Modules
//!
//! - **Parsing**: raw rows into validated, date-partitioned records
//! - **Navigation**: a clamped cursor over the distinct days of a dataset
//! - **Projection**: daily and overall chart payloads on fixed axes
//! - **Controller**: the session state machine tying the above together

pub mod config;
pub mod controller;
pub mod day_index;
pub mod error;
pub mod events;
pub mod layout;
pub mod parser;
pub mod projector;
pub mod source;
pub mod types;

pub use config::DashboardConfig;
pub use controller::{Command, DashboardController, DashboardView, SharedDashboard};
pub use day_index::{CursorDefault, DayIndex};
pub use error::{DashboardError, RowParseError};
pub use events::{EventClassifier, EventStyle, EventVocabulary};
pub use layout::{MetricLayout, Variant};
pub use parser::{ParseOutcome, RecordParser};
pub use projector::ChartProjector;
pub use source::{FileSource, RowFormat, RowSource};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "physio-dash";
