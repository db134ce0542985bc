//! Report model types: column references, filters, chart configuration and
//! the persisted report definition.

pub mod chart;
pub mod column;
pub mod filter;
pub mod report;

pub use chart::{Aggregation, ChartConfig, ChartError, ChartType, DateGrouping};
pub use column::{is_identifier, parse_columns, ColumnRef, ColumnRefError};
pub use filter::{Filter, FilterOperator, FilterValue, TriState};
pub use report::{ReportDefinition, ReportError, ReportId};

/// One result row, keyed by the qualified column name (`title`, `users.name`).
pub type Row = serde_json::Map<String, serde_json::Value>;
