//! Query planner - converts report configuration into executable plans.
//!
//! Two compilation modes:
//! 1. Row queries: base entity + columns + filters → [`QueryPlan`] with
//!    one-hop LEFT joins resolved by [`JoinBuilder`].
//! 2. Scalar metrics: entity + field + aggregation → [`ScalarQueryPlan`].

pub mod compiler;
pub mod join_builder;
pub mod plan;

pub use compiler::{QueryCompiler, DEFAULT_ROW_LIMIT};
pub use join_builder::JoinBuilder;
pub use plan::{
    JoinStep, JoinType, MetricField, Predicate, Projection, QueryPlan, ScalarQueryPlan,
    TableColumn,
};

use crate::model::{Aggregation, ChartError, ColumnRefError, FilterOperator};
use crate::schema::SchemaError;
use thiserror::Error;

/// Errors that can occur while resolving joins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no direct relationship from '{base}' to '{related}'{}", route_hint(.route))]
    NoDirectRelationship {
        base: String,
        related: String,
        /// Multi-hop route that exists but is not joinable.
        route: Option<Vec<String>>,
    },
}

fn route_hint(route: &Option<Vec<String>>) -> String {
    match route {
        Some(path) if path.len() > 2 => format!(
            " (reachable only via {}; multi-hop joins are not supported)",
            path.join(" -> ")
        ),
        _ => String::new(),
    }
}

pub type JoinResult<T> = Result<T, JoinError>;

/// Errors that can occur during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Join error: {0}")]
    Join(JoinError),

    #[error("Invalid column reference: {0}")]
    InvalidColumn(#[from] ColumnRefError),

    #[error("Invalid chart: {0}")]
    Chart(#[from] ChartError),

    #[error("At least one column must be selected")]
    NoColumns,

    #[error("'*' can only be used with count, not {0}")]
    WildcardAggregation(Aggregation),

    #[error("Metric field '{0}' must belong to the metric's own entity")]
    QualifiedMetricField(String),

    #[error("Invalid filter on '{field}' ({operator}): {reason}")]
    InvalidFilter {
        field: String,
        operator: FilterOperator,
        reason: String,
    },
}

impl From<JoinError> for CompileError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::Schema(e) => CompileError::Schema(e),
            other => CompileError::Join(other),
        }
    }
}

impl CompileError {
    /// What the user sees; the detail goes to the log.
    pub fn user_message(&self) -> &'static str {
        "invalid report configuration"
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
