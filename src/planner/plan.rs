//! Query plan node types.

use serde::Serialize;

use crate::model::{Aggregation, FilterOperator, FilterValue, TriState};
use crate::schema::Relationship;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Left,
}

/// A column on a specific table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableColumn {
    pub table: String,
    pub column: String,
}

impl TableColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Join one related entity onto the base entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    /// Entity being joined.
    pub entity: String,
    /// Alias it is visible under; always the entity name.
    pub alias: String,
    pub join_type: JoinType,
    /// `base.source_column`
    pub left: TableColumn,
    /// `alias.target_column`
    pub right: TableColumn,
    /// Relationship the join was derived from.
    pub relationship: Relationship,
}

/// Projected column in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub source: TableColumn,
    /// Key the value carries in result rows.
    pub output_name: String,
}

/// A compiled filter condition. One variant per filter operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Predicate {
    Eq { column: TableColumn, value: FilterValue },
    Neq { column: TableColumn, value: FilterValue },
    Gt { column: TableColumn, value: FilterValue },
    Gte { column: TableColumn, value: FilterValue },
    Lt { column: TableColumn, value: FilterValue },
    Lte { column: TableColumn, value: FilterValue },
    Like { column: TableColumn, pattern: String },
    Ilike { column: TableColumn, pattern: String },
    Is { column: TableColumn, value: TriState },
}

impl Predicate {
    pub fn column(&self) -> &TableColumn {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::Neq { column, .. }
            | Predicate::Gt { column, .. }
            | Predicate::Gte { column, .. }
            | Predicate::Lt { column, .. }
            | Predicate::Lte { column, .. }
            | Predicate::Like { column, .. }
            | Predicate::Ilike { column, .. }
            | Predicate::Is { column, .. } => column,
        }
    }

    pub fn operator(&self) -> FilterOperator {
        match self {
            Predicate::Eq { .. } => FilterOperator::Eq,
            Predicate::Neq { .. } => FilterOperator::Neq,
            Predicate::Gt { .. } => FilterOperator::Gt,
            Predicate::Gte { .. } => FilterOperator::Gte,
            Predicate::Lt { .. } => FilterOperator::Lt,
            Predicate::Lte { .. } => FilterOperator::Lte,
            Predicate::Like { .. } => FilterOperator::Like,
            Predicate::Ilike { .. } => FilterOperator::Ilike,
            Predicate::Is { .. } => FilterOperator::Is,
        }
    }
}

/// Executable row query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub base_entity: String,
    pub projections: Vec<Projection>,
    pub joins: Vec<JoinStep>,
    pub predicates: Vec<Predicate>,
    pub limit: u64,
}

impl QueryPlan {
    /// The join for `entity`, if the plan has one.
    pub fn join_for(&self, entity: &str) -> Option<&JoinStep> {
        self.joins.iter().find(|j| j.entity == entity)
    }

    /// Output column names, in projection order.
    pub fn output_columns(&self) -> Vec<&str> {
        self.projections
            .iter()
            .map(|p| p.output_name.as_str())
            .collect()
    }
}

/// Field a scalar metric aggregates over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricField {
    /// `*`, only valid with `count`.
    All,
    Column(String),
}

impl MetricField {
    pub fn as_str(&self) -> &str {
        match self {
            MetricField::All => "*",
            MetricField::Column(c) => c,
        }
    }
}

/// Executable single-value aggregate over one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarQueryPlan {
    pub entity: String,
    pub field: MetricField,
    pub aggregation: Aggregation,
}
