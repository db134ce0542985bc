//! Report → query plan compilation.

use crate::model::{
    Aggregation, ColumnRef, Filter, FilterOperator, FilterValue, ReportDefinition,
};
use crate::planner::join_builder::JoinBuilder;
use crate::planner::plan::{
    MetricField, Predicate, Projection, QueryPlan, ScalarQueryPlan, TableColumn,
};
use crate::planner::{CompileError, CompileResult};
use crate::schema::SchemaRegistry;

/// Row cap applied to every row query.
///
/// Previews are bounded so a careless report cannot pull a whole table. The
/// cap is a fixed product decision: callers cannot raise it per query. It is
/// only configurable when the compiler is constructed.
pub const DEFAULT_ROW_LIMIT: u64 = 50;

/// Compiles report configuration into executable plans.
///
/// Compilation is pure: the same registry snapshot and inputs always yield
/// the same plan.
pub struct QueryCompiler<'a> {
    registry: &'a SchemaRegistry,
    row_limit: u64,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Use a deployment-wide row cap instead of [`DEFAULT_ROW_LIMIT`].
    pub fn with_row_limit(mut self, row_limit: u64) -> Self {
        self.row_limit = row_limit.max(1);
        self
    }

    pub fn row_limit(&self) -> u64 {
        self.row_limit
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Compile a row query projecting exactly `columns`, in order.
    pub fn compile_rows(
        &self,
        base: &str,
        columns: &[ColumnRef],
        filters: &[Filter],
    ) -> CompileResult<QueryPlan> {
        if columns.is_empty() {
            return Err(CompileError::NoColumns);
        }

        let references = columns.iter().chain(filters.iter().map(|f| &f.field));
        let joins = JoinBuilder::new(self.registry).build_joins(base, references)?;

        let projections = columns
            .iter()
            .map(|c| {
                Ok(Projection {
                    source: self.resolve(base, c)?,
                    output_name: c.qualified_name(),
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let predicates = filters
            .iter()
            .map(|f| self.translate_filter(base, f))
            .collect::<CompileResult<Vec<_>>>()?;

        tracing::debug!(
            base,
            columns = projections.len(),
            joins = joins.len(),
            predicates = predicates.len(),
            "compiled row query"
        );

        Ok(QueryPlan {
            base_entity: base.to_string(),
            projections,
            joins,
            predicates,
            limit: self.row_limit,
        })
    }

    /// Compile the row query behind a saved report.
    ///
    /// Chart group and value fields are fetched alongside the selected
    /// columns so the result can be grouped client-side.
    pub fn compile_report(&self, report: &ReportDefinition) -> CompileResult<QueryPlan> {
        report.chart.validate()?;
        self.compile_rows(&report.base_entity, &report.fetch_columns(), &report.filters)
    }

    /// Compile a single-value aggregate over one field of one entity.
    ///
    /// `*` is only accepted for `count`; the check happens here rather than
    /// at execution time.
    pub fn compile_metric(
        &self,
        entity: &str,
        field: &str,
        aggregation: Aggregation,
    ) -> CompileResult<ScalarQueryPlan> {
        let field = field.trim();
        let field = if field == "*" {
            if aggregation != Aggregation::Count {
                return Err(CompileError::WildcardAggregation(aggregation));
            }
            MetricField::All
        } else {
            match ColumnRef::parse(field)? {
                ColumnRef::Base(f) => MetricField::Column(f),
                ColumnRef::Related { .. } => {
                    return Err(CompileError::QualifiedMetricField(field.to_string()))
                }
            }
        };

        match &field {
            MetricField::All => {
                self.registry.get_entity(entity)?;
            }
            MetricField::Column(c) => self.registry.require_field(entity, c)?,
        }

        Ok(ScalarQueryPlan {
            entity: entity.to_string(),
            field,
            aggregation,
        })
    }

    /// Table alias and column a reference reads from.
    fn resolve(&self, base: &str, column: &ColumnRef) -> CompileResult<TableColumn> {
        let table = column.related_entity().unwrap_or(base);
        self.registry.require_field(table, column.field())?;
        Ok(TableColumn::new(table, column.field()))
    }

    fn translate_filter(&self, base: &str, filter: &Filter) -> CompileResult<Predicate> {
        let column = self.resolve(base, &filter.field)?;
        let invalid = |reason: &str| CompileError::InvalidFilter {
            field: filter.field.to_string(),
            operator: filter.operator,
            reason: reason.to_string(),
        };

        let value = filter.value.clone();
        let comparison = matches!(
            filter.operator,
            FilterOperator::Eq
                | FilterOperator::Neq
                | FilterOperator::Gt
                | FilterOperator::Gte
                | FilterOperator::Lt
                | FilterOperator::Lte
        );
        if comparison && value.is_null() {
            return Err(invalid("null can only be tested with 'is'"));
        }

        let predicate = match filter.operator {
            FilterOperator::Eq => Predicate::Eq { column, value },
            FilterOperator::Neq => Predicate::Neq { column, value },
            FilterOperator::Gt => Predicate::Gt { column, value },
            FilterOperator::Gte => Predicate::Gte { column, value },
            FilterOperator::Lt => Predicate::Lt { column, value },
            FilterOperator::Lte => Predicate::Lte { column, value },
            FilterOperator::Like | FilterOperator::Ilike => {
                let pattern = match value {
                    FilterValue::Text(p) => p,
                    _ => return Err(invalid("pattern must be text")),
                };
                if filter.operator == FilterOperator::Like {
                    Predicate::Like { column, pattern }
                } else {
                    Predicate::Ilike { column, pattern }
                }
            }
            FilterOperator::Is => {
                let value = value
                    .as_tri_state()
                    .ok_or_else(|| invalid("'is' accepts only true, false or null"))?;
                Predicate::Is { column, value }
            }
        };

        Ok(predicate)
    }
}
