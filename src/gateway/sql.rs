//! Plan → PostgreSQL translation for SQL-speaking backends.
//!
//! Values never appear in the query text; they are bound as `$n`
//! parameters. The rendered text is parsed back with `sqlparser` before it
//! leaves the adapter, so a malformed query is caught here rather than by
//! the backend.

use serde::Serialize;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::{ExecutionError, ExecutionResult};
use crate::model::{Aggregation, FilterValue, TriState};
use crate::planner::{
    JoinType, MetricField, Predicate, QueryPlan, ScalarQueryPlan, TableColumn,
};

/// Query text plus positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<FilterValue>,
}

/// Renders plans as parameterized PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlRenderer;

impl SqlRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a row query.
    pub fn render(&self, plan: &QueryPlan) -> ExecutionResult<RenderedQuery> {
        let mut params = Vec::new();
        let mut sql = String::from("SELECT ");

        let select: Vec<String> = plan
            .projections
            .iter()
            .map(|p| format!("{} AS {}", column(&p.source), quote(&p.output_name)))
            .collect();
        sql.push_str(&select.join(", "));

        sql.push_str(" FROM ");
        sql.push_str(&quote(&plan.base_entity));

        for join in &plan.joins {
            let keyword = match join.join_type {
                JoinType::Left => "LEFT JOIN",
            };
            sql.push_str(&format!(" {} {}", keyword, quote(&join.entity)));
            if join.alias != join.entity {
                sql.push_str(&format!(" AS {}", quote(&join.alias)));
            }
            sql.push_str(&format!(
                " ON {} = {}",
                column(&join.left),
                column(&join.right)
            ));
        }

        if !plan.predicates.is_empty() {
            let conditions: Vec<String> = plan
                .predicates
                .iter()
                .map(|p| predicate(p, &mut params))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(&format!(" LIMIT {}", plan.limit));

        validate(&sql)?;
        Ok(RenderedQuery { sql, params })
    }

    /// Render a scalar aggregate.
    pub fn render_scalar(&self, plan: &ScalarQueryPlan) -> ExecutionResult<RenderedQuery> {
        let argument = match &plan.field {
            MetricField::All => "*".to_string(),
            MetricField::Column(c) => quote(c),
        };
        let function = match plan.aggregation {
            Aggregation::Count => "COUNT",
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
        };
        let sql = format!(
            "SELECT {}({}) AS \"value\" FROM {}",
            function,
            argument,
            quote(&plan.entity)
        );

        validate(&sql)?;
        Ok(RenderedQuery {
            sql,
            params: Vec::new(),
        })
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column(c: &TableColumn) -> String {
    format!("{}.{}", quote(&c.table), quote(&c.column))
}

fn bind(params: &mut Vec<FilterValue>, value: FilterValue) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn predicate(p: &Predicate, params: &mut Vec<FilterValue>) -> String {
    let col = column(p.column());
    match p {
        Predicate::Eq { value, .. } => format!("{} = {}", col, bind(params, value.clone())),
        Predicate::Neq { value, .. } => format!("{} <> {}", col, bind(params, value.clone())),
        Predicate::Gt { value, .. } => format!("{} > {}", col, bind(params, value.clone())),
        Predicate::Gte { value, .. } => format!("{} >= {}", col, bind(params, value.clone())),
        Predicate::Lt { value, .. } => format!("{} < {}", col, bind(params, value.clone())),
        Predicate::Lte { value, .. } => format!("{} <= {}", col, bind(params, value.clone())),
        Predicate::Like { pattern, .. } => {
            format!("{} LIKE {}", col, bind(params, FilterValue::text(pattern)))
        }
        Predicate::Ilike { pattern, .. } => {
            format!("{} ILIKE {}", col, bind(params, FilterValue::text(pattern)))
        }
        Predicate::Is { value, .. } => {
            let keyword = match value {
                TriState::True => "TRUE",
                TriState::False => "FALSE",
                TriState::Null => "NULL",
            };
            format!("{} IS {}", col, keyword)
        }
    }
}

fn validate(sql: &str) -> ExecutionResult<()> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| ExecutionError::Untranslatable(e.to_string()))?;
    if statements.len() != 1 {
        return Err(ExecutionError::Untranslatable(format!(
            "expected one statement, rendered {}",
            statements.len()
        )));
    }
    Ok(())
}
