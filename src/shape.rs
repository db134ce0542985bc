//! Result shaping for the four report consumers.
//!
//! Shaping is presentation-neutral: it decides what numbers and labels a
//! table, bar, line or pie view receives, never how they are drawn.

use inflector::Inflector;
use serde::Serialize;

use crate::aggregate::Aggregated;
use crate::model::{ChartType, ColumnRef, Row};

/// Input to [`shape`]: raw rows for tables, grouped series for charts.
#[derive(Debug, Clone, Copy)]
pub enum ShapeInput<'a> {
    Rows {
        rows: &'a [Row],
        columns: &'a [ColumnRef],
    },
    Series {
        aggregated: &'a Aggregated,
        /// Label of the group field, used as the table header.
        group_label: &'a str,
        series_name: &'a str,
    },
}

/// Table view: rows passed through, with the column order to display them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    /// Row keys, in display order.
    pub columns: Vec<String>,
    /// Human-readable header for each column.
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Bar and line view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    /// Share of the total, rounded to the nearest whole percent. Slices may
    /// sum to slightly less or more than 100.
    pub percent_of_total: i64,
}

/// Pie view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieView {
    pub slices: Vec<Slice>,
}

/// Consumer-ready report output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewModel {
    Table(TableView),
    Bar(SeriesView),
    Line(SeriesView),
    Pie(PieView),
}

/// Errors raised while shaping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("a {0} chart needs grouped data; set a group-by field")]
    SeriesRequired(ChartType),
}

/// Human label for a column key: `users.full_name` → `Users Full Name`.
pub fn header_label(column: &str) -> String {
    column.replace('.', " ").to_title_case()
}

/// Shape `input` for a `chart_type` consumer.
pub fn shape(input: ShapeInput<'_>, chart_type: ChartType) -> Result<ViewModel, ShapeError> {
    match (input, chart_type) {
        (ShapeInput::Rows { rows, columns }, ChartType::Table) => Ok(ViewModel::Table(
            table_view(rows, columns.iter().map(|c| c.qualified_name()).collect()),
        )),
        (ShapeInput::Rows { .. }, other) => Err(ShapeError::SeriesRequired(other)),
        (
            ShapeInput::Series {
                aggregated,
                group_label,
                series_name,
            },
            ChartType::Table,
        ) => Ok(ViewModel::Table(series_table(aggregated, group_label, series_name))),
        (ShapeInput::Series { aggregated, series_name, .. }, ChartType::Bar) => {
            Ok(ViewModel::Bar(series_view(aggregated, series_name)))
        }
        (ShapeInput::Series { aggregated, series_name, .. }, ChartType::Line) => {
            Ok(ViewModel::Line(series_view(aggregated, series_name)))
        }
        (ShapeInput::Series { aggregated, .. }, ChartType::Pie) => {
            Ok(ViewModel::Pie(pie_view(aggregated)))
        }
    }
}

fn table_view(rows: &[Row], columns: Vec<String>) -> TableView {
    TableView {
        headers: columns.iter().map(|c| header_label(c)).collect(),
        columns,
        rows: rows.to_vec(),
    }
}

fn series_table(aggregated: &Aggregated, group_label: &str, series_name: &str) -> TableView {
    let rows = aggregated
        .buckets
        .iter()
        .map(|b| {
            let mut row = Row::new();
            row.insert(group_label.to_string(), b.key.clone().into());
            row.insert(series_name.to_string(), b.value.into());
            row
        })
        .collect::<Vec<_>>();
    table_view(&rows, vec![group_label.to_string(), series_name.to_string()])
}

fn series_view(aggregated: &Aggregated, series_name: &str) -> SeriesView {
    SeriesView {
        categories: aggregated.buckets.iter().map(|b| b.key.clone()).collect(),
        series: vec![Series {
            name: series_name.to_string(),
            values: aggregated.buckets.iter().map(|b| b.value).collect(),
        }],
    }
}

fn pie_view(aggregated: &Aggregated) -> PieView {
    let total: f64 = aggregated.buckets.iter().filter_map(|b| b.value).sum();
    let slices = aggregated
        .buckets
        .iter()
        .map(|b| {
            let value = b.value.unwrap_or(0.0);
            let percent_of_total = if total > 0.0 {
                (value / total * 100.0).round() as i64
            } else {
                0
            };
            Slice {
                label: b.key.clone(),
                value,
                percent_of_total,
            }
        })
        .collect();
    PieView { slices }
}
