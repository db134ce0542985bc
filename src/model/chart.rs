//! Chart configuration attached to a report.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::column::ColumnRef;

/// Visualization a report renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Table,
    Bar,
    Line,
    Pie,
}

/// Aggregation applied per group, or to a whole table for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// Calendar unit a timestamp group key is truncated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateGrouping {
    Day,
    Week,
    Month,
    Year,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty), other)),
                }
            }
        }
    };
}

text_enum!(ChartType { Table => "table", Bar => "bar", Line => "line", Pie => "pie" });
text_enum!(Aggregation { Count => "count", Sum => "sum", Avg => "avg", Min => "min", Max => "max" });
text_enum!(DateGrouping { Day => "day", Week => "week", Month => "month", Year => "year" });

/// Errors in a chart configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    #[error("aggregation '{0}' needs a value field")]
    MissingValueField(Aggregation),

    #[error("value field '{0}' must differ from the group-by field")]
    ValueFieldIsGroupField(String),
}

/// How a report's result set is charted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
    #[serde(default)]
    pub group_by: Option<ColumnRef>,
    #[serde(default)]
    pub date_grouping: Option<DateGrouping>,
    /// Numeric field fed to sum/avg/min/max.
    #[serde(default)]
    pub value_field: Option<ColumnRef>,
}

impl ChartConfig {
    pub fn table() -> Self {
        Self::default()
    }

    pub fn chart(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            ..Self::default()
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_group_by(mut self, column: ColumnRef) -> Self {
        self.group_by = Some(column);
        self
    }

    pub fn with_date_grouping(mut self, grouping: DateGrouping) -> Self {
        self.date_grouping = Some(grouping);
        self
    }

    pub fn with_value_field(mut self, column: ColumnRef) -> Self {
        self.value_field = Some(column);
        self
    }

    /// Aggregation actually applied: charts default to `count`, tables keep
    /// whatever was configured.
    pub fn effective_aggregation(&self) -> Option<Aggregation> {
        match self.chart_type {
            ChartType::Table => self.aggregation,
            _ => Some(self.aggregation.unwrap_or(Aggregation::Count)),
        }
    }

    /// Date bucketing is ignored for tables.
    pub fn effective_date_grouping(&self) -> Option<DateGrouping> {
        match self.chart_type {
            ChartType::Table => None,
            _ => self.date_grouping,
        }
    }

    /// Columns the chart reads from result rows, beyond the selected ones.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.group_by.iter().chain(self.value_field.iter())
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.chart_type == ChartType::Table {
            return Ok(());
        }
        match self.effective_aggregation() {
            Some(Aggregation::Count) | None => {}
            Some(agg) => {
                let value_field = self
                    .value_field
                    .as_ref()
                    .ok_or(ChartError::MissingValueField(agg))?;
                if self.group_by.as_ref() == Some(value_field) {
                    return Err(ChartError::ValueFieldIsGroupField(value_field.to_string()));
                }
            }
        }
        Ok(())
    }
}
