//! Client-side grouping of fetched rows into chart series.
//!
//! Rows are bucketed by a group field, optionally truncated to a calendar
//! unit, and one aggregation is applied per bucket. Values that cannot be
//! aggregated are skipped and counted, never treated as errors.

mod bucket;

pub use bucket::{local_date_in, truncate, ViewerZone};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::model::{Aggregation, ChartConfig, ChartError, ChartType, DateGrouping, Row};

/// Label for rows whose group value is missing or null.
pub const MISSING_KEY: &str = "(none)";

/// What to group by and how to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    /// Row key of the group field.
    pub group_by: String,
    pub date_grouping: Option<DateGrouping>,
    pub aggregation: Aggregation,
    /// Row key of the aggregated field; required unless counting.
    pub value_field: Option<String>,
}

impl GroupSpec {
    pub fn count_by(group_by: impl Into<String>) -> Self {
        Self {
            group_by: group_by.into(),
            date_grouping: None,
            aggregation: Aggregation::Count,
            value_field: None,
        }
    }

    pub fn new(
        group_by: impl Into<String>,
        aggregation: Aggregation,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            group_by: group_by.into(),
            date_grouping: None,
            aggregation,
            value_field: Some(value_field.into()),
        }
    }

    pub fn with_date_grouping(mut self, grouping: DateGrouping) -> Self {
        self.date_grouping = Some(grouping);
        self
    }

    /// Derive the grouping a chart asks for. `None` for tables and for
    /// charts without a group field.
    pub fn from_chart(chart: &ChartConfig) -> Result<Option<Self>, ChartError> {
        chart.validate()?;
        if chart.chart_type == ChartType::Table {
            return Ok(None);
        }
        let Some(group_by) = &chart.group_by else {
            return Ok(None);
        };
        let aggregation = chart.effective_aggregation().unwrap_or(Aggregation::Count);
        Ok(Some(Self {
            group_by: group_by.qualified_name(),
            date_grouping: chart.effective_date_grouping(),
            aggregation,
            value_field: chart.value_field.as_ref().map(|c| c.qualified_name()),
        }))
    }

    /// Series label, e.g. `count` or `sum(amount)`.
    pub fn series_name(&self) -> String {
        match (&self.aggregation, &self.value_field) {
            (Aggregation::Count, _) | (_, None) => self.aggregation.to_string(),
            (agg, Some(field)) => format!("{}({})", agg, field),
        }
    }
}

/// One group and its aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    /// `None` when every value in the bucket was skipped (avg/min/max).
    pub value: Option<f64>,
    /// Rows that fell into this bucket.
    pub rows: usize,
}

/// Ordered buckets plus the number of rows excluded along the way.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Aggregated {
    pub buckets: Vec<Bucket>,
    /// Rows whose group timestamp or aggregated value was unusable.
    pub skipped: usize,
}

impl Aggregated {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Group key; variant order gives dates chronologically, text lexically,
/// and the missing bucket last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Date(NaiveDate),
    Text(String),
    Missing,
}

impl GroupKey {
    fn label(&self) -> String {
        match self {
            GroupKey::Date(d) => d.format("%Y-%m-%d").to_string(),
            GroupKey::Text(s) => s.clone(),
            GroupKey::Missing => MISSING_KEY.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    rows: usize,
    values: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.values += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn finish(&self, aggregation: Aggregation) -> Option<f64> {
        match aggregation {
            Aggregation::Count => Some(self.rows as f64),
            Aggregation::Sum => Some(self.sum),
            Aggregation::Avg if self.values > 0 => Some(self.sum / self.values as f64),
            Aggregation::Avg => None,
            Aggregation::Min => self.min,
            Aggregation::Max => self.max,
        }
    }
}

/// Numeric reading of a row value. Numeric strings count, everything else
/// (null, bool, objects, free text) does not.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn text_key(value: &Value) -> GroupKey {
    match value {
        Value::Null => GroupKey::Missing,
        Value::String(s) => GroupKey::Text(s.clone()),
        other => GroupKey::Text(other.to_string()),
    }
}

/// Group `rows` according to `spec`, cutting date buckets in `zone`.
///
/// Output is ordered by key ascending and is identical for identical input.
pub fn aggregate(rows: &[Row], spec: &GroupSpec, zone: ViewerZone) -> Aggregated {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    let mut skipped = 0;

    for row in rows {
        let raw = row.get(&spec.group_by).unwrap_or(&Value::Null);
        let key = match spec.date_grouping {
            Some(grouping) => {
                if raw.is_null() {
                    GroupKey::Missing
                } else {
                    match zone.local_date(raw) {
                        Some(date) => GroupKey::Date(truncate(date, grouping)),
                        None => {
                            skipped += 1;
                            continue;
                        }
                    }
                }
            }
            None => text_key(raw),
        };

        let acc = groups.entry(key).or_default();
        acc.rows += 1;

        if spec.aggregation == Aggregation::Count {
            continue;
        }
        let value = spec
            .value_field
            .as_ref()
            .and_then(|f| row.get(f))
            .and_then(numeric_value);
        match value {
            Some(v) => acc.add(v),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, group_by = %spec.group_by, "skipped unaggregatable rows");
    }

    Aggregated {
        buckets: groups
            .iter()
            .map(|(key, acc)| Bucket {
                key: key.label(),
                value: acc.finish(spec.aggregation),
                rows: acc.rows,
            })
            .collect(),
        skipped,
    }
}
