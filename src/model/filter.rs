//! Filter model: a closed operator set and a small value container.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::column::ColumnRef;

/// Comparison operators a report filter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    /// Tri-state test against `true`, `false` or `null`.
    Is,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 9] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Like,
        FilterOperator::Ilike,
        FilterOperator::Is,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::Ilike => "ilike",
            FilterOperator::Is => "is",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown filter operator '{}'", s))
    }
}

/// The three values an `is` filter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    True,
    False,
    Null,
}

impl TriState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriState::True => "true",
            TriState::False => "false",
            TriState::Null => "null",
        }
    }
}

/// A filter operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    /// Interpret loosely typed input, as typed into a filter box.
    ///
    /// `null`, `true` and `false` (any case) become their literal values,
    /// anything that parses as a finite number becomes a number, and the
    /// rest stays text.
    pub fn parse_loose(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "null" => return FilterValue::Null,
            "true" => return FilterValue::Bool(true),
            "false" => return FilterValue::Bool(false),
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => FilterValue::Number(n),
            _ => FilterValue::Text(s.to_string()),
        }
    }

    /// The tri-state reading of this value, if it has one.
    ///
    /// Text spellings of `true` / `false` / `null` are accepted since that is
    /// how filter forms submit them.
    pub fn as_tri_state(&self) -> Option<TriState> {
        match self {
            FilterValue::Null => Some(TriState::Null),
            FilterValue::Bool(true) => Some(TriState::True),
            FilterValue::Bool(false) => Some(TriState::False),
            FilterValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(TriState::True),
                "false" => Some(TriState::False),
                "null" => Some(TriState::Null),
                _ => None,
            },
            FilterValue::Number(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => f.write_str("null"),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

/// One `(field, operator, value)` condition of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: ColumnRef,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: ColumnRef, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: ColumnRef, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Parse the `field:operator:value` form used on the command line.
    pub fn parse_triple(s: &str) -> Result<Self, String> {
        let mut parts = s.splitn(3, ':');
        let (field, op, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(field), Some(op), Some(value)) => (field, op, value),
            _ => return Err(format!("expected field:operator:value, got '{}'", s)),
        };
        let field = ColumnRef::parse(field).map_err(|e| e.to_string())?;
        let operator = op.parse::<FilterOperator>()?;
        Ok(Self {
            field,
            operator,
            value: FilterValue::parse_loose(value),
        })
    }
}
