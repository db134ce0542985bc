//! In-memory execution gateway.
//!
//! Evaluates plans directly over JSON rows held in memory, following the
//! same semantics a SQL backend gives them: LEFT joins keep unmatched base
//! rows, comparisons against NULL are never true, and `LIMIT` is applied
//! last. Used by the CLI against exported data and by tests, which can also
//! inject failures and latency.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{ExecutionError, ExecutionGateway, ExecutionResult, Row, Scalar};
use crate::aggregate::numeric_value;
use crate::model::{Aggregation, FilterValue, TriState};
use crate::planner::{MetricField, Predicate, QueryPlan, ScalarQueryPlan, TableColumn};

/// Gateway over in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    tables: HashMap<String, Vec<Row>>,
    failures: Mutex<VecDeque<ExecutionError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    /// Delay every call, to exercise in-flight behavior.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Parse `{"table": [{...}, ...], ...}`.
    pub fn from_json_str(json: &str) -> ExecutionResult<Self> {
        let tables: HashMap<String, Vec<Row>> = serde_json::from_str(json)?;
        Ok(Self {
            tables,
            ..Self::default()
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ExecutionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Make the next call fail with `err`. Queued failures are consumed in
    /// order, one per call.
    pub fn fail_next(&self, err: ExecutionError) {
        match self.failures.lock() {
            Ok(mut queue) => queue.push_back(err),
            Err(poisoned) => poisoned.into_inner().push_back(err),
        }
    }

    /// Number of execute/execute_scalar calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    async fn enter(&self) -> ExecutionResult<()> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = match self.failures.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn table(&self, name: &str) -> ExecutionResult<&[Row]> {
        self.tables.get(name).map(Vec::as_slice).ok_or_else(|| {
            ExecutionError::rejected("42P01", format!("relation \"{}\" does not exist", name))
        })
    }
}

#[async_trait]
impl ExecutionGateway for MemoryGateway {
    async fn execute(&self, plan: &QueryPlan) -> ExecutionResult<Vec<Row>> {
        self.enter().await?;

        let mut aliases: Vec<&str> = vec![plan.base_entity.as_str()];
        let mut tuples: Vec<Vec<Option<&Row>>> = self
            .table(&plan.base_entity)?
            .iter()
            .map(|r| vec![Some(r)])
            .collect();

        for join in &plan.joins {
            let related = self.table(&join.entity)?;
            let mut joined = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let matches: Vec<&Row> = match lookup(&aliases, &tuple, &join.left) {
                    Some(key) if !key.is_null() => related
                        .iter()
                        .filter(|r| r.get(&join.right.column).is_some_and(|v| v == key))
                        .collect(),
                    _ => Vec::new(),
                };
                if matches.is_empty() {
                    let mut t = tuple;
                    t.push(None);
                    joined.push(t);
                } else {
                    for m in matches {
                        let mut t = tuple.clone();
                        t.push(Some(m));
                        joined.push(t);
                    }
                }
            }
            tuples = joined;
            aliases.push(join.alias.as_str());
        }

        let mut rows = Vec::new();
        for tuple in &tuples {
            if rows.len() as u64 >= plan.limit {
                break;
            }
            let keep = plan
                .predicates
                .iter()
                .all(|p| evaluate(p, lookup(&aliases, tuple, p.column())));
            if !keep {
                continue;
            }
            let row: Row = plan
                .projections
                .iter()
                .map(|p| {
                    let value = lookup(&aliases, tuple, &p.source)
                        .cloned()
                        .unwrap_or(Value::Null);
                    (p.output_name.clone(), value)
                })
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }

    async fn execute_scalar(&self, plan: &ScalarQueryPlan) -> ExecutionResult<Scalar> {
        self.enter().await?;
        let rows = self.table(&plan.entity)?;

        let column = match &plan.field {
            MetricField::All => {
                return match plan.aggregation {
                    Aggregation::Count => Ok(Some(rows.len() as f64)),
                    other => Err(ExecutionError::Untranslatable(format!(
                        "{}(*) is not a valid aggregate",
                        other
                    ))),
                }
            }
            MetricField::Column(c) => c,
        };

        let present = rows
            .iter()
            .filter_map(|r| r.get(column))
            .filter(|v| !v.is_null());

        if plan.aggregation == Aggregation::Count {
            return Ok(Some(present.count() as f64));
        }

        let numbers: Vec<f64> = present.filter_map(numeric_value).collect();
        if numbers.is_empty() {
            return Ok(None);
        }
        let value = match plan.aggregation {
            Aggregation::Sum => numbers.iter().sum(),
            Aggregation::Avg => numbers.iter().sum::<f64>() / numbers.len() as f64,
            Aggregation::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Count => numbers.len() as f64,
        };
        Ok(Some(value))
    }
}

fn lookup<'a>(aliases: &[&str], tuple: &[Option<&'a Row>], column: &TableColumn) -> Option<&'a Value> {
    let idx = aliases.iter().position(|a| *a == column.table)?;
    tuple.get(idx).copied().flatten()?.get(&column.column)
}

fn evaluate(predicate: &Predicate, value: Option<&Value>) -> bool {
    let value = value.unwrap_or(&Value::Null);
    match predicate {
        Predicate::Eq { value: v, .. } => compare(value, v) == Some(Ordering::Equal),
        Predicate::Neq { value: v, .. } => {
            matches!(compare(value, v), Some(o) if o != Ordering::Equal)
        }
        Predicate::Gt { value: v, .. } => compare(value, v) == Some(Ordering::Greater),
        Predicate::Gte { value: v, .. } => {
            matches!(compare(value, v), Some(Ordering::Greater | Ordering::Equal))
        }
        Predicate::Lt { value: v, .. } => compare(value, v) == Some(Ordering::Less),
        Predicate::Lte { value: v, .. } => {
            matches!(compare(value, v), Some(Ordering::Less | Ordering::Equal))
        }
        Predicate::Like { pattern, .. } => like(value, pattern, false),
        Predicate::Ilike { pattern, .. } => like(value, pattern, true),
        Predicate::Is { value: state, .. } => match state {
            TriState::True => *value == Value::Bool(true),
            TriState::False => *value == Value::Bool(false),
            TriState::Null => value.is_null(),
        },
    }
}

/// Order a row value against a filter operand. `None` when the two cannot
/// be compared, which makes every comparison false, as NULL does in SQL.
fn compare(value: &Value, operand: &FilterValue) -> Option<Ordering> {
    match (value, operand) {
        (Value::Null, _) | (_, FilterValue::Null) => None,
        (Value::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), FilterValue::Text(t)) => t.trim().parse::<bool>().ok().map(|b| a.cmp(&b)),
        (Value::String(a), FilterValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (_, FilterValue::Number(b)) => numeric_value(value)?.partial_cmp(b),
        (Value::Number(_), FilterValue::Text(t)) => {
            let b = t.trim().parse::<f64>().ok()?;
            numeric_value(value)?.partial_cmp(&b)
        }
        _ => None,
    }
}

fn like(value: &Value, pattern: &str, case_insensitive: bool) -> bool {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return false,
    };
    like_regex(pattern, case_insensitive).is_some_and(|re| re.is_match(&text))
}

/// Translate a SQL LIKE pattern (`%`, `_`) into an anchored regex.
fn like_regex(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let mut re = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}
