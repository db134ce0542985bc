//! CSV export of the last fetched result set.
//!
//! The format is intentionally simpler than RFC 4180: nothing is quoted and
//! commas inside values are replaced with semicolons. Existing consumers of
//! these exports depend on one physical line per row and no quoting.

use serde::Serialize;
use serde_json::Value;

use crate::model::{ColumnRef, Row};

pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";

/// Serialize `rows` in `columns` order.
///
/// The header is the column names joined by commas. Every line, the header
/// included, ends in `\n`.
pub fn to_csv<S: AsRef<str>>(rows: &[Row], columns: &[S]) -> String {
    let mut out = String::new();
    let header: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| cell(row.get(c.as_ref())))
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// [`to_csv`] over column references.
pub fn to_csv_columns(rows: &[Row], columns: &[ColumnRef]) -> String {
    let names: Vec<String> = columns.iter().map(|c| c.qualified_name()).collect();
    to_csv(rows, &names)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.replace(',', ";"),
        Some(Value::Number(n)) => number_text(n).replace(',', ";"),
        Some(Value::Bool(b)) => b.to_string(),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => {
            nested.to_string().replace(',', ";")
        }
    }
}

/// Whole-valued floats below 1e21 print in full positional form, as `1`
/// rather than `1.0` and `10000000000000000` rather than `1e16`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

/// A downloadable CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvExport {
    pub filename: String,
    pub mime_type: &'static str,
    pub body: String,
}

impl CsvExport {
    /// Export named after the report, or `report.csv` when it has no name.
    pub fn for_report(name: Option<&str>, rows: &[Row], columns: &[ColumnRef]) -> Self {
        let stem = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("report");
        Self {
            filename: format!("{}.csv", stem),
            mime_type: CSV_MIME_TYPE,
            body: to_csv_columns(rows, columns),
        }
    }
}
