#[path = "../common/mod.rs"]
mod common;

use dossier::aggregate::{aggregate, Aggregated, Bucket, GroupSpec, ViewerZone};
use dossier::model::{Aggregation, ChartType, ColumnRef};
use dossier::shape::{shape, Series, ShapeError, ShapeInput, Slice, ViewModel};
use serde_json::json;

use common::case_rows;

fn buckets(pairs: &[(&str, Option<f64>)]) -> Aggregated {
    Aggregated {
        buckets: pairs
            .iter()
            .map(|(key, value)| Bucket {
                key: key.to_string(),
                value: *value,
                rows: 1,
            })
            .collect(),
        skipped: 0,
    }
}

fn series<'a>(aggregated: &'a Aggregated, name: &'a str) -> ShapeInput<'a> {
    ShapeInput::Series {
        aggregated,
        group_label: "priority",
        series_name: name,
    }
}

#[test]
fn test_table_passes_rows_through() {
    let rows = case_rows();
    let columns = vec![ColumnRef::base("title"), ColumnRef::related("users", "name")];
    let view = shape(
        ShapeInput::Rows {
            rows: &rows,
            columns: &columns,
        },
        ChartType::Table,
    )
    .unwrap();

    let ViewModel::Table(table) = view else {
        panic!("expected a table, got {:?}", view);
    };
    assert_eq!(table.columns, vec!["title", "users.name"]);
    assert_eq!(table.headers, vec!["Title", "Users Name"]);
    assert_eq!(table.rows, rows);
}

#[test]
fn test_bar_series_from_grouped_rows() {
    let aggregated = aggregate(
        &case_rows(),
        &GroupSpec::new("priority", Aggregation::Sum, "amount"),
        ViewerZone::Local,
    );
    let view = shape(series(&aggregated, "sum(amount)"), ChartType::Bar).unwrap();

    let ViewModel::Bar(bar) = view else {
        panic!("expected a bar view, got {:?}", view);
    };
    assert_eq!(bar.categories, vec!["high", "low"]);
    assert_eq!(
        bar.series,
        vec![Series {
            name: "sum(amount)".into(),
            values: vec![Some(3.0), Some(15.0)],
        }]
    );
}

#[test]
fn test_line_keeps_empty_points() {
    let aggregated = buckets(&[("2024-03-01", Some(2.0)), ("2024-04-01", None)]);
    let view = shape(series(&aggregated, "avg(amount)"), ChartType::Line).unwrap();
    let ViewModel::Line(line) = view else {
        panic!("expected a line view, got {:?}", view);
    };
    assert_eq!(line.series[0].values, vec![Some(2.0), None]);
}

#[test]
fn test_pie_percentages_round() {
    let aggregated = buckets(&[("a", Some(1.0)), ("b", Some(1.0)), ("c", Some(1.0))]);
    let ViewModel::Pie(pie) = shape(series(&aggregated, "count"), ChartType::Pie).unwrap() else {
        panic!("expected a pie view");
    };
    let percents: Vec<i64> = pie.slices.iter().map(|s| s.percent_of_total).collect();
    // Rounded shares need not add up to 100.
    assert_eq!(percents, vec![33, 33, 33]);

    let aggregated = buckets(&[("high", Some(3.0)), ("low", Some(15.0))]);
    let ViewModel::Pie(pie) = shape(series(&aggregated, "sum(amount)"), ChartType::Pie).unwrap()
    else {
        panic!("expected a pie view");
    };
    assert_eq!(
        pie.slices,
        vec![
            Slice {
                label: "high".into(),
                value: 3.0,
                percent_of_total: 17
            },
            Slice {
                label: "low".into(),
                value: 15.0,
                percent_of_total: 83
            },
        ]
    );
}

#[test]
fn test_pie_with_zero_total() {
    let aggregated = buckets(&[("a", Some(0.0)), ("b", None)]);
    let ViewModel::Pie(pie) = shape(series(&aggregated, "sum(x)"), ChartType::Pie).unwrap() else {
        panic!("expected a pie view");
    };
    assert!(pie.slices.iter().all(|s| s.percent_of_total == 0 && s.value == 0.0));
}

#[test]
fn test_grouped_table() {
    let aggregated = buckets(&[("high", Some(3.0)), ("low", Some(15.0))]);
    let ViewModel::Table(table) =
        shape(series(&aggregated, "sum(amount)"), ChartType::Table).unwrap()
    else {
        panic!("expected a table");
    };
    assert_eq!(table.columns, vec!["priority", "sum(amount)"]);
    assert_eq!(table.rows[1]["priority"], json!("low"));
    assert_eq!(table.rows[1]["sum(amount)"], json!(15.0));
}

#[test]
fn test_charts_need_grouped_input() {
    let rows = case_rows();
    for chart in [ChartType::Bar, ChartType::Line, ChartType::Pie] {
        assert_eq!(
            shape(
                ShapeInput::Rows {
                    rows: &rows,
                    columns: &[]
                },
                chart
            ),
            Err(ShapeError::SeriesRequired(chart))
        );
    }
}

#[test]
fn test_view_model_serializes_with_type_tag() {
    let aggregated = buckets(&[("open", Some(3.0))]);
    let view = shape(series(&aggregated, "count"), ChartType::Bar).unwrap();
    assert_eq!(
        serde_json::to_value(&view).unwrap(),
        json!({
            "type": "bar",
            "categories": ["open"],
            "series": [{"name": "count", "values": [3.0]}]
        })
    );
}
