#[path = "../common/mod.rs"]
mod common;

use dossier::aggregate::{aggregate, Bucket, GroupSpec, ViewerZone, MISSING_KEY};
use dossier::model::{Aggregation, ChartConfig, ChartError, ChartType, ColumnRef};
use serde_json::json;

use common::{case_rows, rows};

fn keys_and_values(buckets: &[Bucket]) -> Vec<(&str, Option<f64>)> {
    buckets.iter().map(|b| (b.key.as_str(), b.value)).collect()
}

#[test]
fn test_sum_amount_by_priority() {
    let spec = GroupSpec::new("priority", Aggregation::Sum, "amount");
    let out = aggregate(&case_rows(), &spec, ViewerZone::Local);

    assert_eq!(
        keys_and_values(&out.buckets),
        vec![("high", Some(3.0)), ("low", Some(15.0))]
    );
    assert_eq!(out.buckets[0].rows, 2);
    assert_eq!(out.skipped, 0);
}

#[test]
fn test_spec_from_bar_chart() {
    let chart = ChartConfig::chart(ChartType::Bar)
        .with_aggregation(Aggregation::Sum)
        .with_group_by(ColumnRef::base("priority"))
        .with_value_field(ColumnRef::base("amount"));
    let spec = GroupSpec::from_chart(&chart).unwrap().unwrap();
    assert_eq!(spec, GroupSpec::new("priority", Aggregation::Sum, "amount"));
    assert_eq!(spec.series_name(), "sum(amount)");
}

#[test]
fn test_spec_from_chart_edge_cases() {
    // Tables are never grouped.
    let table = ChartConfig::table().with_group_by(ColumnRef::base("status"));
    assert_eq!(GroupSpec::from_chart(&table).unwrap(), None);

    // A chart without a group field has nothing to group on.
    assert_eq!(
        GroupSpec::from_chart(&ChartConfig::chart(ChartType::Pie)).unwrap(),
        None
    );

    // Charts default to counting.
    let pie = ChartConfig::chart(ChartType::Pie).with_group_by(ColumnRef::related("users", "name"));
    assert_eq!(
        GroupSpec::from_chart(&pie).unwrap(),
        Some(GroupSpec::count_by("users.name"))
    );

    let invalid = ChartConfig::chart(ChartType::Bar)
        .with_aggregation(Aggregation::Avg)
        .with_group_by(ColumnRef::base("status"));
    assert_eq!(
        GroupSpec::from_chart(&invalid),
        Err(ChartError::MissingValueField(Aggregation::Avg))
    );
}

#[test]
fn test_count_by_status() {
    let out = aggregate(&case_rows(), &GroupSpec::count_by("status"), ViewerZone::Local);
    assert_eq!(
        keys_and_values(&out.buckets),
        vec![("closed", Some(1.0)), ("open", Some(3.0))]
    );
}

#[test]
fn test_grouping_ignores_input_order() {
    let spec = GroupSpec::new("priority", Aggregation::Avg, "amount");
    let forward = aggregate(&case_rows(), &spec, ViewerZone::Local);

    let mut reversed = case_rows();
    reversed.reverse();
    let backward = aggregate(&reversed, &spec, ViewerZone::Local);

    assert_eq!(forward, backward);
}

#[test]
fn test_unusable_values_are_skipped() {
    let data = rows(json!([
        {"team": "a", "hours": 4},
        {"team": "a", "hours": "n/a"},
        {"team": "a", "hours": null},
        {"team": "b", "hours": "2.5"},
        {"team": "c"}
    ]));

    let sum = aggregate(&data, &GroupSpec::new("team", Aggregation::Sum, "hours"), ViewerZone::Local);
    assert_eq!(
        keys_and_values(&sum.buckets),
        vec![("a", Some(4.0)), ("b", Some(2.5)), ("c", Some(0.0))]
    );
    assert_eq!(sum.skipped, 3);

    let avg = aggregate(&data, &GroupSpec::new("team", Aggregation::Avg, "hours"), ViewerZone::Local);
    assert_eq!(
        keys_and_values(&avg.buckets),
        vec![("a", Some(4.0)), ("b", Some(2.5)), ("c", None)]
    );

    let max = aggregate(&data, &GroupSpec::new("team", Aggregation::Max, "hours"), ViewerZone::Local);
    assert_eq!(max.buckets[2].value, None);
    // Rows still count towards their bucket even when their value is skipped.
    assert_eq!(max.buckets[0].rows, 3);
}

#[test]
fn test_min_and_max() {
    let data = case_rows();
    let min = aggregate(&data, &GroupSpec::new("status", Aggregation::Min, "amount"), ViewerZone::Local);
    let max = aggregate(&data, &GroupSpec::new("status", Aggregation::Max, "amount"), ViewerZone::Local);
    assert_eq!(
        keys_and_values(&min.buckets),
        vec![("closed", Some(2.0)), ("open", Some(1.0))]
    );
    assert_eq!(
        keys_and_values(&max.buckets),
        vec![("closed", Some(2.0)), ("open", Some(10.0))]
    );
}

#[test]
fn test_missing_group_values_share_a_bucket() {
    let out = aggregate(&case_rows(), &GroupSpec::count_by("assigned_to"), ViewerZone::Local);
    // Non-text keys group by their JSON text, ordered lexically.
    assert_eq!(
        keys_and_values(&out.buckets),
        vec![
            ("10", Some(1.0)),
            ("11", Some(1.0)),
            ("99", Some(1.0)),
            (MISSING_KEY, Some(1.0))
        ]
    );
}

#[test]
fn test_boolean_group_keys() {
    let out = aggregate(&case_rows(), &GroupSpec::count_by("is_urgent"), ViewerZone::Local);
    assert_eq!(
        keys_and_values(&out.buckets),
        vec![("false", Some(2.0)), ("true", Some(1.0)), (MISSING_KEY, Some(1.0))]
    );
}
