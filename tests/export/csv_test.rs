#[path = "../common/mod.rs"]
mod common;

use dossier::export::{to_csv, to_csv_columns, CsvExport, CSV_MIME_TYPE};
use dossier::model::ColumnRef;
use serde_json::json;

use common::{case_rows, rows};

#[test]
fn test_nulls_are_empty_cells() {
    let data = rows(json!([{"a": 1, "b": null}]));
    assert_eq!(to_csv(&data, &["a", "b"]), "a,b\n1,\n");
}

#[test]
fn test_empty_result_is_header_only() {
    assert_eq!(to_csv(&[], &["a", "b"]), "a,b\n");
}

#[test]
fn test_commas_become_semicolons() {
    let data = rows(json!([{"title": "Permit, renewal", "note": "a,b,c"}]));
    assert_eq!(to_csv(&data, &["title", "note"]), "title,note\nPermit; renewal,a;b;c\n");
}

#[test]
fn test_nested_values_are_json() {
    let data = rows(json!([{"id": 1, "tags": ["x", "y"], "meta": {"k": true}}]));
    assert_eq!(
        to_csv(&data, &["id", "tags", "meta"]),
        "id,tags,meta\n1,[\"x\";\"y\"],{\"k\":true}\n"
    );
}

#[test]
fn test_column_order_follows_selection() {
    let data = case_rows();
    let columns = [ColumnRef::base("status"), ColumnRef::base("title"), ColumnRef::base("is_urgent")];
    let csv = to_csv_columns(&data, &columns);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "status,title,is_urgent",
            "open,Noise complaint,true",
            "open,Pothole,false",
            "closed,Permit; renewal,",
            "open,Streetlight out,false",
        ]
    );
    assert!(csv.ends_with('\n'));
}

#[test]
fn test_missing_keys_are_empty_cells() {
    let data = rows(json!([{"title": "A"}]));
    let columns = [ColumnRef::base("title"), ColumnRef::related("users", "name")];
    assert_eq!(to_csv_columns(&data, &columns), "title,users.name\nA,\n");
}

#[test]
fn test_export_file() {
    let data = rows(json!([{"title": "A"}]));
    let export = CsvExport::for_report(Some("Open cases"), &data, &[ColumnRef::base("title")]);
    assert_eq!(export.filename, "Open cases.csv");
    assert_eq!(export.mime_type, CSV_MIME_TYPE);
    assert_eq!(export.mime_type, "text/csv;charset=utf-8");
    assert_eq!(export.body, "title\nA\n");
}
