#[path = "../common/mod.rs"]
mod common;

use dossier::gateway::SqlRenderer;
use dossier::model::{Aggregation, ColumnRef, Filter, FilterOperator, FilterValue};
use dossier::planner::QueryCompiler;
use insta::assert_snapshot;

use common::case_registry;

fn cols(names: &[&str]) -> Vec<ColumnRef> {
    names.iter().map(|n| ColumnRef::parse(n).unwrap()).collect()
}

#[test]
fn render_open_cases_with_assignee() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title", "users.name"]),
            &[Filter::eq(ColumnRef::base("status"), "open")],
        )
        .unwrap();

    let rendered = SqlRenderer::new().render(&plan).unwrap();
    assert_snapshot!(rendered.sql, @r#"SELECT "cases"."title" AS "title", "users"."name" AS "users.name" FROM "cases" LEFT JOIN "users" ON "cases"."assigned_to" = "users"."id" WHERE "cases"."status" = $1 LIMIT 50"#);
    assert_eq!(rendered.params, vec![FilterValue::text("open")]);
}

#[test]
fn render_without_filters() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .with_row_limit(5)
        .compile_rows("cases", &cols(&["id", "cases.title"]), &[])
        .unwrap();

    let rendered = SqlRenderer::new().render(&plan).unwrap();
    assert_snapshot!(rendered.sql, @r#"SELECT "cases"."id" AS "id", "cases"."title" AS "cases.title" FROM "cases" LIMIT 5"#);
    assert!(rendered.params.is_empty());
}

#[test]
fn render_mixed_predicates_binds_in_order() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title", "citizens.full_name"]),
            &[
                Filter::new(ColumnRef::base("amount"), FilterOperator::Gt, 2i64),
                Filter::new(
                    ColumnRef::related("citizens", "full_name"),
                    FilterOperator::Ilike,
                    "%diaz%",
                ),
                Filter::new(ColumnRef::base("status"), FilterOperator::Neq, "closed"),
                Filter::new(ColumnRef::base("closed_at"), FilterOperator::Is, "null"),
            ],
        )
        .unwrap();

    let rendered = SqlRenderer::new().render(&plan).unwrap();
    assert_snapshot!(rendered.sql, @r#"SELECT "cases"."title" AS "title", "citizens"."full_name" AS "citizens.full_name" FROM "cases" LEFT JOIN "citizens" ON "cases"."citizen_id" = "citizens"."id" WHERE "cases"."amount" > $1 AND "citizens"."full_name" ILIKE $2 AND "cases"."status" <> $3 AND "cases"."closed_at" IS NULL LIMIT 50"#);
    assert_eq!(
        rendered.params,
        vec![
            FilterValue::Number(2.0),
            FilterValue::text("%diaz%"),
            FilterValue::text("closed"),
        ]
    );
}

#[test]
fn render_boolean_tests() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["id"]),
            &[Filter::new(ColumnRef::base("is_urgent"), FilterOperator::Is, true)],
        )
        .unwrap();

    let rendered = SqlRenderer::new().render(&plan).unwrap();
    assert_snapshot!(rendered.sql, @r#"SELECT "cases"."id" AS "id" FROM "cases" WHERE "cases"."is_urgent" IS TRUE LIMIT 50"#);
}

#[test]
fn render_scalar_metrics() {
    let registry = case_registry();
    let compiler = QueryCompiler::new(&registry);
    let renderer = SqlRenderer::new();

    let count = compiler.compile_metric("cases", "*", Aggregation::Count).unwrap();
    assert_snapshot!(renderer.render_scalar(&count).unwrap().sql, @r#"SELECT COUNT(*) AS "value" FROM "cases""#);

    let avg = compiler.compile_metric("cases", "amount", Aggregation::Avg).unwrap();
    assert_snapshot!(renderer.render_scalar(&avg).unwrap().sql, @r#"SELECT AVG("amount") AS "value" FROM "cases""#);
}
