#[path = "../common/mod.rs"]
mod common;

use dossier::model::{
    Aggregation, ChartConfig, ChartError, ChartType, ColumnRef, Filter, FilterOperator,
    FilterValue, ReportDefinition, TriState,
};
use dossier::planner::{
    CompileError, JoinError, JoinType, Predicate, QueryCompiler, TableColumn, DEFAULT_ROW_LIMIT,
};
use dossier::schema::SchemaError;

use common::case_registry;

fn cols(names: &[&str]) -> Vec<ColumnRef> {
    names.iter().map(|n| ColumnRef::parse(n).unwrap()).collect()
}

#[test]
fn test_open_cases_with_assignee() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title", "users.name"]),
            &[Filter::eq(ColumnRef::base("status"), "open")],
        )
        .unwrap();

    assert_eq!(plan.base_entity, "cases");
    assert_eq!(plan.joins.len(), 1);
    assert_eq!(plan.joins[0].entity, "users");
    assert_eq!(plan.joins[0].join_type, JoinType::Left);
    assert_eq!(plan.joins[0].left, TableColumn::new("cases", "assigned_to"));
    assert_eq!(plan.joins[0].right, TableColumn::new("users", "id"));

    let sources: Vec<&TableColumn> = plan.projections.iter().map(|p| &p.source).collect();
    assert_eq!(
        sources,
        vec![
            &TableColumn::new("cases", "title"),
            &TableColumn::new("users", "name")
        ]
    );
    assert_eq!(plan.output_columns(), vec!["title", "users.name"]);

    assert_eq!(
        plan.predicates,
        vec![Predicate::Eq {
            column: TableColumn::new("cases", "status"),
            value: FilterValue::text("open"),
        }]
    );
    assert_eq!(plan.limit, DEFAULT_ROW_LIMIT);
    assert_eq!(plan.limit, 50);
}

#[test]
fn test_compilation_is_deterministic() {
    let registry = case_registry();
    let compiler = QueryCompiler::new(&registry);
    let columns = cols(&["citizens.full_name", "title", "users.email"]);
    let filters = [Filter::new(
        ColumnRef::related("users", "name"),
        FilterOperator::Ilike,
        "%an%",
    )];

    let first = compiler.compile_rows("cases", &columns, &filters).unwrap();
    let second = compiler.compile_rows("cases", &columns, &filters).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_filter_on_related_entity_adds_join() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title"]),
            &[Filter::new(
                ColumnRef::related("citizens", "full_name"),
                FilterOperator::Like,
                "C%",
            )],
        )
        .unwrap();

    assert!(plan.join_for("citizens").is_some());
    assert_eq!(plan.output_columns(), vec!["title"]);
    assert_eq!(
        plan.predicates[0],
        Predicate::Like {
            column: TableColumn::new("citizens", "full_name"),
            pattern: "C%".into(),
        }
    );
}

#[test]
fn test_every_operator_has_a_predicate() {
    let registry = case_registry();
    let compiler = QueryCompiler::new(&registry);
    for op in FilterOperator::ALL {
        let value = match op {
            FilterOperator::Is => FilterValue::Bool(true),
            FilterOperator::Like | FilterOperator::Ilike => FilterValue::text("%x%"),
            _ => FilterValue::Number(3.0),
        };
        let plan = compiler
            .compile_rows(
                "cases",
                &cols(&["title"]),
                &[Filter::new(ColumnRef::base("amount"), op, value)],
            )
            .unwrap();
        assert_eq!(plan.predicates[0].operator(), op);
    }
}

#[test]
fn test_is_predicates() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title"]),
            &[
                Filter::new(ColumnRef::base("closed_at"), FilterOperator::Is, FilterValue::Null),
                Filter::new(ColumnRef::base("is_urgent"), FilterOperator::Is, "false"),
            ],
        )
        .unwrap();
    assert_eq!(
        plan.predicates,
        vec![
            Predicate::Is {
                column: TableColumn::new("cases", "closed_at"),
                value: TriState::Null
            },
            Predicate::Is {
                column: TableColumn::new("cases", "is_urgent"),
                value: TriState::False
            },
        ]
    );
}

#[test]
fn test_null_comparison_must_use_is() {
    let registry = case_registry();
    let err = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title"]),
            &[Filter::eq(ColumnRef::base("closed_at"), FilterValue::Null)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::InvalidFilter { ref field, operator: FilterOperator::Eq, .. } if field == "closed_at"
    ));
    assert_eq!(err.user_message(), "invalid report configuration");
}

#[test]
fn test_like_needs_text_pattern() {
    let registry = case_registry();
    let err = QueryCompiler::new(&registry)
        .compile_rows(
            "cases",
            &cols(&["title"]),
            &[Filter::new(ColumnRef::base("title"), FilterOperator::Like, 12i64)],
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::InvalidFilter { .. }));
}

#[test]
fn test_empty_column_list() {
    let registry = case_registry();
    let err = QueryCompiler::new(&registry)
        .compile_rows("cases", &[], &[])
        .unwrap_err();
    assert_eq!(err, CompileError::NoColumns);
}

#[test]
fn test_unknown_fields_and_entities() {
    let registry = case_registry();
    let compiler = QueryCompiler::new(&registry);

    assert_eq!(
        compiler.compile_rows("cases", &cols(&["users.salary"]), &[]).unwrap_err(),
        CompileError::Schema(SchemaError::UnknownField {
            entity: "users".into(),
            field: "salary".into()
        })
    );
    assert_eq!(
        compiler.compile_rows("invoices", &cols(&["id"]), &[]).unwrap_err(),
        CompileError::Schema(SchemaError::UnknownEntity("invoices".into()))
    );
    assert_eq!(
        compiler
            .compile_rows(
                "cases",
                &cols(&["title"]),
                &[Filter::eq(ColumnRef::base("colour"), "red")]
            )
            .unwrap_err(),
        CompileError::Schema(SchemaError::UnknownField {
            entity: "cases".into(),
            field: "colour".into()
        })
    );
}

#[test]
fn test_two_hop_reference_fails_to_compile() {
    let registry = case_registry();
    let err = QueryCompiler::new(&registry)
        .compile_rows("tasks", &cols(&["title", "users.name"]), &[])
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Join(JoinError::NoDirectRelationship { .. })
    ));
}

#[test]
fn test_report_fetches_chart_fields() {
    let registry = case_registry();
    let report = ReportDefinition::new("Amount by priority", "cases", "u1")
        .with_columns(cols(&["title"]))
        .with_chart(
            ChartConfig::chart(ChartType::Bar)
                .with_aggregation(Aggregation::Sum)
                .with_group_by(ColumnRef::base("priority"))
                .with_value_field(ColumnRef::base("amount")),
        );

    let plan = QueryCompiler::new(&registry).compile_report(&report).unwrap();
    assert_eq!(plan.output_columns(), vec!["title", "priority", "amount"]);
}

#[test]
fn test_report_with_invalid_chart() {
    let registry = case_registry();
    let report = ReportDefinition::new("Broken", "cases", "u1")
        .with_columns(cols(&["title"]))
        .with_chart(
            ChartConfig::chart(ChartType::Line)
                .with_aggregation(Aggregation::Max)
                .with_group_by(ColumnRef::base("created_at")),
        );
    assert_eq!(
        QueryCompiler::new(&registry).compile_report(&report).unwrap_err(),
        CompileError::Chart(ChartError::MissingValueField(Aggregation::Max))
    );
}

#[test]
fn test_row_limit_is_fixed_per_compiler() {
    let registry = case_registry();
    let plan = QueryCompiler::new(&registry)
        .with_row_limit(10)
        .compile_rows("cases", &cols(&["title"]), &[])
        .unwrap();
    assert_eq!(plan.limit, 10);
}
