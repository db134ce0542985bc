#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use dossier::schema::{
    EntityDescriptor, ForeignKey, Relationship, SchemaError, SchemaRegistry, SchemaSource,
    StaticSchemaSource,
};

use common::{case_descriptors, case_registry};

/// A source whose backend is down.
struct Unreachable;

#[async_trait]
impl SchemaSource for Unreachable {
    async fn fetch_entities(&self) -> Result<Vec<EntityDescriptor>, SchemaError> {
        Err(SchemaError::SourceUnavailable("connection refused".into()))
    }
}

#[test]
fn test_entities_keep_source_order() {
    let registry = case_registry();
    let names: Vec<&str> = registry
        .list_entities()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, vec!["departments", "users", "citizens", "cases", "tasks"]);
    assert!(!registry.is_degraded());
}

#[test]
fn test_relationships_are_outgoing_only() {
    let registry = case_registry();

    let from_cases = registry.relationships_from("cases").unwrap();
    assert_eq!(from_cases.len(), 3);
    assert_eq!(
        from_cases[0],
        Relationship {
            source_entity: "cases".into(),
            source_column: "assigned_to".into(),
            target_entity: "users".into(),
            target_column: "id".into(),
        }
    );

    // citizens is referenced by cases but owns no foreign keys itself
    assert!(registry.relationships_from("citizens").unwrap().is_empty());
}

#[test]
fn test_require_field() {
    let registry = case_registry();
    assert!(registry.require_field("cases", "title").is_ok());
    assert_eq!(
        registry.require_field("cases", "nope"),
        Err(SchemaError::UnknownField {
            entity: "cases".into(),
            field: "nope".into()
        })
    );
    assert_eq!(
        registry.require_field("invoices", "id"),
        Err(SchemaError::UnknownEntity("invoices".into()))
    );
}

#[test]
fn test_rejects_duplicate_entity() {
    let mut descriptors = case_descriptors();
    descriptors.push(EntityDescriptor::new("users", ["id"]));
    assert_eq!(
        SchemaRegistry::from_descriptors(descriptors).unwrap_err(),
        SchemaError::DuplicateEntity("users".into())
    );
}

#[test]
fn test_rejects_fk_to_unknown_entity() {
    let err = SchemaRegistry::from_descriptors(vec![EntityDescriptor::new(
        "cases",
        ["id", "owner_id"],
    )
    .with_foreign_key(ForeignKey::new("owner_id", "owners", "id"))])
    .unwrap_err();
    assert_eq!(err, SchemaError::UnknownEntity("owners".into()));
}

#[test]
fn test_rejects_fk_to_missing_target_column() {
    let err = SchemaRegistry::from_descriptors(vec![
        EntityDescriptor::new("users", ["user_id"]),
        EntityDescriptor::new("cases", ["id", "assigned_to"])
            .with_foreign_key(ForeignKey::new("assigned_to", "users", "id")),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownField {
            entity: "users".into(),
            field: "id".into()
        }
    );
}

#[test]
fn test_rejects_invalid_names() {
    let err = SchemaRegistry::from_descriptors(vec![EntityDescriptor::new(
        "case files",
        ["id"],
    )])
    .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidName(_)));

    let err = SchemaRegistry::from_descriptors(vec![EntityDescriptor::new(
        "cases",
        ["id", "title; drop"],
    )])
    .unwrap_err();
    assert_eq!(err, SchemaError::InvalidName("cases.title; drop".into()));
}

#[test]
fn test_route_hint_for_indirect_entities() {
    let registry = case_registry();
    assert_eq!(
        registry.find_route("tasks", "users").unwrap(),
        vec!["tasks", "cases", "users"]
    );
    assert_eq!(registry.find_route("cases", "users").unwrap(), vec!["cases", "users"]);
    assert!(registry.find_route("users", "cases").is_none());
    assert!(registry.find_route("cases", "invoices").is_none());
}

#[tokio::test]
async fn test_load_from_json_document() {
    let source = StaticSchemaSource::from_json_str(
        r#"{"entities": [
            {"name": "users", "fields": ["id", "name"]},
            {"name": "cases", "fields": ["id", "title", "assigned_to"],
             "foreign_keys": [
                {"column": "assigned_to", "references_table": "users", "references_column": "id"}
             ]}
        ]}"#,
    )
    .unwrap();

    let registry = SchemaRegistry::load(&source).await;
    assert!(!registry.is_degraded());
    assert_eq!(registry.list_entities().len(), 2);
    assert_eq!(registry.relationships_from("cases").unwrap().len(), 1);
}

#[tokio::test]
async fn test_load_from_toml_document() {
    let source = StaticSchemaSource::from_toml_str(
        r#"
[[entities]]
name = "departments"
fields = ["id", "name"]

[[entities]]
name = "users"
fields = ["id", "name", "department_id"]

[[entities.foreign_keys]]
column = "department_id"
references_table = "departments"
references_column = "id"
"#,
    )
    .unwrap();

    let registry = SchemaRegistry::try_load(&source).await.unwrap();
    let rel = &registry.relationships_from("users").unwrap()[0];
    assert_eq!(rel.target_entity, "departments");
}

#[tokio::test]
async fn test_unavailable_source_degrades_to_core_entities() {
    let registry = SchemaRegistry::load(&Unreachable).await;
    assert!(registry.is_degraded());
    for core in ["cases", "users", "departments", "citizens", "tasks"] {
        assert!(registry.get_entity(core).is_ok(), "missing {}", core);
    }
}

#[tokio::test]
async fn test_inconsistent_source_degrades_too() {
    let source = StaticSchemaSource::new(vec![EntityDescriptor::new("cases", ["id", "x"])
        .with_foreign_key(ForeignKey::new("x", "ghosts", "id"))]);
    assert!(SchemaRegistry::try_load(&source).await.is_err());
    assert!(SchemaRegistry::load(&source).await.is_degraded());
}

#[tokio::test]
async fn test_try_load_surfaces_source_error() {
    let err = SchemaRegistry::try_load(&Unreachable).await.unwrap_err();
    assert_eq!(
        err,
        SchemaError::SourceUnavailable("connection refused".into())
    );
}
