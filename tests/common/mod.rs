//! Shared fixtures: a small case-management schema and matching rows.
#![allow(dead_code)]

use dossier::gateway::MemoryGateway;
use dossier::model::Row;
use dossier::schema::{EntityDescriptor, ForeignKey, SchemaRegistry};
use serde_json::{json, Value};

pub fn case_descriptors() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("departments", ["id", "name"]),
        EntityDescriptor::new("users", ["id", "name", "email", "department_id"])
            .with_foreign_key(ForeignKey::new("department_id", "departments", "id")),
        EntityDescriptor::new("citizens", ["id", "full_name"]),
        EntityDescriptor::new(
            "cases",
            [
                "id",
                "title",
                "status",
                "priority",
                "amount",
                "is_urgent",
                "assigned_to",
                "reviewer_id",
                "citizen_id",
                "created_at",
                "closed_at",
            ],
        )
        .with_foreign_key(ForeignKey::new("assigned_to", "users", "id"))
        .with_foreign_key(ForeignKey::new("reviewer_id", "users", "id"))
        .with_foreign_key(ForeignKey::new("citizen_id", "citizens", "id")),
        EntityDescriptor::new("tasks", ["id", "case_id", "title", "done"])
            .with_foreign_key(ForeignKey::new("case_id", "cases", "id")),
    ]
}

pub fn case_registry() -> SchemaRegistry {
    SchemaRegistry::from_descriptors(case_descriptors()).expect("fixture schema is consistent")
}

pub fn rows(value: Value) -> Vec<Row> {
    value
        .as_array()
        .expect("fixture rows are an array")
        .iter()
        .map(|v| v.as_object().cloned().expect("fixture row is an object"))
        .collect()
}

pub fn case_rows() -> Vec<Row> {
    rows(json!([
        {"id": 1, "title": "Noise complaint", "status": "open", "priority": "high",
         "amount": 1, "is_urgent": true, "assigned_to": 10, "reviewer_id": 11,
         "citizen_id": 100, "created_at": "2024-03-04T09:00:00Z", "closed_at": null},
        {"id": 2, "title": "Pothole", "status": "open", "priority": "low",
         "amount": 5, "is_urgent": false, "assigned_to": 11, "reviewer_id": null,
         "citizen_id": 101, "created_at": "2024-03-18T12:00:00Z", "closed_at": null},
        {"id": 3, "title": "Permit, renewal", "status": "closed", "priority": "high",
         "amount": 2, "is_urgent": null, "assigned_to": null, "reviewer_id": 10,
         "citizen_id": 100, "created_at": "2024-04-02T08:30:00Z",
         "closed_at": "2024-04-09T10:00:00Z"},
        {"id": 4, "title": "Streetlight out", "status": "open", "priority": "low",
         "amount": 10, "is_urgent": false, "assigned_to": 99, "reviewer_id": null,
         "citizen_id": 102, "created_at": "2024-04-20T16:00:00Z", "closed_at": null}
    ]))
}

pub fn user_rows() -> Vec<Row> {
    rows(json!([
        {"id": 10, "name": "Ana", "email": "ana@example.gov", "department_id": 1},
        {"id": 11, "name": "Ben", "email": "ben@example.gov", "department_id": 2}
    ]))
}

pub fn case_gateway() -> MemoryGateway {
    MemoryGateway::new()
        .with_table("cases", case_rows())
        .with_table("users", user_rows())
        .with_table(
            "departments",
            rows(json!([{"id": 1, "name": "Roads"}, {"id": 2, "name": "Licensing"}])),
        )
        .with_table(
            "citizens",
            rows(json!([
                {"id": 100, "full_name": "Cora Diaz"},
                {"id": 101, "full_name": "Dev Patel"},
                {"id": 102, "full_name": "Eli Novak"}
            ])),
        )
        .with_table("tasks", Vec::new())
}
