//! Built-in core entities used when the schema source is unavailable.

use super::types::{EntityDescriptor, ForeignKey};

/// The core case-management entities with a minimal field list.
pub fn core_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("departments", ["id", "name", "code", "created_at"]),
        EntityDescriptor::new(
            "users",
            ["id", "full_name", "email", "role", "department_id", "created_at"],
        )
        .with_foreign_key(ForeignKey::new("department_id", "departments", "id")),
        EntityDescriptor::new(
            "citizens",
            ["id", "full_name", "email", "phone", "created_at"],
        ),
        EntityDescriptor::new(
            "cases",
            [
                "id",
                "case_number",
                "title",
                "status",
                "priority",
                "citizen_id",
                "assigned_to",
                "department_id",
                "created_at",
                "updated_at",
            ],
        )
        .with_foreign_key(ForeignKey::new("citizen_id", "citizens", "id"))
        .with_foreign_key(ForeignKey::new("assigned_to", "users", "id"))
        .with_foreign_key(ForeignKey::new("department_id", "departments", "id")),
        EntityDescriptor::new(
            "tasks",
            ["id", "case_id", "title", "status", "due_date", "assigned_to", "created_at"],
        )
        .with_foreign_key(ForeignKey::new("case_id", "cases", "id"))
        .with_foreign_key(ForeignKey::new("assigned_to", "users", "id")),
    ]
}
