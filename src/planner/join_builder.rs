//! Join resolution against the schema registry.
//!
//! Every related entity a report touches must be one foreign key away from
//! the base entity. Joins are emitted once per related entity, in the order
//! the entities are first referenced, and always as LEFT joins so base rows
//! without a match are kept.

use crate::model::ColumnRef;
use crate::planner::plan::{JoinStep, JoinType, TableColumn};
use crate::planner::{JoinError, JoinResult};
use crate::schema::{Relationship, SchemaRegistry};

pub struct JoinBuilder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> JoinBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Build the join list needed to satisfy `references` from `base`.
    ///
    /// References to the base entity itself, qualified or not, need no join.
    pub fn build_joins<'r, I>(&self, base: &str, references: I) -> JoinResult<Vec<JoinStep>>
    where
        I: IntoIterator<Item = &'r ColumnRef>,
    {
        self.registry.get_entity(base)?;

        let mut joins: Vec<JoinStep> = Vec::new();
        for reference in references {
            let related = match reference.related_entity() {
                Some(entity) if entity != base => entity,
                _ => continue,
            };

            if joins.iter().any(|j| j.entity == related) {
                continue;
            }

            let relationship = self.direct_relationship(base, related)?;
            joins.push(JoinStep {
                entity: related.to_string(),
                alias: related.to_string(),
                join_type: JoinType::Left,
                left: TableColumn::new(base, &relationship.source_column),
                right: TableColumn::new(related, &relationship.target_column),
                relationship: relationship.clone(),
            });
        }

        Ok(joins)
    }

    /// The first declared relationship from `base` to `related`.
    fn direct_relationship(&self, base: &str, related: &str) -> JoinResult<&'a Relationship> {
        // Unknown entities are a schema problem, not a join problem.
        self.registry.get_entity(related)?;

        self.registry
            .relationships_from(base)?
            .iter()
            .find(|r| r.target_entity == related)
            .ok_or_else(|| JoinError::NoDirectRelationship {
                base: base.to_string(),
                related: related.to_string(),
                route: self.registry.find_route(base, related),
            })
    }
}
