//! Read-only registry snapshot of reportable entities.

use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};

use super::fallback::core_entities;
use super::source::SchemaSource;
use super::types::{Entity, EntityDescriptor, Relationship};
use super::{SchemaError, SchemaResult};
use crate::model::is_identifier;

/// Immutable snapshot of entities and their foreign-key relationships.
///
/// Refreshing means building a new snapshot; nothing mutates an existing one,
/// so a compiled plan is always consistent with the snapshot it came from.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    /// Relationship graph, node `i` is `entities[i]`.
    graph: DiGraph<String, usize>,
    degraded: bool,
}

impl SchemaRegistry {
    /// Build a snapshot from raw descriptors, validating every relationship.
    pub fn from_descriptors(descriptors: Vec<EntityDescriptor>) -> SchemaResult<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, d) in descriptors.iter().enumerate() {
            if !is_identifier(&d.name) {
                return Err(SchemaError::InvalidName(d.name.clone()));
            }
            if let Some(bad) = d.fields.iter().find(|f| !is_identifier(f)) {
                return Err(SchemaError::InvalidName(format!("{}.{}", d.name, bad)));
            }
            if index.insert(d.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateEntity(d.name.clone()));
            }
        }

        let mut graph = DiGraph::with_capacity(descriptors.len(), 0);
        for d in &descriptors {
            graph.add_node(d.name.clone());
        }

        let mut entities = Vec::with_capacity(descriptors.len());
        for (i, d) in descriptors.iter().enumerate() {
            let mut relationships = Vec::with_capacity(d.foreign_keys.len());
            for fk in &d.foreign_keys {
                if !d.fields.contains(&fk.column) {
                    return Err(SchemaError::UnknownField {
                        entity: d.name.clone(),
                        field: fk.column.clone(),
                    });
                }
                let target_idx = *index
                    .get(&fk.references_table)
                    .ok_or_else(|| SchemaError::UnknownEntity(fk.references_table.clone()))?;
                let target = &descriptors[target_idx];
                if !target.fields.contains(&fk.references_column) {
                    return Err(SchemaError::UnknownField {
                        entity: target.name.clone(),
                        field: fk.references_column.clone(),
                    });
                }

                graph.add_edge(
                    NodeIndex::new(i),
                    NodeIndex::new(target_idx),
                    relationships.len(),
                );
                relationships.push(Relationship {
                    source_entity: d.name.clone(),
                    source_column: fk.column.clone(),
                    target_entity: fk.references_table.clone(),
                    target_column: fk.references_column.clone(),
                });
            }

            entities.push(Entity {
                name: d.name.clone(),
                fields: d.fields.clone(),
                relationships,
            });
        }

        Ok(Self {
            entities,
            index,
            graph,
            degraded: false,
        })
    }

    /// The built-in core entities, flagged as degraded.
    pub fn fallback() -> Self {
        let mut registry = Self::from_descriptors(core_entities())
            .unwrap_or_else(|_| Self::empty());
        registry.degraded = true;
        registry
    }

    fn empty() -> Self {
        Self {
            entities: Vec::new(),
            index: HashMap::new(),
            graph: DiGraph::new(),
            degraded: true,
        }
    }

    /// Fetch a fresh snapshot, failing if the source is unusable.
    pub async fn try_load(source: &dyn SchemaSource) -> SchemaResult<Self> {
        let descriptors = source.fetch_entities().await?;
        let registry = Self::from_descriptors(descriptors)?;
        tracing::debug!(entities = registry.entities.len(), "schema registry loaded");
        Ok(registry)
    }

    /// Fetch a fresh snapshot, falling back to the core entities if the
    /// source fails or describes an inconsistent schema.
    pub async fn load(source: &dyn SchemaSource) -> Self {
        match Self::try_load(source).await {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(error = %e, "schema source unusable, using core entity fallback");
                Self::fallback()
            }
        }
    }

    /// True when this snapshot is the built-in fallback.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn list_entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get_entity(&self, name: &str) -> SchemaResult<&Entity> {
        self.index
            .get(name)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    pub fn relationships_from(&self, name: &str) -> SchemaResult<&[Relationship]> {
        Ok(&self.get_entity(name)?.relationships)
    }

    /// Fail unless `entity` exists and has `field`.
    pub fn require_field(&self, entity: &str, field: &str) -> SchemaResult<()> {
        if self.get_entity(entity)?.has_field(field) {
            Ok(())
        } else {
            Err(SchemaError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            })
        }
    }

    /// Shortest chain of entities from `from` to `to` following foreign keys.
    ///
    /// Only used to explain why a reference cannot be joined; plans never
    /// follow more than one relationship.
    pub fn find_route(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let start = NodeIndex::new(*self.index.get(from)?);
        let goal = NodeIndex::new(*self.index.get(to)?);
        let (_, path) = astar(&self.graph, start, |n| n == goal, |_| 1u32, |_| 0)?;
        Some(
            path.into_iter()
                .map(|n| self.graph[n].clone())
                .collect(),
        )
    }
}
