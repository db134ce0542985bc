//! SchemaSource trait definition.
//!
//! A schema source is whatever can describe the hosted backend's tables:
//! the backend's introspection endpoint in production, a JSON or TOML
//! document for the CLI and tests.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use super::types::EntityDescriptor;
use super::SchemaError;

/// Trait for fetching entity metadata.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Describe every reportable entity with its fields and foreign keys.
    async fn fetch_entities(&self) -> Result<Vec<EntityDescriptor>, SchemaError>;
}

#[derive(Deserialize)]
struct SchemaDocument {
    entities: Vec<EntityDescriptor>,
}

/// A schema source backed by an in-memory list of descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    entities: Vec<EntityDescriptor>,
}

impl StaticSchemaSource {
    pub fn new(entities: Vec<EntityDescriptor>) -> Self {
        Self { entities }
    }

    /// Parse `{"entities": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = serde_json::from_str(json)
            .map_err(|e| SchemaError::SourceUnavailable(format!("invalid schema JSON: {}", e)))?;
        Ok(Self::new(doc.entities))
    }

    /// Parse `[[entities]]` tables.
    pub fn from_toml_str(text: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = toml::from_str(text)
            .map_err(|e| SchemaError::SourceUnavailable(format!("invalid schema TOML: {}", e)))?;
        Ok(Self::new(doc.entities))
    }

    /// Load a schema document, choosing the format by file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SchemaError::SourceUnavailable(format!("cannot read '{}': {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn fetch_entities(&self) -> Result<Vec<EntityDescriptor>, SchemaError> {
        Ok(self.entities.clone())
    }
}
