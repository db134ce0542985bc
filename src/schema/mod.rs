//! Schema registry module.
//!
//! Exposes, for every reportable entity, its field list and the foreign keys
//! that connect it to other entities.
//!
//! ```text
//! ┌──────────────────┐   fetch_entities()   ┌─────────────────────────┐
//! │  SchemaSource    │ ───────────────────▶ │     SchemaRegistry      │
//! │  (backend / doc) │                      │  entities + FK graph    │
//! └──────────────────┘                      │  (immutable snapshot)   │
//!          │ unavailable                    └─────────────────────────┘
//!          ▼                                           ▲
//! ┌──────────────────┐                                 │
//! │  core_entities() │ ────────── degraded mode ───────┘
//! └──────────────────┘
//! ```

mod fallback;
mod registry;
mod source;
mod types;

pub use fallback::core_entities;
pub use registry::SchemaRegistry;
pub use source::{SchemaSource, StaticSchemaSource};
pub use types::{Entity, EntityDescriptor, ForeignKey, Relationship};

/// Result type for schema lookups.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised by the schema registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("entity '{0}' is described more than once")]
    DuplicateEntity(String),

    #[error("invalid entity or field name '{0}'")]
    InvalidName(String),

    #[error("schema source unavailable: {0}")]
    SourceUnavailable(String),
}
