//! # Dossier
//!
//! An ad-hoc multi-table reporting engine for case-management data.
//!
//! ## Architecture
//!
//! A user picks a base entity, pulls in fields from directly related
//! entities, filters, groups and charts the result, then saves, re-runs or
//! exports it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │         SchemaSource (document / built-in entities)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema]
//! ┌─────────────────────────────────────────────────────────┐
//! │          SchemaRegistry (entities + FK graph)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ReportDefinition ──► QueryPlan / ScalarQueryPlan       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [gateway]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ExecutionGateway ──► rows               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [aggregate, shape, export]
//! ┌─────────────────────────────────────────────────────────┐
//! │        table / bar / line / pie view models, CSV         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod planner;
pub mod schema;
pub mod session;
pub mod shape;
pub mod store;

pub use access::{AllowAll, PermissionCheck, PermissionTarget};
pub use gateway::{ExecutionError, ExecutionGateway, MemoryGateway};
pub use model::{ChartConfig, ColumnRef, Filter, FilterOperator, ReportDefinition, Row};
pub use planner::{CompileError, QueryCompiler, QueryPlan};
pub use schema::{SchemaError, SchemaRegistry};
pub use session::{ReportSession, SessionError};
pub use store::{ReportStore, SqliteReportStore};
