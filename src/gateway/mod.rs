//! Execution gateway module.
//!
//! The engine never runs queries itself. It hands compiled plans to an
//! [`ExecutionGateway`], a handle passed explicitly to whoever executes, so
//! tests can substitute their own.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐      QueryPlan / ScalarQueryPlan
//! │   QueryCompiler    │ ─────────────────────────────────┐
//! └────────────────────┘                                  ▼
//!                                        ┌──────────────────────────────┐
//!                                        │      ExecutionGateway        │
//!                                        │  execute() / execute_scalar()│
//!                                        └──────────────────────────────┘
//!                                           │                    │
//!                                           ▼                    ▼
//!                                ┌──────────────────┐  ┌──────────────────┐
//!                                │   SqlRenderer    │  │  MemoryGateway   │
//!                                │ (backend adapter)│  │ (tests, CLI)     │
//!                                └──────────────────┘  └──────────────────┘
//! ```
//!
//! No retries and no timeouts are applied here; both belong to the caller
//! and the backend respectively.

mod error;
pub mod memory;
pub mod sql;

pub use error::{ExecutionError, ExecutionResult};
pub use memory::MemoryGateway;
pub use sql::{RenderedQuery, SqlRenderer};

use async_trait::async_trait;

use crate::planner::{QueryPlan, ScalarQueryPlan};

pub use crate::model::Row;

/// Value of a scalar metric. `None` when the aggregate has no input, e.g.
/// the average of an empty table.
pub type Scalar = Option<f64>;

/// Trait for executing compiled plans against the backing store.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Run a row query. At most `plan.limit` rows come back.
    async fn execute(&self, plan: &QueryPlan) -> ExecutionResult<Vec<Row>>;

    /// Run a scalar aggregate.
    async fn execute_scalar(&self, plan: &ScalarQueryPlan) -> ExecutionResult<Scalar>;
}
