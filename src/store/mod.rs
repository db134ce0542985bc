//! Report definition persistence.
//!
//! The engine only ever loads, saves and lists definitions; deleting them is
//! someone else's job.

mod sqlite;

pub use sqlite::SqliteReportStore;

use crate::model::{ReportDefinition, ReportError, ReportId};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to determine store directory")]
    NoStoreDir,

    #[error("Report not found: {0}")]
    NotFound(ReportId),

    #[error("Invalid report: {0}")]
    Invalid(#[from] ReportError),

    #[error("Corrupt stored report {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Load/save façade over wherever definitions live.
pub trait ReportStore {
    /// Persist `definition` and return its id.
    ///
    /// When the definition already has an id the stored columns, filters and
    /// chart are replaced wholesale, never merged.
    fn save(&self, definition: &ReportDefinition) -> StoreResult<ReportId>;

    fn load(&self, id: ReportId) -> StoreResult<ReportDefinition>;

    /// Reports owned by `owner`, plus other users' public ones when
    /// `include_public` is set. Newest first.
    fn list_for(&self, owner: &str, include_public: bool) -> StoreResult<Vec<ReportDefinition>>;
}
