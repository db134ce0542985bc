// src/model/report.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chart::{ChartConfig, ChartError};
use super::column::ColumnRef;
use super::filter::Filter;

/// Identifier of a persisted report.
pub type ReportId = Uuid;

/// Reasons a report definition cannot be saved or run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("report name is required")]
    MissingName,

    #[error("report base entity is required")]
    MissingBaseEntity,

    #[error("report must select at least one column")]
    NoColumns,

    #[error("invalid chart configuration: {0}")]
    Chart(#[from] ChartError),
}

/// A saved ad-hoc report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDefinition {
    /// `None` until the report is first saved.
    #[serde(default)]
    pub id: Option<ReportId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_entity: String,
    pub selected_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub is_public: bool,
    pub owner_id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ReportDefinition {
    /// Start an empty, unsaved definition owned by `owner_id`.
    pub fn new(
        name: impl Into<String>,
        base_entity: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            base_entity: base_entity.into(),
            selected_columns: Vec::new(),
            filters: Vec::new(),
            chart: ChartConfig::default(),
            is_public: false,
            owner_id: owner_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnRef>) -> Self {
        self.selected_columns = columns;
        self
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_chart(mut self, chart: ChartConfig) -> Self {
        self.chart = chart;
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Module key used by the permission collaborator and the legacy
    /// `module` column. Always the base entity.
    pub fn module_key(&self) -> &str {
        &self.base_entity
    }

    /// Check the minimum a report needs before it can be persisted.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.name.trim().is_empty() {
            return Err(ReportError::MissingName);
        }
        if self.base_entity.trim().is_empty() {
            return Err(ReportError::MissingBaseEntity);
        }
        if self.selected_columns.is_empty() {
            return Err(ReportError::NoColumns);
        }
        self.chart.validate()?;
        Ok(())
    }

    /// Columns the engine must fetch: the selected ones plus whatever the
    /// chart groups or aggregates on, without duplicates.
    pub fn fetch_columns(&self) -> Vec<ColumnRef> {
        let mut columns = self.selected_columns.clone();
        for extra in self.chart.referenced_columns() {
            if !columns.contains(extra) {
                columns.push(extra.clone());
            }
        }
        columns
    }

    /// Can `viewer` read this report without an explicit grant?
    pub fn is_visible_to(&self, viewer: &str) -> bool {
        self.is_public || self.owner_id == viewer
    }
}
