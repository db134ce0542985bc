//! Report builder session.
//!
//! A session owns one report definition while a user edits or views it, and
//! the last result that was fetched for it. Runs are split in two phases so
//! a result that arrives after the user switched base entity can be
//! recognised and thrown away:
//!
//! ```text
//! begin_run() ──► PendingRun { plan, tag } ──► gateway ──► commit(tag, result)
//!                                                            │
//!                               Applied / Dropped (stale) / Failed
//! ```

use thiserror::Error;

use crate::access::{PermissionCheck, PermissionTarget};
use crate::aggregate::{aggregate, Aggregated, GroupSpec, ViewerZone};
use crate::export::CsvExport;
use crate::gateway::{ExecutionError, ExecutionGateway, ExecutionResult};
use crate::model::{
    ChartConfig, ChartError, ColumnRef, Filter, ReportDefinition, ReportError, ReportId, Row,
};
use crate::planner::{CompileError, QueryCompiler, QueryPlan};
use crate::schema::{SchemaError, SchemaRegistry};
use crate::shape::{shape, ShapeError, ShapeInput, ViewModel};
use crate::store::{ReportStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Query failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("Not allowed to {action} {target}")]
    PermissionDenied {
        action: &'static str,
        target: PermissionTarget,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Identifies the session state a run was started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTag {
    pub base_entity: String,
    pub generation: u64,
    /// Selected columns at the time of the run, in display order.
    pub columns: Vec<ColumnRef>,
    /// Chart the rows were fetched for.
    pub chart: ChartConfig,
}

/// A compiled query waiting to be executed.
#[derive(Debug, Clone)]
pub struct PendingRun {
    pub plan: QueryPlan,
    pub tag: RunTag,
}

/// Last successfully fetched result.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub base_entity: String,
    pub generation: u64,
    pub columns: Vec<ColumnRef>,
    pub chart: ChartConfig,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Applied { rows: usize },
    /// The session moved on while the query ran.
    Dropped,
    /// The previous result, if any, is still shown.
    Failed(ExecutionError),
}

pub struct ReportSession<'a> {
    compiler: QueryCompiler<'a>,
    permissions: &'a dyn PermissionCheck,
    definition: ReportDefinition,
    generation: u64,
    last_result: Option<RunResult>,
    last_error: Option<ExecutionError>,
    zone: ViewerZone,
}

impl<'a> ReportSession<'a> {
    /// Start a blank report for `owner_id`.
    pub fn new(
        registry: &'a SchemaRegistry,
        permissions: &'a dyn PermissionCheck,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            compiler: QueryCompiler::new(registry),
            permissions,
            definition: ReportDefinition::new("", "", owner_id),
            generation: 0,
            last_result: None,
            last_error: None,
            zone: ViewerZone::default(),
        }
    }

    pub fn with_row_limit(mut self, row_limit: u64) -> Self {
        self.compiler = self.compiler.with_row_limit(row_limit);
        self
    }

    pub fn with_zone(mut self, zone: ViewerZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn definition(&self) -> &ReportDefinition {
        &self.definition
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_result(&self) -> Option<&RunResult> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&ExecutionError> {
        self.last_error.as_ref()
    }

    /// Switch the base entity. Columns, filters, chart settings and the
    /// fetched result all belong to the old entity and are discarded.
    pub fn set_base_entity(&mut self, base: &str) -> SessionResult<()> {
        self.compiler.registry().get_entity(base)?;
        self.definition.base_entity = base.to_string();
        self.definition.selected_columns.clear();
        self.definition.filters.clear();
        self.definition.chart = ChartConfig::default();
        self.last_result = None;
        self.last_error = None;
        self.bump();
        Ok(())
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnRef>) {
        self.definition.selected_columns = columns;
        self.bump();
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.definition.filters = filters;
        self.bump();
    }

    pub fn set_chart(&mut self, chart: ChartConfig) -> SessionResult<()> {
        chart.validate()?;
        self.definition.chart = chart;
        self.bump();
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.definition.name = name.into();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.definition.description = description;
    }

    pub fn set_public(&mut self, is_public: bool) {
        self.definition.is_public = is_public;
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    fn target(&self) -> PermissionTarget {
        match self.definition.id {
            Some(id) => PermissionTarget::Report(id),
            None => PermissionTarget::Module(self.definition.module_key().to_string()),
        }
    }

    fn require_view(&self, target: PermissionTarget) -> SessionResult<()> {
        if self.permissions.can_view(&target) {
            Ok(())
        } else {
            Err(SessionError::PermissionDenied {
                action: "view",
                target,
            })
        }
    }

    /// Replace the session's report with a saved one.
    pub fn open(&mut self, store: &dyn ReportStore, id: ReportId) -> SessionResult<()> {
        self.require_view(PermissionTarget::Report(id))?;
        let definition = store.load(id)?;
        self.definition = definition;
        self.last_result = None;
        self.last_error = None;
        self.bump();
        Ok(())
    }

    /// Persist the current definition. New reports receive their id here.
    pub fn save(&mut self, store: &dyn ReportStore) -> SessionResult<ReportId> {
        let target = self.target();
        if !self.permissions.can_edit(&target) {
            return Err(SessionError::PermissionDenied {
                action: "edit",
                target,
            });
        }
        let id = store.save(&self.definition)?;
        self.definition.id = Some(id);
        Ok(id)
    }

    /// Compile the current definition and tag it with the current state.
    pub fn begin_run(&self) -> SessionResult<PendingRun> {
        self.require_view(self.target())?;
        let plan = self.compiler.compile_report(&self.definition)?;
        Ok(PendingRun {
            plan,
            tag: RunTag {
                base_entity: self.definition.base_entity.clone(),
                generation: self.generation,
                columns: self.definition.selected_columns.clone(),
                chart: self.definition.chart.clone(),
            },
        })
    }

    /// Record the outcome of a run started with [`begin_run`](Self::begin_run).
    pub fn commit(&mut self, tag: RunTag, result: ExecutionResult<Vec<Row>>) -> CommitOutcome {
        if tag.base_entity != self.definition.base_entity || tag.generation != self.generation {
            tracing::debug!(
                tag_base = %tag.base_entity,
                tag_generation = tag.generation,
                generation = self.generation,
                "dropping stale result"
            );
            return CommitOutcome::Dropped;
        }

        match result {
            Ok(rows) => {
                let count = rows.len();
                self.last_result = Some(RunResult {
                    base_entity: tag.base_entity,
                    generation: tag.generation,
                    columns: tag.columns,
                    chart: tag.chart,
                    rows,
                });
                self.last_error = None;
                CommitOutcome::Applied { rows: count }
            }
            Err(err) => {
                tracing::warn!(error = %err, base = %tag.base_entity, "report query failed");
                self.last_error = Some(err.clone());
                CommitOutcome::Failed(err)
            }
        }
    }

    /// Compile, execute and commit in one go.
    ///
    /// A failed execution is returned as an error after it has been recorded;
    /// the previous result stays available.
    pub async fn run(&mut self, gateway: &dyn ExecutionGateway) -> SessionResult<CommitOutcome> {
        let pending = self.begin_run()?;
        let result = gateway.execute(&pending.plan).await;
        match self.commit(pending.tag, result) {
            CommitOutcome::Failed(err) => Err(err.into()),
            outcome => Ok(outcome),
        }
    }

    /// Grouped series for the chart the last result was fetched with, if it
    /// groups.
    pub fn aggregated(&self) -> SessionResult<Option<Aggregated>> {
        let Some(result) = &self.last_result else {
            return Ok(None);
        };
        Ok(GroupSpec::from_chart(&result.chart)?
            .map(|spec| aggregate(&result.rows, &spec, self.zone)))
    }

    /// Shape the last result. Chart edits made since that run take effect on
    /// the next one.
    pub fn view_model(&self) -> SessionResult<Option<ViewModel>> {
        let Some(result) = &self.last_result else {
            return Ok(None);
        };
        present(&result.rows, &result.columns, &result.chart, self.zone).map(Some)
    }

    /// CSV of the last fetched rows, or `None` before the first run.
    pub fn export_csv(&self) -> Option<CsvExport> {
        let result = self.last_result.as_ref()?;
        Some(CsvExport::for_report(
            Some(&self.definition.name),
            &result.rows,
            &result.columns,
        ))
    }
}

/// Group (when the chart asks for it) and shape fetched rows.
pub(crate) fn present(
    rows: &[Row],
    columns: &[ColumnRef],
    chart: &ChartConfig,
    zone: ViewerZone,
) -> SessionResult<ViewModel> {
    let view = match GroupSpec::from_chart(chart)? {
        Some(spec) => {
            let aggregated = aggregate(rows, &spec, zone);
            let series_name = spec.series_name();
            shape(
                ShapeInput::Series {
                    aggregated: &aggregated,
                    group_label: &spec.group_by,
                    series_name: &series_name,
                },
                chart.chart_type,
            )?
        }
        None => shape(ShapeInput::Rows { rows, columns }, chart.chart_type)?,
    };
    Ok(view)
}
