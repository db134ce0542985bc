//! Dashboard widgets.
//!
//! Every widget is refreshed concurrently and owns its own state, so a slow
//! or failing widget never holds the others back.

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;

use crate::access::{PermissionCheck, PermissionTarget};
use crate::aggregate::ViewerZone;
use crate::gateway::{ExecutionGateway, Scalar};
use crate::model::{Aggregation, ReportDefinition};
use crate::planner::QueryCompiler;
use crate::schema::SchemaRegistry;
use crate::session::{present, SessionError, SessionResult};
use crate::shape::ViewModel;

/// What a widget shows.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetSpec {
    /// Rows of a report, shaped for its chart.
    Report(ReportDefinition),
    /// A single aggregate value.
    Metric {
        entity: String,
        field: String,
        aggregation: Aggregation,
    },
}

impl WidgetSpec {
    pub fn metric(entity: impl Into<String>, field: impl Into<String>, aggregation: Aggregation) -> Self {
        WidgetSpec::Metric {
            entity: entity.into(),
            field: field.into(),
            aggregation,
        }
    }

    fn target(&self) -> PermissionTarget {
        match self {
            WidgetSpec::Report(def) => match def.id {
                Some(id) => PermissionTarget::Report(id),
                None => PermissionTarget::Module(def.module_key().to_string()),
            },
            WidgetSpec::Metric { entity, .. } => PermissionTarget::Module(entity.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum WidgetOutput {
    View(ViewModel),
    Value(Scalar),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum WidgetState {
    Loading,
    Ready(WidgetOutput),
    /// User-facing failure message.
    Failed(String),
}

impl WidgetState {
    pub fn is_ready(&self) -> bool {
        matches!(self, WidgetState::Ready(_))
    }
}

#[derive(Debug, Clone)]
pub struct Widget {
    pub id: String,
    pub spec: WidgetSpec,
}

pub struct Dashboard<'a> {
    compiler: QueryCompiler<'a>,
    permissions: &'a dyn PermissionCheck,
    widgets: Vec<Widget>,
    states: DashMap<String, WidgetState>,
    zone: ViewerZone,
}

impl<'a> Dashboard<'a> {
    pub fn new(registry: &'a SchemaRegistry, permissions: &'a dyn PermissionCheck) -> Self {
        Self {
            compiler: QueryCompiler::new(registry),
            permissions,
            widgets: Vec::new(),
            states: DashMap::new(),
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

    /// Add a widget. A widget with the same id is replaced.
    pub fn with_widget(mut self, id: impl Into<String>, spec: WidgetSpec) -> Self {
        let id = id.into();
        self.widgets.retain(|w| w.id != id);
        self.states.remove(&id);
        self.widgets.push(Widget { id, spec });
        self
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Current state of one widget; `None` before its first refresh.
    pub fn state(&self, id: &str) -> Option<WidgetState> {
        self.states.get(id).map(|s| s.value().clone())
    }

    /// Refresh every widget concurrently. Returns the number that failed.
    pub async fn refresh(&self, gateway: &dyn ExecutionGateway) -> usize {
        for widget in &self.widgets {
            self.states.insert(widget.id.clone(), WidgetState::Loading);
        }

        let outcomes = join_all(self.widgets.iter().map(|w| self.load_widget(w, gateway))).await;

        let mut failed = 0;
        for (widget, outcome) in self.widgets.iter().zip(outcomes) {
            let state = match outcome {
                Ok(output) => WidgetState::Ready(output),
                Err(err) => {
                    failed += 1;
                    tracing::warn!(widget = %widget.id, error = %err, "widget refresh failed");
                    WidgetState::Failed(failure_message(&err))
                }
            };
            self.states.insert(widget.id.clone(), state);
        }
        failed
    }

    async fn load_widget(
        &self,
        widget: &Widget,
        gateway: &dyn ExecutionGateway,
    ) -> SessionResult<WidgetOutput> {
        let target = widget.spec.target();
        if !self.permissions.can_view(&target) {
            return Err(SessionError::PermissionDenied {
                action: "view",
                target,
            });
        }

        match &widget.spec {
            WidgetSpec::Report(def) => {
                let plan = self.compiler.compile_report(def)?;
                let rows = gateway.execute(&plan).await?;
                let view = present(&rows, &def.selected_columns, &def.chart, self.zone)?;
                Ok(WidgetOutput::View(view))
            }
            WidgetSpec::Metric {
                entity,
                field,
                aggregation,
            } => {
                let plan = self.compiler.compile_metric(entity, field, *aggregation)?;
                Ok(WidgetOutput::Value(gateway.execute_scalar(&plan).await?))
            }
        }
    }
}

fn failure_message(err: &SessionError) -> String {
    match err {
        SessionError::Compile(e) => e.user_message().to_string(),
        other => other.to_string(),
    }
}
