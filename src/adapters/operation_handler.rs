//! Render and execute passes for one operation within one session.
//!
//! Callers hold the session lock for the whole call, so one session never
//! runs two operations at once.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::metrics_handler::MetricsCollector;
use crate::adapters::operation_registry::Operation;
use crate::domain::{Visualization, VisualizerError, VisualizerPort};
use crate::engine::assist::AssistRegistry;
use crate::engine::{
    validate, DisplayInstructions, FieldError, FormAssembler, FormPolicy, Interaction, Notice,
    RenderedForm, ResultDispatcher, ValidationOutcome,
};
use crate::session::SessionContext;

/// What the visualizer made of a structure file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VisualizationOutcome {
    Rendered { visualization: Visualization },
    Skipped { notice: Notice },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionReport {
    /// Validation failed; the operation was not called.
    Invalid { errors: Vec<FieldError>, messages: Vec<String> },
    Failed {
        message: String,
        /// Full error chain for the expandable diagnostic.
        detail: String,
    },
    Completed {
        display: DisplayInstructions,
        #[serde(skip_serializing_if = "Option::is_none")]
        visualization: Option<VisualizationOutcome>,
    },
}

impl ExecutionReport {
    fn outcome(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "invalid",
            Self::Failed { .. } => "failed",
            Self::Completed { .. } => "completed",
        }
    }
}

pub struct OperationHandler {
    policy: FormPolicy,
    assists: Arc<AssistRegistry>,
    visualizer: Arc<dyn VisualizerPort>,
    metrics: Arc<MetricsCollector>,
    dir_var: String,
}

impl OperationHandler {
    pub fn new(
        policy: FormPolicy,
        assists: Arc<AssistRegistry>,
        visualizer: Arc<dyn VisualizerPort>,
        metrics: Arc<MetricsCollector>,
        dir_var: impl Into<String>,
    ) -> Self {
        Self {
            policy,
            assists,
            visualizer,
            metrics,
            dir_var: dir_var.into(),
        }
    }

    pub fn policy(&self) -> &FormPolicy {
        &self.policy
    }

    pub fn render(&self, session: &SessionContext, operation: &Operation, interaction: &Interaction) -> RenderedForm {
        self.metrics.render_passes.with_label_values(&[&operation.id]).inc();
        FormAssembler::new(&self.policy, &self.assists, &session.store).assemble(&operation.schema, interaction)
    }

    pub async fn execute(
        &self,
        session: &SessionContext,
        operation: &Operation,
        interaction: &Interaction,
    ) -> ExecutionReport {
        let form = self.render(session, operation, interaction);
        let report = match validate(&operation.schema, &form.state) {
            ValidationOutcome::Invalid { errors } => {
                self.metrics.validation_failures.with_label_values(&[&operation.id]).inc();
                let messages = errors.iter().map(ToString::to_string).collect();
                ExecutionReport::Invalid { errors, messages }
            }
            ValidationOutcome::Valid { instance } => {
                let ctx = session.operation_context(&self.dir_var);
                tracing::info!(session_id = %session.id, "Running operation {}", operation.id);

                let start = Instant::now();
                let result = operation.port.invoke(&ctx, &instance).await;
                self.metrics
                    .operation_duration
                    .with_label_values(&[&operation.id])
                    .observe(start.elapsed().as_secs_f64());

                match result {
                    Ok(value) => {
                        tracing::info!(session_id = %session.id, "Operation {} finished", operation.id);
                        let display = ResultDispatcher::new(&self.policy).dispatch(&value);
                        let visualization = match &display.visualize {
                            Some(path) => Some(self.visualize(path).await),
                            None => None,
                        };
                        ExecutionReport::Completed { display, visualization }
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %session.id, "Operation {} failed: {:#}", operation.id, e);
                        ExecutionReport::Failed {
                            message: format!("Error executing {}: {}", operation.title, e),
                            detail: format!("{:?}", e),
                        }
                    }
                }
            }
        };

        self.metrics
            .operation_executions
            .with_label_values(&[&operation.id, report.outcome()])
            .inc();
        report
    }

    /// Render a structure file. Visualizer problems become notices.
    pub async fn visualize(&self, path: &Path) -> VisualizationOutcome {
        match self.visualizer.render(path).await {
            Ok(visualization) => VisualizationOutcome::Rendered { visualization },
            Err(e @ VisualizerError::Unavailable(_)) => {
                tracing::debug!("No visualization for {}: {}", path.display(), e);
                VisualizationOutcome::Skipped { notice: Notice::info(e.to_string()) }
            }
            Err(e @ VisualizerError::Failed(_)) => {
                tracing::warn!("Failed to visualize {}: {}", path.display(), e);
                VisualizationOutcome::Skipped { notice: Notice::error(e.to_string()) }
            }
        }
    }
}
