//! Drives one task through its workflow.
//!
//! The runner is the only writer of its task's record after creation. Steps
//! run strictly in spec order; each sees the cumulative results of the steps
//! before it. The first failing step ends the run and marks the task
//! `failed`; results recorded so far stay visible. A run whose record was
//! evicted stops at the next step boundary.
//!
//! Panics inside a processor are caught at the step boundary and recorded as
//! `internal_fault`, so a task never stays `processing` because of a bug in a
//! step. A stuck external call still blocks its task unless a step timeout is
//! configured.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::Instrument;

use crate::domain::WorkflowSpec;
use crate::error::TaskError;
use crate::processor::{scoped_parameters, ProcessorRegistry, StepInput};
use crate::store::TaskStore;
use crate::types::step::StepKind;
use crate::types::task::{StepFailure, TaskStatus};

/// Executes task workflows against a processor registry.
#[derive(Clone)]
pub struct TaskRunner {
    store: Arc<dyn TaskStore>,
    registry: Arc<ProcessorRegistry>,
    step_timeout: Option<Duration>,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("registry", &self.registry)
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    /// Creates a runner with no step deadline.
    pub fn new(store: Arc<dyn TaskStore>, registry: Arc<ProcessorRegistry>) -> Self {
        Self {
            store,
            registry,
            step_timeout: None,
        }
    }

    /// Sets the per-step deadline. `None` lets a step block indefinitely.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// The configured per-step deadline.
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }

    /// Runs every step of `spec` for `task_id` and returns the status the
    /// task ended in.
    ///
    /// If the record disappears mid-run (evicted or cleared) the remaining
    /// steps are skipped and `Failed` is returned.
    pub async fn run(&self, task_id: &str, spec: &WorkflowSpec) -> TaskStatus {
        let span = tracing::info_span!("task", task_id = %task_id);
        self.run_steps(task_id, spec).instrument(span).await
    }

    async fn run_steps(&self, task_id: &str, spec: &WorkflowSpec) -> TaskStatus {
        let started = Instant::now();
        let mut prior: IndexMap<StepKind, Value> = IndexMap::new();

        for (index, &step) in spec.steps().iter().enumerate() {
            tracing::info!(step = %step, index, "step started");
            let step_started = Instant::now();

            match self.run_step(task_id, spec, step, &prior).await {
                Ok(payload) => {
                    tracing::info!(
                        step = %step,
                        elapsed_ms = step_started.elapsed().as_millis() as u64,
                        "step finished"
                    );
                    match self
                        .store
                        .record_step_result(task_id, step, payload.clone())
                        .await
                    {
                        Ok(_) => {},
                        Err(TaskError::NotFound { .. }) => {
                            tracing::warn!(
                                step = %step,
                                "task evicted mid-run, abandoning remaining steps"
                            );
                            return TaskStatus::Failed;
                        },
                        Err(TaskError::AlreadyTerminal { status, .. }) => {
                            tracing::warn!(
                                step = %step,
                                status = %status,
                                "task already finished, stopping"
                            );
                            return status;
                        },
                        Err(err) => {
                            tracing::warn!(step = %step, error = %err, "dropping step result");
                        },
                    }
                    prior.insert(step, payload);
                },
                Err(failure) => {
                    tracing::warn!(
                        step = %step,
                        kind = ?failure.kind,
                        error = %failure.message,
                        elapsed_ms = step_started.elapsed().as_millis() as u64,
                        "step failed"
                    );
                    return self.finish_failed(task_id, failure).await;
                },
            }
        }

        let status = match self.store.mark_completed(task_id).await {
            Ok(record) => record.status,
            Err(err) => {
                tracing::warn!(error = %err, "could not mark task completed");
                TaskStatus::Completed
            },
        };
        tracing::info!(
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task finished"
        );
        status
    }

    async fn run_step(
        &self,
        task_id: &str,
        spec: &WorkflowSpec,
        step: StepKind,
        prior: &IndexMap<StepKind, Value>,
    ) -> Result<Value, StepFailure> {
        let Some(processor) = self.registry.get(step) else {
            return Err(StepFailure::step_error(
                step,
                format!("no processor registered for {step}"),
            ));
        };

        let parameters = scoped_parameters(spec.parameters(), processor.parameter_keys());
        let input = StepInput {
            task_id,
            target: spec.target(),
            step,
            parameters: &parameters,
            prior,
        };

        let guarded = AssertUnwindSafe(processor.process(input)).catch_unwind();
        let outcome = match self.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(StepFailure::timeout(step, limit.as_millis())),
            },
            None => guarded.await,
        };

        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(err)) => Err(StepFailure::step_error(step, err.to_string())),
            Err(panic) => {
                tracing::error!(
                    step = %step,
                    panic = panic_message(panic.as_ref()),
                    "step panicked"
                );
                Err(StepFailure::internal_fault(step))
            },
        }
    }

    async fn finish_failed(&self, task_id: &str, failure: StepFailure) -> TaskStatus {
        match self.store.mark_failed(task_id, failure).await {
            Ok(record) => record.status,
            Err(err) => {
                tracing::warn!(error = %err, "could not mark task failed");
                TaskStatus::Failed
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
