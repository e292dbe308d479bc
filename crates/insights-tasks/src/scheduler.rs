//! Task admission and dispatch.
//!
//! [`Scheduler`] is the only way to create a task. It validates the
//! submission, checks that every step has a processor, creates the record
//! and then either spawns a runner for it ([`Scheduler::submit`]) or runs it
//! inline ([`Scheduler::execute`]).
//!
//! A scheduler owns its store handle. Several schedulers, each with its own
//! store, can live in one process.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use insights_tasks::processor::ProcessorRegistry;
//! use insights_tasks::store::memory::InMemoryTaskStore;
//! use insights_tasks::{RawWorkflowSpec, Scheduler, TaskError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scheduler = Scheduler::new(Arc::new(InMemoryTaskStore::new()), ProcessorRegistry::new());
//!
//! // Nothing registered, so every step is rejected up front.
//! let err = scheduler
//!     .submit(RawWorkflowSpec::new("v1", ["analytics"]))
//!     .await
//!     .unwrap_err();
//! assert!(matches!(err, TaskError::InvalidSpec { .. }));
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::domain::{RawWorkflowSpec, TaskRecord, WorkflowSpec};
use crate::error::TaskError;
use crate::processor::ProcessorRegistry;
use crate::runner::TaskRunner;
use crate::store::{ListTasksOptions, TaskPage, TaskStore};
use crate::types::task::TaskStatus;
use crate::types::wire::{CleanupReport, SubmitReceipt};

/// Shortest janitor period accepted by [`Scheduler::spawn_janitor`].
const MIN_JANITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Accepts workflows and runs them in the background.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn TaskStore>,
    registry: Arc<ProcessorRegistry>,
    runner: TaskRunner,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("registry", &self.registry)
            .field("step_timeout", &self.runner.step_timeout())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler over `store` with the given processors.
    pub fn new(store: Arc<dyn TaskStore>, registry: ProcessorRegistry) -> Self {
        let registry = Arc::new(registry);
        let runner = TaskRunner::new(Arc::clone(&store), Arc::clone(&registry));
        Self {
            store,
            registry,
            runner,
        }
    }

    /// Sets the per-step deadline applied by every runner this scheduler
    /// starts.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runner = self.runner.with_step_timeout(timeout);
        self
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// The registered processors.
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Validates `raw`, creates its record and starts a runner in the
    /// background. Returns as soon as the record exists.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidSpec`] if the spec is malformed or names a step
    ///   with no processor. Nothing is stored.
    /// - [`TaskError::ResourceExhausted`] if the store is full.
    pub async fn submit(&self, raw: RawWorkflowSpec) -> Result<SubmitReceipt, TaskError> {
        let record = self.admit(raw).await?;
        let receipt = SubmitReceipt {
            task_id: record.id.clone(),
            status: record.status,
        };

        drop(self.spawn_run(&record));
        Ok(receipt)
    }

    /// Like [`submit`](Self::submit) but waits for the workflow to finish
    /// before returning the final record.
    ///
    /// The run itself is spawned: dropping this future detaches it rather
    /// than cancelling it, so the task still reaches a terminal status.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit). Step failures are not errors; they
    /// are reported on the returned record.
    pub async fn execute(&self, raw: RawWorkflowSpec) -> Result<TaskRecord, TaskError> {
        let record = self.admit(raw).await?;
        if let Err(err) = self.spawn_run(&record).await {
            tracing::warn!(task_id = %record.id, error = %err, "runner did not finish");
        }
        self.store.get(&record.id).await
    }

    /// Returns a snapshot of the task.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if the id is unknown or was evicted.
    pub async fn status(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.store.get(task_id).await
    }

    /// Lists task summaries, newest first.
    pub async fn list(&self, options: ListTasksOptions) -> Result<TaskPage, TaskError> {
        self.store.list(options).await
    }

    /// Evicts tasks older than `max_age`.
    pub async fn cleanup(&self, max_age: Duration) -> Result<CleanupReport, TaskError> {
        let removed = self.store.evict_older_than(max_age).await?;
        let remaining = self.store.len().await;
        Ok(CleanupReport { removed, remaining })
    }

    /// Runs [`cleanup`](Self::cleanup) every `interval` until the returned
    /// handle is aborted. The first sweep happens one interval after the
    /// call. Intervals under one second are raised to one second.
    pub fn spawn_janitor(&self, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        let period = interval.max(MIN_JANITOR_INTERVAL);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match scheduler.cleanup(max_age).await {
                    Ok(report) if report.removed > 0 => {
                        tracing::info!(
                            removed = report.removed,
                            remaining = report.remaining,
                            "janitor evicted tasks"
                        );
                    },
                    Ok(_) => tracing::debug!("janitor found nothing to evict"),
                    Err(err) => tracing::warn!(error = %err, "janitor cleanup failed"),
                }
            }
        })
    }

    fn spawn_run(&self, record: &TaskRecord) -> JoinHandle<TaskStatus> {
        let runner = self.runner.clone();
        let spec = Arc::clone(&record.spec);
        let task_id = record.id.clone();
        tokio::spawn(async move { runner.run(&task_id, &spec).await })
    }

    async fn admit(&self, raw: RawWorkflowSpec) -> Result<TaskRecord, TaskError> {
        let spec = WorkflowSpec::validate(raw)?;
        if let Some(step) = self.registry.first_unsupported(&spec) {
            return Err(TaskError::invalid_spec(format!(
                "no processor registered for step '{step}'"
            )));
        }

        let record = self.store.create(spec).await?;
        debug_assert_eq!(record.status, TaskStatus::Processing);
        tracing::info!(
            task_id = %record.id,
            spec_target = %record.spec.target(),
            steps = record.spec.steps().len(),
            "task submitted"
        );
        Ok(record)
    }
}
