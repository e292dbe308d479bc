//! Task store trait and supporting types.
//!
//! [`TaskStore`] is the only shared mutable state in the engine. The
//! scheduler creates records through it, each runner mutates its own record
//! through it, and pollers read snapshots from it. Implementations must be
//! `Send + Sync` and must never hand out a mutable alias: every read returns
//! a clone.
//!
//! # Backends
//!
//! - [`InMemoryTaskStore`](crate::store::memory::InMemoryTaskStore) -- the
//!   process-lifetime store, backed by `DashMap`. Task state does not
//!   survive a restart.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{TaskRecord, WorkflowSpec};
use crate::error::TaskError;
use crate::types::step::StepKind;
use crate::types::task::{StepFailure, TaskStatus};
use crate::types::wire::TaskSummary;

/// Store limits and eviction policy.
///
/// # Defaults
///
/// | Setting                  | Default | Description                                         |
/// |--------------------------|---------|-----------------------------------------------------|
/// | `max_tasks`              | `None`  | No cap on stored records                            |
/// | `stale_processing_after` | 48 h    | Minimum age before a `processing` record is evicted |
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use insights_tasks::store::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert!(config.max_tasks.is_none());
/// assert_eq!(config.stale_processing_after, Duration::from_secs(48 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of records held at once. `create` returns
    /// [`TaskError::ResourceExhausted`] when reached.
    pub max_tasks: Option<usize>,

    /// A record still `processing` is only evicted once its `created_at` is
    /// older than both the requested threshold and this ceiling, so a slow
    /// task is not reclaimed while its runner is still writing.
    pub stale_processing_after: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_tasks: None,
            stale_processing_after: Duration::from_secs(48 * 60 * 60),
        }
    }
}

/// Options for listing tasks.
///
/// The cursor is opaque to the caller: pass back the `next_cursor` of the
/// previous page verbatim.
#[derive(Debug, Clone, Default)]
pub struct ListTasksOptions {
    /// Only include tasks in this status.
    pub status: Option<TaskStatus>,

    /// Opaque cursor for pagination. `None` for the first page.
    pub cursor: Option<String>,

    /// Maximum number of tasks to return. `None` returns everything.
    pub limit: Option<usize>,
}

/// A page of task summaries, newest first.
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    /// The tasks in this page of results.
    pub tasks: Vec<TaskSummary>,

    /// Cursor for the next page. `None` if there are no more results.
    pub next_cursor: Option<String>,

    /// Number of tasks matching the filter, across all pages.
    pub total: usize,
}

/// Concurrent storage for task records.
///
/// Mutations on the same task id are mutually exclusive. Mutations on
/// different ids may proceed in parallel.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Allocates a fresh id and stores a new `Processing` record.
    ///
    /// # Errors
    ///
    /// - [`TaskError::ResourceExhausted`] if `max_tasks` is reached.
    async fn create(&self, spec: WorkflowSpec) -> Result<TaskRecord, TaskError>;

    /// Returns a snapshot of the record.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no task with the given ID exists.
    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError>;

    /// Stores a step's output. A repeated step kind overwrites its entry.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no task with the given ID exists.
    /// - [`TaskError::AlreadyTerminal`] if the task already finished; the
    ///   record is left unchanged.
    async fn record_step_result(
        &self,
        task_id: &str,
        step: StepKind,
        payload: Value,
    ) -> Result<(), TaskError>;

    /// Moves the task to `Completed` and stamps `completed_at`.
    ///
    /// Idempotent: on an already terminal record this is a no-op returning
    /// the unchanged record (first writer wins).
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no task with the given ID exists.
    async fn mark_completed(&self, task_id: &str) -> Result<TaskRecord, TaskError>;

    /// Moves the task to `Failed`, storing `failure` and stamping
    /// `completed_at`.
    ///
    /// Idempotent in the same way as [`mark_completed`](Self::mark_completed).
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no task with the given ID exists.
    async fn mark_failed(
        &self,
        task_id: &str,
        failure: StepFailure,
    ) -> Result<TaskRecord, TaskError>;

    /// Lists task summaries ordered by creation time, newest first.
    async fn list(&self, options: ListTasksOptions) -> Result<TaskPage, TaskError>;

    /// Removes every record older than `max_age` and returns how many were
    /// removed. Terminal records age from `completed_at`; processing records
    /// age from `created_at` and are subject to
    /// [`StoreConfig::stale_processing_after`].
    async fn evict_older_than(&self, max_age: Duration) -> Result<usize, TaskError>;

    /// Removes every record and returns how many were removed.
    async fn clear(&self) -> Result<usize, TaskError>;

    /// Number of records currently held.
    async fn len(&self) -> usize;

    /// Returns `true` if the store holds no records.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns a reference to the store's configuration.
    fn config(&self) -> &StoreConfig;
}
