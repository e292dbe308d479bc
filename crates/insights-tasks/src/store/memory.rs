//! In-memory task store.
//!
//! [`InMemoryTaskStore`] keeps every [`TaskRecord`] in a
//! `DashMap<String, TaskRecord>`. Each task id maps to its own shard entry,
//! so mutations on one task never block mutations on another, and a record
//! is only ever mutated while its entry guard is held. No guard is held
//! across an `.await`.
//!
//! # Examples
//!
//! ```
//! use insights_tasks::store::memory::InMemoryTaskStore;
//! use insights_tasks::store::StoreConfig;
//!
//! let store = InMemoryTaskStore::new().with_config(StoreConfig {
//!     max_tasks: Some(1_000),
//!     ..StoreConfig::default()
//! });
//! assert_eq!(store.config().max_tasks, Some(1_000));
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::domain::{TaskRecord, WorkflowSpec};
use crate::error::TaskError;
use crate::types::step::StepKind;
use crate::types::task::{StepFailure, TaskStatus};

use super::{ListTasksOptions, StoreConfig, TaskPage, TaskStore};

/// Thread-safe process-lifetime task store.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<String, TaskRecord>,
    config: StoreConfig,
}

impl InMemoryTaskStore {
    /// Creates an empty store with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the store configuration.
    ///
    /// Inherent twin of [`TaskStore::config`] so callers need not import the
    /// trait.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn finish(
        &self,
        task_id: &str,
        to: TaskStatus,
        failure: Option<StepFailure>,
    ) -> Result<TaskRecord, TaskError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })?;
        let record = entry.value_mut();

        if record.status.is_terminal() {
            tracing::debug!(
                task_id = %task_id,
                current = %record.status,
                requested = %to,
                "ignoring terminal transition on finished task"
            );
            return Ok(record.clone());
        }

        record.status.validate_transition(task_id, &to)?;
        record.status = to;
        record.error = failure;
        record.completed_at = Some(Utc::now());
        Ok(record.clone())
    }
}

/// `now - age`, or `None` when the age reaches past the representable range
/// (in which case nothing is old enough).
fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::from_std(age).ok()?;
    now.checked_sub_signed(delta)
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, spec: WorkflowSpec) -> Result<TaskRecord, TaskError> {
        // Soft limit: concurrent creates may overshoot by the number of
        // racing callers.
        if let Some(limit) = self.config.max_tasks {
            if self.tasks.len() >= limit {
                tracing::warn!(limit, "task store full, rejecting submission");
                return Err(TaskError::ResourceExhausted { limit });
            }
        }

        let spec = Arc::new(spec);
        loop {
            let record = TaskRecord::with_shared_spec(Arc::clone(&spec));
            match self.tasks.entry(record.id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                    return Ok(record);
                },
                Entry::Occupied(_) => {
                    tracing::debug!(task_id = %record.id, "task id collision, regenerating");
                },
            }
        }
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.tasks
            .get(task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })
    }

    async fn record_step_result(
        &self,
        task_id: &str,
        step: StepKind,
        payload: Value,
    ) -> Result<(), TaskError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })?;
        let record = entry.value_mut();

        if record.status.is_terminal() {
            return Err(TaskError::AlreadyTerminal {
                task_id: task_id.to_string(),
                status: record.status,
            });
        }

        record.results.insert(step, payload);
        Ok(())
    }

    async fn mark_completed(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.finish(task_id, TaskStatus::Completed, None)
    }

    async fn mark_failed(
        &self,
        task_id: &str,
        failure: StepFailure,
    ) -> Result<TaskRecord, TaskError> {
        self.finish(task_id, TaskStatus::Failed, Some(failure))
    }

    async fn list(&self, options: ListTasksOptions) -> Result<TaskPage, TaskError> {
        let mut records: Vec<TaskRecord> = self
            .tasks
            .iter()
            .filter(|entry| options.status.map_or(true, |s| entry.value().status == s))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; id breaks ties so pagination is stable.
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        // Cursor is the id of the last task on the previous page. An unknown
        // cursor (e.g. the task was evicted) restarts from the beginning.
        let start_idx = options
            .cursor
            .as_deref()
            .and_then(|cursor| records.iter().position(|r| r.id == cursor))
            .map_or(0, |i| i + 1);

        let total = records.len();
        let limit = options.limit.unwrap_or(total);
        let page: Vec<TaskRecord> = records
            .get(start_idx..)
            .unwrap_or(&[])
            .iter()
            .take(limit)
            .cloned()
            .collect();

        let next_cursor = if !page.is_empty() && start_idx + page.len() < total {
            page.last().map(|r| r.id.clone())
        } else {
            None
        };

        Ok(TaskPage {
            tasks: page.iter().map(TaskRecord::to_summary).collect(),
            next_cursor,
            total,
        })
    }

    async fn evict_older_than(&self, max_age: Duration) -> Result<usize, TaskError> {
        let now = Utc::now();
        let terminal_cutoff = cutoff(now, max_age);
        let processing_cutoff = cutoff(now, max_age.max(self.config.stale_processing_after));

        let mut removed = 0usize;
        self.tasks.retain(|_, record| {
            let limit = if record.status.is_terminal() {
                terminal_cutoff
            } else {
                processing_cutoff
            };
            let expired = limit.is_some_and(|limit| record.age_reference() < limit);
            if expired {
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.tasks.len(),
                max_age_secs = max_age.as_secs(),
                "evicted old tasks"
            );
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<usize, TaskError> {
        let mut removed = 0usize;
        self.tasks.retain(|_, _| {
            removed += 1;
            false
        });
        Ok(removed)
    }

    async fn len(&self) -> usize {
        self.tasks.len()
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}
