//! Task record -- the store's internal representation of a task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::spec::WorkflowSpec;
use crate::types::step::StepKind;
use crate::types::task::{StepFailure, TaskStatus};
use crate::types::wire::{format_timestamp, TaskSummary, TaskView};

const MAX_SLUG_LEN: usize = 32;

/// The mutable state tracked for one submitted workflow.
///
/// The store owns every `TaskRecord`; callers only ever receive clones.
/// After creation, only the task's own runner mutates `status`, `results`,
/// `error` and `completed_at` (through the store).
///
/// All fields are public so that store implementors have full access.
///
/// # Examples
///
/// ```
/// use insights_tasks::{StepKind, TaskRecord, TaskStatus, WorkflowSpec};
///
/// let spec = WorkflowSpec::builder("dQw4w9WgXcQ")
///     .step(StepKind::Analytics)
///     .build()
///     .unwrap();
/// let record = TaskRecord::new(spec);
/// assert!(record.id.starts_with("dQw4w9WgXcQ-"));
/// assert_eq!(record.status, TaskStatus::Processing);
/// assert!(record.results.is_empty());
/// assert!(record.completed_at.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Unique task identifier.
    pub id: String,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// The originating workflow. Shared, never mutated.
    pub spec: Arc<WorkflowSpec>,

    /// Output per step kind. Append-only while processing; a repeated kind
    /// overwrites its own entry.
    pub results: IndexMap<StepKind, Value>,

    /// Set only when `status` is `Failed`.
    pub error: Option<StepFailure>,

    /// Submission time.
    pub created_at: DateTime<Utc>,

    /// Set when the task reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Creates a new record in the `Processing` state with a fresh id.
    pub fn new(spec: WorkflowSpec) -> Self {
        Self::with_shared_spec(Arc::new(spec))
    }

    /// Like [`new`](Self::new) but reuses an already shared spec, so a store
    /// can regenerate the id after a collision without cloning the spec.
    pub fn with_shared_spec(spec: Arc<WorkflowSpec>) -> Self {
        let created_at = Utc::now();
        let id = generate_task_id(spec.target(), &created_at);
        Self {
            id,
            status: TaskStatus::Processing,
            spec,
            results: IndexMap::new(),
            error: None,
            created_at,
            completed_at: None,
        }
    }

    /// The instant eviction ages this record from: `completed_at` for
    /// terminal records, `created_at` otherwise.
    pub fn age_reference(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }

    /// Snapshot for poll responses.
    pub fn to_view(&self) -> TaskView {
        TaskView {
            task_id: self.id.clone(),
            status: self.status,
            target: self.spec.target().to_string(),
            steps: self.spec.steps().to_vec(),
            results: self.results.clone(),
            error: self.error.clone(),
            created_at: format_timestamp(&self.created_at),
            completed_at: self.completed_at.as_ref().map(format_timestamp),
        }
    }

    /// Snapshot for task listings.
    pub fn to_summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.id.clone(),
            status: self.status,
            target: self.spec.target().to_string(),
            steps: self.spec.steps().to_vec(),
            completed_steps: self.results.len(),
            created_at: format_timestamp(&self.created_at),
            completed_at: self.completed_at.as_ref().map(format_timestamp),
        }
    }
}

/// Builds `"{target-slug}-{yyyyMMddHHmmssSSS}-{8 hex}"`.
///
/// The slug keeps ASCII alphanumerics, `-` and `_` from the target. The hex
/// suffix comes from a v4 UUID, so ids created for the same target in the
/// same millisecond still differ; the store rejects the rare collision.
pub(crate) fn generate_task_id(target: &str, at: &DateTime<Utc>) -> String {
    let slug: String = target
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_SLUG_LEN)
        .collect();
    let slug = if slug.is_empty() { "task".to_string() } else { slug };
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{slug}-{}-{}", at.format("%Y%m%d%H%M%S%3f"), &suffix[..8])
}
