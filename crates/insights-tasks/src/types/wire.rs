//! Client-facing views of task state.
//!
//! These are the shapes returned by submit, poll, list and cleanup. They
//! are snapshots: building one clones out of the store, so a view never
//! aliases a record the runner is still writing.
//!
//! Field names are `snake_case`. Timestamps are RFC 3339 strings with
//! millisecond precision; optional fields are omitted rather than `null`.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::step::StepKind;
use crate::types::task::{StepFailure, TaskStatus};

/// Formats a timestamp the way every wire type does.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use insights_tasks::types::wire::format_timestamp;
///
/// let at = Utc.with_ymd_and_hms(2025, 11, 25, 10, 30, 0).unwrap();
/// assert_eq!(format_timestamp(&at), "2025-11-25T10:30:00.000Z");
/// ```
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returned immediately by a background submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Identifier to poll with.
    pub task_id: String,
    /// Always `processing` at submission time.
    pub status: TaskStatus,
}

/// Full poll response for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    /// Task identifier.
    pub task_id: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// The workflow target (e.g. a video id).
    pub target: String,
    /// Declared steps, in execution order.
    pub steps: Vec<StepKind>,
    /// Output per completed step kind, in the order first recorded.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub results: IndexMap<StepKind, Value>,
    /// Present only when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepFailure>,
    /// Submission time.
    pub created_at: String,
    /// Set once the task reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// One row of a task listing. Omits step payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task identifier.
    pub task_id: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// The workflow target.
    pub target: String,
    /// Declared steps, in execution order.
    pub steps: Vec<StepKind>,
    /// Number of distinct step kinds with a recorded result.
    pub completed_steps: usize,
    /// Submission time.
    pub created_at: String,
    /// Set once the task reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Outcome of an eviction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Records removed by this pass.
    pub removed: usize,
    /// Records still held after the pass.
    pub remaining: usize,
}
