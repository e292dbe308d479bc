//! Error types for task engine operations.
//!
//! [`TaskError`] covers every failure the engine surfaces to its callers:
//! rejected submissions, unknown task ids, rejected state transitions and
//! store capacity limits. Failures *inside* a workflow step never become a
//! `TaskError`; they are recorded on the task as a
//! [`StepFailure`](crate::types::task::StepFailure).

use thiserror::Error;

use crate::types::task::TaskStatus;

/// Errors that can occur during task engine operations.
///
/// # Examples
///
/// ```
/// use insights_tasks::TaskError;
///
/// let err = TaskError::NotFound {
///     task_id: "missing-task".to_string(),
/// };
/// assert!(err.to_string().contains("missing-task"));
/// assert!(err.is_client_error());
/// ```
#[derive(Debug, Error)]
pub enum TaskError {
    /// The submitted workflow was malformed (empty target, empty or
    /// unrecognized steps, or a step with no registered processor).
    #[error("invalid workflow spec: {reason}")]
    InvalidSpec {
        /// Human readable description of the offending field.
        reason: String,
    },

    /// Task with the given ID was not found.
    #[error("task not found: {task_id}")]
    NotFound {
        /// The task ID that was not found.
        task_id: String,
    },

    /// Attempted a state transition the task lifecycle does not allow.
    #[error("invalid transition from {from} to {to} for task {task_id}")]
    InvalidTransition {
        /// The task that was being transitioned.
        task_id: String,
        /// The current status of the task.
        from: TaskStatus,
        /// The target status that was rejected.
        to: TaskStatus,
    },

    /// Attempted to record a step result on a task that already finished.
    #[error("task {task_id} is already {status}")]
    AlreadyTerminal {
        /// The finished task.
        task_id: String,
        /// Its terminal status.
        status: TaskStatus,
    },

    /// The store already holds its configured maximum number of tasks.
    #[error("task store is full ({limit} tasks); run cleanup or retry later")]
    ResourceExhausted {
        /// The configured capacity.
        limit: usize,
    },

    /// Backend storage error.
    #[error("store error: {0}")]
    StoreError(String),
}

impl TaskError {
    /// Shorthand for an [`InvalidSpec`](TaskError::InvalidSpec) error.
    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error was caused by the caller's input rather
    /// than by the engine itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use insights_tasks::TaskError;
    ///
    /// assert!(TaskError::invalid_spec("steps must not be empty").is_client_error());
    /// assert!(!TaskError::StoreError("poisoned".to_string()).is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpec { .. } | Self::NotFound { .. } | Self::InvalidTransition { .. }
        )
    }
}
