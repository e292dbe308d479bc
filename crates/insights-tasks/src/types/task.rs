//! Task lifecycle status and the failure record stored on failed tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TaskError;
use crate::types::step::StepKind;

/// Lifecycle status of a submitted workflow.
///
/// # State Machine
///
/// ```text
/// Processing -> Completed, Failed
/// Completed  -> (terminal, no transitions)
/// Failed     -> (terminal, no transitions)
/// ```
///
/// # Examples
///
/// ```
/// use insights_tasks::TaskStatus;
///
/// let status = TaskStatus::Processing;
/// assert!(!status.is_terminal());
/// assert!(status.can_transition_to(&TaskStatus::Completed));
/// assert!(!TaskStatus::Failed.can_transition_to(&TaskStatus::Completed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Steps are still executing.
    Processing,
    /// Every step succeeded (terminal).
    Completed,
    /// A step failed; later steps were skipped (terminal).
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TaskStatus {
    /// Returns `true` if this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` if transitioning from this status to `next` is valid.
    ///
    /// Only `Processing` may move, and only to a terminal status.
    /// Self-transitions are rejected.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match self {
            Self::Processing => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }

    /// Validates a transition from this status to `next`.
    ///
    /// # Examples
    ///
    /// ```
    /// use insights_tasks::TaskStatus;
    ///
    /// assert!(TaskStatus::Processing
    ///     .validate_transition("task-1", &TaskStatus::Failed)
    ///     .is_ok());
    /// assert!(TaskStatus::Completed
    ///     .validate_transition("task-1", &TaskStatus::Failed)
    ///     .is_err());
    /// ```
    pub fn validate_transition(&self, task_id: &str, next: &Self) -> Result<(), TaskError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TaskError::InvalidTransition {
                task_id: task_id.to_string(),
                from: *self,
                to: *next,
            })
        }
    }
}

/// How a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The processor returned an explicit error.
    StepError,
    /// The processor panicked; the runner caught it at the step boundary.
    InternalFault,
    /// The configured per-step deadline elapsed.
    Timeout,
}

/// The error recorded on a task that reached `Failed`.
///
/// # Examples
///
/// ```
/// use insights_tasks::{FailureKind, StepFailure, StepKind};
///
/// let failure = StepFailure::step_error(StepKind::Content, "model unavailable");
/// assert_eq!(failure.step, StepKind::Content);
/// assert_eq!(failure.kind, FailureKind::StepError);
/// assert_eq!(failure.to_string(), "content step failed: model unavailable");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// The step that failed.
    pub step: StepKind,
    /// What went wrong.
    pub message: String,
    /// Failure category.
    pub kind: FailureKind,
}

impl StepFailure {
    /// A failure reported by the processor itself.
    pub fn step_error(step: StepKind, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            kind: FailureKind::StepError,
        }
    }

    /// A panic caught while the step was running. The panic payload is not
    /// exposed to clients.
    pub fn internal_fault(step: StepKind) -> Self {
        Self {
            step,
            message: format!("internal fault in {step} step"),
            kind: FailureKind::InternalFault,
        }
    }

    /// The step exceeded its deadline.
    pub fn timeout(step: StepKind, after_ms: u128) -> Self {
        Self {
            step,
            message: format!("{step} step timed out after {after_ms}ms"),
            kind: FailureKind::Timeout,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step failed: {}", self.step, self.message)
    }
}
