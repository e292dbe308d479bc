//! Engine value types: step kinds, task status, and client-facing views.

pub mod step;
pub mod task;
pub mod wire;

pub use step::StepKind;
pub use task::{FailureKind, StepFailure, TaskStatus};
pub use wire::{CleanupReport, SubmitReceipt, TaskSummary, TaskView};
