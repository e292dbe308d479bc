//! Workflow task engine for the video insights service.
//!
//! A client submits a workflow: a target identifier, an ordered list of
//! step kinds and shared parameters. The engine validates it, stores a task
//! record, runs the steps in order against pluggable processors on a
//! background tokio task, and lets the client poll the record until it
//! reaches a terminal status. Finished records are reclaimed by age.
//!
//! # Overview
//!
//! Task lifecycle: `processing` -> `completed` | `failed`. A failing step
//! ends the run immediately; results from earlier steps are kept for
//! diagnostics. Panics inside a step are caught and recorded as failures.
//!
//! # Module Organization
//!
//! - [`types`] - Step kinds, task status, and client-facing views
//! - [`domain`] - Workflow validation and the task record
//! - [`store`] - The `TaskStore` trait and in-memory backend
//! - [`processor`] - The `StepProcessor` seam and registry
//! - [`runner`] - Executes one task's steps
//! - [`scheduler`] - Admission, dispatch, polling and cleanup
//! - [`error`] - Engine error types
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use insights_tasks::processor::{ProcessorRegistry, StepError, StepInput, StepProcessor};
//! use insights_tasks::store::memory::InMemoryTaskStore;
//! use insights_tasks::{RawWorkflowSpec, Scheduler, StepKind, TaskStatus};
//! use serde_json::{json, Value};
//!
//! struct Score;
//!
//! #[async_trait]
//! impl StepProcessor for Score {
//!     fn kind(&self) -> StepKind {
//!         StepKind::Analytics
//!     }
//!
//!     async fn process(&self, _input: StepInput<'_>) -> Result<Value, StepError> {
//!         Ok(json!({ "score": 42 }))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scheduler = Scheduler::new(
//!     Arc::new(InMemoryTaskStore::new()),
//!     ProcessorRegistry::new().with_processor(Arc::new(Score)),
//! );
//!
//! let record = scheduler
//!     .execute(RawWorkflowSpec::new("v1", ["analytics"]))
//!     .await
//!     .unwrap();
//! assert_eq!(record.status, TaskStatus::Completed);
//! assert_eq!(record.results[&StepKind::Analytics], json!({ "score": 42 }));
//! # }
//! ```

pub mod error;
pub mod types;

/// Domain types (WorkflowSpec, TaskRecord) for internal task representation.
pub mod domain;

pub mod processor;
pub mod runner;
pub mod scheduler;
pub mod store;

// Re-exports for ergonomic access
pub use domain::{RawWorkflowSpec, TaskRecord, WorkflowSpec, WorkflowSpecBuilder};
pub use error::TaskError;
pub use processor::{ProcessorRegistry, StepError, StepInput, StepProcessor};
pub use runner::TaskRunner;
pub use scheduler::Scheduler;
pub use store::memory::InMemoryTaskStore;
pub use store::{ListTasksOptions, StoreConfig, TaskPage, TaskStore};
pub use types::*;
