//! Domain types for internal task representation.

pub mod record;
pub mod spec;

pub use record::TaskRecord;
pub use spec::{RawWorkflowSpec, WorkflowSpec, WorkflowSpecBuilder};
