//! The step processor seam.
//!
//! A [`StepProcessor`] implements the work for one [`StepKind`]. The engine
//! knows nothing about what a processor does: it hands over the spec's
//! parameters and the results of earlier steps, and stores whatever payload
//! comes back. Shape checks on that payload are the processor's job.
//!
//! Processors are looked up through a [`ProcessorRegistry`], a closed map
//! from step kind to implementation. A spec naming a kind with no
//! registered processor is rejected at submission.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::WorkflowSpec;
use crate::types::step::StepKind;

/// An error reported by a processor. Recorded on the task as a
/// [`StepFailure`](crate::types::task::StepFailure) with kind `step_error`.
#[derive(Debug, Error)]
pub enum StepError {
    /// Parameters or prior results were missing or had the wrong shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An external collaborator failed.
    #[error("{service} request failed: {message}")]
    Upstream {
        /// Name of the collaborator, e.g. `youtube`.
        service: String,
        /// What the collaborator reported.
        message: String,
    },

    /// Any other processing failure.
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    /// Shorthand for [`StepError::Upstream`].
    pub fn upstream(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// A stable token naming the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Upstream { .. } => "upstream",
            Self::Failed(_) => "failed",
        }
    }
}

/// Everything a processor sees for one step invocation.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// The task being run.
    pub task_id: &'a str,
    /// The spec's target identifier.
    pub target: &'a str,
    /// The step being run.
    pub step: StepKind,
    /// Spec parameters, narrowed to the processor's declared keys.
    pub parameters: &'a Map<String, Value>,
    /// Results of every step completed so far in this run.
    pub prior: &'a IndexMap<StepKind, Value>,
}

impl<'a> StepInput<'a> {
    /// A string parameter, if present and a string.
    pub fn param_str(&self, key: &str) -> Option<&'a str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// The payload an earlier step produced.
    pub fn prior_result(&self, kind: StepKind) -> Option<&'a Value> {
        self.prior.get(&kind)
    }
}

/// Implements one step kind.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use insights_tasks::processor::{StepError, StepInput, StepProcessor};
/// use insights_tasks::StepKind;
/// use serde_json::{json, Value};
///
/// struct Echo;
///
/// #[async_trait]
/// impl StepProcessor for Echo {
///     fn kind(&self) -> StepKind {
///         StepKind::Analytics
///     }
///
///     async fn process(&self, input: StepInput<'_>) -> Result<Value, StepError> {
///         Ok(json!({ "target": input.target }))
///     }
/// }
/// ```
#[async_trait]
pub trait StepProcessor: Send + Sync {
    /// The step kind this processor handles.
    fn kind(&self) -> StepKind;

    /// Parameter keys this processor reads. `None` passes every parameter.
    fn parameter_keys(&self) -> Option<&'static [&'static str]> {
        None
    }

    /// Runs the step.
    async fn process(&self, input: StepInput<'_>) -> Result<Value, StepError>;
}

/// Maps each step kind to its processor.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<StepKind, Arc<dyn StepProcessor>>,
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ProcessorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor under its own [`kind`](StepProcessor::kind),
    /// replacing any earlier one for that kind.
    pub fn with_processor(mut self, processor: Arc<dyn StepProcessor>) -> Self {
        self.processors.insert(processor.kind(), processor);
        self
    }

    /// The processor for `kind`.
    pub fn get(&self, kind: StepKind) -> Option<Arc<dyn StepProcessor>> {
        self.processors.get(&kind).cloned()
    }

    /// Registered kinds in canonical order.
    pub fn kinds(&self) -> Vec<StepKind> {
        StepKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.processors.contains_key(kind))
            .collect()
    }

    /// The first step in `spec` with no registered processor, if any.
    pub fn first_unsupported(&self, spec: &WorkflowSpec) -> Option<StepKind> {
        spec.steps()
            .iter()
            .copied()
            .find(|kind| !self.processors.contains_key(kind))
    }

    /// Returns `true` if every step in `spec` has a processor.
    pub fn supports(&self, spec: &WorkflowSpec) -> bool {
        self.first_unsupported(spec).is_none()
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Narrows `parameters` to the keys a processor declared.
pub(crate) fn scoped_parameters(
    parameters: &Map<String, Value>,
    keys: Option<&[&str]>,
) -> Map<String, Value> {
    match keys {
        None => parameters.clone(),
        Some(keys) => parameters
            .iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(StepKind);

    #[async_trait]
    impl StepProcessor for Fixed {
        fn kind(&self) -> StepKind {
            self.0
        }

        async fn process(&self, _input: StepInput<'_>) -> Result<Value, StepError> {
            Ok(json!(null))
        }
    }

    #[test]
    fn registry_keys_by_processor_kind() {
        let registry = ProcessorRegistry::new()
            .with_processor(Arc::new(Fixed(StepKind::Critique)))
            .with_processor(Arc::new(Fixed(StepKind::Analytics)));

        assert_eq!(
            registry.kinds(),
            vec![StepKind::Analytics, StepKind::Critique]
        );
        assert!(registry.get(StepKind::Content).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn supports_reports_first_missing_kind() {
        let registry =
            ProcessorRegistry::new().with_processor(Arc::new(Fixed(StepKind::Analytics)));
        let spec = WorkflowSpec::builder("v1")
            .step(StepKind::Analytics)
            .step(StepKind::Content)
            .step(StepKind::Critique)
            .build()
            .unwrap();

        assert!(!registry.supports(&spec));
        assert_eq!(registry.first_unsupported(&spec), Some(StepKind::Content));
    }

    #[test]
    fn scoped_parameters_filters_by_declared_keys() {
        let mut params = Map::new();
        params.insert("content_type".into(), json!("blog"));
        params.insert("tone".into(), json!("dry"));

        let scoped = scoped_parameters(&params, Some(&["content_type"][..]));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped["content_type"], json!("blog"));

        assert_eq!(scoped_parameters(&params, None), params);
    }

    #[test]
    fn step_error_kinds_and_messages() {
        let err = StepError::upstream("youtube", "quota exceeded");
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.to_string(), "youtube request failed: quota exceeded");
        assert_eq!(StepError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(StepError::Failed("boom".into()).to_string(), "boom");
    }

    #[test]
    fn step_input_helpers() {
        let mut params = Map::new();
        params.insert("content_type".into(), json!("thread"));
        params.insert("count".into(), json!(3));
        let mut prior = IndexMap::new();
        prior.insert(StepKind::Analytics, json!({"score": 1}));

        let input = StepInput {
            task_id: "t",
            target: "v",
            step: StepKind::Content,
            parameters: &params,
            prior: &prior,
        };
        assert_eq!(input.param_str("content_type"), Some("thread"));
        assert_eq!(input.param_str("count"), None);
        assert_eq!(
            input.prior_result(StepKind::Analytics),
            Some(&json!({"score": 1}))
        );
        assert!(input.prior_result(StepKind::Critique).is_none());
    }
}
