//! Workflow submissions and their validation.
//!
//! A [`RawWorkflowSpec`] is whatever the caller sent. [`WorkflowSpec::validate`]
//! turns it into a [`WorkflowSpec`], the only form the store and runner
//! accept. Validation happens once, at submission; the validated spec is
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::types::step::StepKind;

/// An unvalidated workflow submission.
///
/// # Examples
///
/// ```
/// use insights_tasks::RawWorkflowSpec;
///
/// let raw: RawWorkflowSpec = serde_json::from_str(
///     r#"{ "target": "dQw4w9WgXcQ", "steps": ["analytics", "content"] }"#,
/// ).unwrap();
/// assert_eq!(raw.steps.len(), 2);
/// assert!(raw.parameters.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWorkflowSpec {
    /// Opaque target identifier, e.g. a video id.
    #[serde(default)]
    pub target: String,
    /// Step tokens in execution order.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Parameters shared by every step.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl RawWorkflowSpec {
    /// Creates a raw spec from string step tokens.
    pub fn new<I, S>(target: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.into(),
            steps: steps.into_iter().map(Into::into).collect(),
            parameters: Map::new(),
        }
    }

    /// Adds a parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A validated, immutable workflow declaration.
///
/// Invariants: `target` is non-empty (after trimming), `steps` is non-empty,
/// and every step is a recognized [`StepKind`]. Duplicate steps are allowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSpec {
    target: String,
    steps: Vec<StepKind>,
    parameters: Map<String, Value>,
}

impl WorkflowSpec {
    /// Validates a raw submission.
    ///
    /// # Errors
    ///
    /// [`TaskError::InvalidSpec`] when the target is blank, the step list is
    /// empty, or a step token is not one of `analytics`, `content`,
    /// `critique`.
    ///
    /// # Examples
    ///
    /// ```
    /// use insights_tasks::{RawWorkflowSpec, StepKind, WorkflowSpec};
    ///
    /// let spec = WorkflowSpec::validate(RawWorkflowSpec::new("v1", ["analytics"])).unwrap();
    /// assert_eq!(spec.target(), "v1");
    /// assert_eq!(spec.steps(), &[StepKind::Analytics]);
    ///
    /// assert!(WorkflowSpec::validate(RawWorkflowSpec::new("", ["analytics"])).is_err());
    /// assert!(WorkflowSpec::validate(RawWorkflowSpec::new("v1", Vec::<String>::new())).is_err());
    /// assert!(WorkflowSpec::validate(RawWorkflowSpec::new("v1", ["publish"])).is_err());
    /// ```
    pub fn validate(raw: RawWorkflowSpec) -> Result<Self, TaskError> {
        let target = raw.target.trim();
        if target.is_empty() {
            return Err(TaskError::invalid_spec("target must not be empty"));
        }
        if raw.steps.is_empty() {
            return Err(TaskError::invalid_spec("steps must not be empty"));
        }

        let steps = raw
            .steps
            .iter()
            .map(|token| token.parse::<StepKind>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            target: target.to_string(),
            steps,
            parameters: raw.parameters,
        })
    }

    /// Starts a typed builder for in-process callers.
    ///
    /// # Examples
    ///
    /// ```
    /// use insights_tasks::{StepKind, WorkflowSpec};
    ///
    /// let spec = WorkflowSpec::builder("v1")
    ///     .step(StepKind::Analytics)
    ///     .step(StepKind::Content)
    ///     .param("content_type", "tweet")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(spec.steps().len(), 2);
    /// assert_eq!(spec.parameters()["content_type"], "tweet");
    /// ```
    pub fn builder(target: impl Into<String>) -> WorkflowSpecBuilder {
        WorkflowSpecBuilder {
            raw: RawWorkflowSpec {
                target: target.into(),
                ..RawWorkflowSpec::default()
            },
        }
    }

    /// The target identifier.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The steps, in execution order.
    pub fn steps(&self) -> &[StepKind] {
        &self.steps
    }

    /// Parameters shared by every step.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }
}

/// Builder returned by [`WorkflowSpec::builder`].
#[derive(Debug, Clone)]
pub struct WorkflowSpecBuilder {
    raw: RawWorkflowSpec,
}

impl WorkflowSpecBuilder {
    /// Appends a step.
    pub fn step(mut self, kind: StepKind) -> Self {
        self.raw.steps.push(kind.as_str().to_string());
        self
    }

    /// Sets a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw.parameters.insert(key.into(), value.into());
        self
    }

    /// Validates and returns the spec.
    pub fn build(self) -> Result<WorkflowSpec, TaskError> {
        WorkflowSpec::validate(self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_is_trimmed() {
        let spec = WorkflowSpec::validate(RawWorkflowSpec::new("  v1 ", ["analytics"])).unwrap();
        assert_eq!(spec.target(), "v1");
    }

    #[test]
    fn whitespace_target_rejected() {
        let err = WorkflowSpec::validate(RawWorkflowSpec::new("   ", ["analytics"])).unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let spec = WorkflowSpec::validate(RawWorkflowSpec::new(
            "v1",
            ["analytics", "content", "analytics"],
        ))
        .unwrap();
        assert_eq!(
            spec.steps(),
            &[StepKind::Analytics, StepKind::Content, StepKind::Analytics]
        );
    }

    #[test]
    fn one_bad_token_rejects_the_whole_spec() {
        let err = WorkflowSpec::validate(RawWorkflowSpec::new(
            "v1",
            ["analytics", "transcript"],
        ))
        .unwrap_err();
        assert!(matches!(err, TaskError::InvalidSpec { .. }));
        assert!(err.to_string().contains("transcript"));
    }

    #[test]
    fn parameters_pass_through_unchanged() {
        let raw = RawWorkflowSpec::new("v1", ["content"])
            .with_parameter("content_type", "blog_post")
            .with_parameter("options", json!({ "tone": "casual", "length": 3 }));
        let spec = WorkflowSpec::validate(raw.clone()).unwrap();
        assert_eq!(spec.parameters(), &raw.parameters);
    }

    #[test]
    fn missing_fields_deserialize_to_invalid_spec() {
        let raw: RawWorkflowSpec = serde_json::from_value(json!({})).unwrap();
        assert!(WorkflowSpec::validate(raw).is_err());
    }
}
