//! The closed set of workflow step kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

/// A category of work a workflow step performs.
///
/// The set is closed: submissions naming any other token are rejected at
/// validation time, so the runner never meets an unknown kind.
///
/// # Examples
///
/// ```
/// use insights_tasks::StepKind;
///
/// let kind: StepKind = "content".parse().unwrap();
/// assert_eq!(kind, StepKind::Content);
/// assert_eq!(kind.to_string(), "content");
/// assert!("summary".parse::<StepKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Video metrics and comment insights.
    Analytics,
    /// Generated content (social post, blog post, ...).
    Content,
    /// Critique and improvement of generated content.
    Critique,
}

impl StepKind {
    /// Every step kind, in canonical pipeline order.
    pub const ALL: [StepKind; 3] = [StepKind::Analytics, StepKind::Content, StepKind::Critique];

    /// The wire token for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Content => "content",
            Self::Critique => "critique",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "analytics" => Ok(Self::Analytics),
            "content" => Ok(Self::Content),
            "critique" => Ok(Self::Critique),
            other => Err(TaskError::invalid_spec(format!(
                "unknown step '{other}' (expected one of: analytics, content, critique)"
            ))),
        }
    }
}
