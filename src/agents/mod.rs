//! The three step processors: analytics, content and critique.
//!
//! Each agent wraps one or more collaborators from [`crate::services`] and
//! implements [`StepProcessor`] for its [`StepKind`].

pub mod analytics;
pub mod content;
pub mod critique;

use std::sync::Arc;

use insights_tasks::{ProcessorRegistry, StepError, StepKind, TaskStatus, TaskView};
use serde_json::Value;

pub use analytics::AnalyticsAgent;
pub use content::ContentAgent;
pub use critique::CritiqueAgent;

use crate::services::llm::TextGenerator;
use crate::services::youtube::VideoSource;
use crate::services::ServiceError;

/// Registers all three agents.
pub fn default_registry(
    videos: Arc<dyn VideoSource>,
    generator: Arc<dyn TextGenerator>,
    max_comments: usize,
) -> ProcessorRegistry {
    ProcessorRegistry::new()
        .with_processor(Arc::new(AnalyticsAgent::new(videos, max_comments)))
        .with_processor(Arc::new(ContentAgent::new(Arc::clone(&generator))))
        .with_processor(Arc::new(CritiqueAgent::new(generator)))
}

/// Maps a collaborator failure onto a step error.
pub(crate) fn upstream(service: &str, err: ServiceError) -> StepError {
    match err {
        ServiceError::NotFound { what } => StepError::Failed(format!("{what} not found")),
        other => StepError::upstream(service, other),
    }
}

const SUMMARY_EXCERPT_CHARS: usize = 160;

/// Plain-text recap of a completed workflow, one line per step output.
///
/// Returns `None` until the task has completed.
pub fn workflow_summary(view: &TaskView) -> Option<String> {
    if view.status != TaskStatus::Completed {
        return None;
    }
    let steps: Vec<String> = view.steps.iter().map(ToString::to_string).collect();
    let mut lines = vec![format!("Steps completed: {}", steps.join(", "))];

    if let Some(summary) = view
        .results
        .get(&StepKind::Analytics)
        .and_then(|a| a.get("summary"))
        .and_then(Value::as_str)
    {
        lines.push(format!("Analytics: {summary}"));
    }
    if let Some(content) = view
        .results
        .get(&StepKind::Content)
        .and_then(|c| c.get("content"))
        .and_then(Value::as_str)
    {
        let mut excerpt: String = content.trim().chars().take(SUMMARY_EXCERPT_CHARS).collect();
        if content.trim().chars().count() > SUMMARY_EXCERPT_CHARS {
            excerpt.push_str("...");
        }
        lines.push(format!("Content: {excerpt}"));
    }
    if let Some(critique) = view.results.get(&StepKind::Critique) {
        let applied = critique
            .get("improvements")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let score = critique.pointer("/critique/score").cloned().unwrap_or(Value::Null);
        lines.push(format!("Critique: score {score}, {applied} improvement(s) applied"));
    }
    Some(lines.join("\n"))
}

/// Rounds to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}
