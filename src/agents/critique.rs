//! The `critique` step: scores generated content and proposes a revision.

use std::sync::Arc;

use async_trait::async_trait;
use insights_tasks::{StepError, StepInput, StepKind, StepProcessor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::upstream;
use crate::services::llm::{extract_json_object, TextGenerator};

pub const DEFAULT_CONTENT_TYPE: &str = "general";
const CRITIQUE_METHOD: &str = "ReAct";

/// Structured review of a piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    /// 1 to 10.
    pub score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Critique {
    /// Used when the model reply carries no usable JSON.
    pub fn fallback() -> Self {
        Self {
            score: 5,
            strengths: vec!["Content provided".into()],
            weaknesses: vec!["Could not analyze".into()],
            suggestions: vec!["Review content manually".into()],
        }
    }

    /// Reads a critique out of a free-form model reply.
    pub fn parse(reply: &str) -> Option<Self> {
        let object = extract_json_object(reply)?;
        let score = object.get("score").and_then(Value::as_f64)?;
        let list = |key: &str| -> Vec<String> {
            match object.get(key) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                Some(Value::String(s)) => vec![s.clone()],
                _ => Vec::new(),
            }
        };
        Some(Self {
            score: score.round().clamp(1.0, 10.0) as u8,
            strengths: list("strengths"),
            weaknesses: list("weaknesses"),
            suggestions: list("suggestions"),
        })
    }
}

pub struct CritiqueAgent {
    generator: Arc<dyn TextGenerator>,
}

impl CritiqueAgent {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    async fn ask(&self, prompt: &str) -> Result<String, StepError> {
        self.generator
            .generate(prompt, None)
            .await
            .map_err(|e| upstream("llm", e))
    }
}

#[async_trait]
impl StepProcessor for CritiqueAgent {
    fn kind(&self) -> StepKind {
        StepKind::Critique
    }

    fn parameter_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["content_type"])
    }

    async fn process(&self, input: StepInput<'_>) -> Result<Value, StepError> {
        let content = input
            .prior_result(StepKind::Content)
            .filter(|payload| payload.get("content").is_some_and(Value::is_string))
            .ok_or_else(|| {
                StepError::InvalidInput("critique requires a prior content result".into())
            })?;
        let content_type = input
            .param_str("content_type")
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let reply = self.ask(&critique_prompt(content, content_type)).await?;
        let critique = Critique::parse(&reply).unwrap_or_else(|| {
            warn!(task_id = input.task_id, "critique reply had no usable JSON, using fallback");
            Critique::fallback()
        });
        debug!(task_id = input.task_id, score = critique.score, "content critiqued");

        let improvements: Vec<String> = self
            .ask(&improvements_prompt(content, &critique))
            .await?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        let improved_text = self.ask(&rewrite_prompt(content, &improvements)).await?;
        let mut improved_content = content.clone();
        if let Value::Object(map) = &mut improved_content {
            map.insert("improved_text".into(), Value::String(improved_text));
            map.insert("improvements_applied".into(), json!(improvements));
        }

        Ok(json!({
            "original_content": content,
            "critique": critique,
            "improvements": improvements,
            "improved_content": improved_content,
            "metadata": {
                "critique_method": CRITIQUE_METHOD,
                "model_used": self.generator.model(),
            },
        }))
    }
}

fn critique_prompt(content: &Value, content_type: &str) -> String {
    format!(
        "Critique the following content and return JSON with:\n\
         - score: 1-10 rating\n\
         - strengths: list of positive aspects\n\
         - weaknesses: list of areas for improvement\n\
         - suggestions: specific improvement recommendations\n\n\
         Content: {content}\n\
         Feedback type: {content_type}\n\n\
         Return only valid JSON."
    )
}

fn improvements_prompt(content: &Value, critique: &Critique) -> String {
    let critique = serde_json::to_string(critique).unwrap_or_default();
    format!(
        "Based on this critique, list 3-5 specific, actionable improvements, one per line.\n\n\
         Content: {content}\n\
         Critique: {critique}"
    )
}

fn rewrite_prompt(content: &Value, improvements: &[String]) -> String {
    format!(
        "Rewrite this content, applying every improvement listed.\n\n\
         Original content: {content}\n\
         Improvements:\n{}\n\n\
         Reply with the improved content only.",
        improvements.join("\n")
    )
}
