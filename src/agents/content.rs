//! The `content` step: turns analytics into a post and an image prompt.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use insights_tasks::{StepError, StepInput, StepKind, StepProcessor};
use serde_json::{json, Value};
use tracing::debug;

use super::upstream;
use crate::services::llm::TextGenerator;

pub const DEFAULT_CONTENT_TYPE: &str = "social_post";

const SYSTEM_PROMPT: &str =
    "You write concise, engaging copy for video creators. Reply with the requested text only.";

/// Characters of generated content quoted back into the image prompt request.
const IMAGE_CONTEXT_CHARS: usize = 500;

pub struct ContentAgent {
    generator: Arc<dyn TextGenerator>,
}

impl ContentAgent {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    async fn ask(&self, prompt: &str) -> Result<String, StepError> {
        self.generator
            .generate(prompt, Some(SYSTEM_PROMPT))
            .await
            .map_err(|e| upstream("llm", e))
    }
}

#[async_trait]
impl StepProcessor for ContentAgent {
    fn kind(&self) -> StepKind {
        StepKind::Content
    }

    fn parameter_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["content_type"])
    }

    async fn process(&self, input: StepInput<'_>) -> Result<Value, StepError> {
        let content_type = input
            .param_str("content_type")
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        let analytics = input.prior_result(StepKind::Analytics);
        debug!(
            task_id = input.task_id,
            content_type,
            has_analytics = analytics.is_some(),
            "generating content"
        );

        let content = self.ask(&content_prompt(analytics, content_type)).await?;
        let image_prompt = self.ask(&image_prompt(&content, analytics)).await?;

        Ok(json!({
            "content": content,
            "image_prompt": image_prompt,
            "content_type": content_type,
            "metadata": {
                "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                "model_used": self.generator.model(),
            },
        }))
    }
}

fn content_prompt(analytics: Option<&Value>, content_type: &str) -> String {
    let section = |key: &str| {
        analytics
            .and_then(|a| a.get(key))
            .map_or_else(|| "{}".to_string(), Value::to_string)
    };
    format!(
        "Based on the following context, generate {content_type}.\n\n\
         Analytics summary:\n\
         - Video performance: {}\n\
         - Engagement: {}\n\
         - Comment insights: {}\n\n\
         Generate engaging and relevant {content_type}.",
        section("video_analytics"),
        section("engagement"),
        section("comment_analysis"),
    )
}

fn image_prompt(content: &str, analytics: Option<&Value>) -> String {
    let excerpt: String = content.chars().take(IMAGE_CONTEXT_CHARS).collect();
    let summary = analytics
        .and_then(|a| a.get("summary"))
        .and_then(Value::as_str)
        .unwrap_or("none");
    format!(
        "Create an image prompt for a visual that accompanies this content.\n\n\
         Content: {excerpt}\n\
         Analytics: {summary}\n\n\
         Reply with one clear, descriptive image prompt."
    )
}
