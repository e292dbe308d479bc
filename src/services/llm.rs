//! Text generation through a local Ollama server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_success, ServiceError};
use crate::config::LlmConfig;

/// Generates text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name reported in step metadata.
    fn model(&self) -> &str;

    /// Returns the model's reply to `prompt`, optionally steered by a
    /// system prompt.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, ServiceError>;
}

/// Client for Ollama's `/api/chat` endpoint (non-streaming).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    chat_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.base_url,
            config.model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, ServiceError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let response = self.http.post(&self.chat_url).json(&request).send().await?;
        let reply: ChatResponse = ensure_success(response).await?.json().await?;

        tracing::debug!(model = %self.model, chars = reply.message.content.len(), "llm reply");
        Ok(reply.message.content.trim().to_string())
    }
}

/// Pulls the JSON object spanning the first `{` to the last `}` out of a
/// model reply. Returns `None` if there is none or it does not parse as an
/// object.
///
/// # Examples
///
/// ```
/// use video_insights::services::llm::extract_json_object;
///
/// let reply = "Sure! Here you go:\n```json\n{\"score\": 8}\n```";
/// assert_eq!(extract_json_object(reply).unwrap()["score"], 8);
/// assert!(extract_json_object("no json here").is_none());
/// ```
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_embedded_object() {
        let text = "Critique:\n{\"score\": 7, \"strengths\": [\"clear\"]}\nThanks";
        assert_eq!(
            extract_json_object(text),
            Some(json!({"score": 7, "strengths": ["clear"]}))
        );
    }

    #[test]
    fn rejects_broken_or_reversed_braces() {
        assert!(extract_json_object("} before {").is_none());
        assert!(extract_json_object("{ not json }").is_none());
        assert!(extract_json_object("").is_none());
    }

    #[test]
    fn chat_request_shape() {
        let request = ChatRequest {
            model: "gemma3:latest",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "be brief",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            stream: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "gemma3:latest",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "stream": false
            })
        );
    }
}
