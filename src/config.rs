//! TOML-based service configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a runnable configuration apart from the YouTube API key.
//!
//! # Example TOML
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [youtube]
//! api_key = "AIza..."
//! max_comments = 100
//!
//! [llm]
//! base_url = "http://localhost:11434"
//! model = "gemma3:latest"
//!
//! [tasks]
//! cleanup_max_age_hours = 24
//! janitor_interval_secs = 3600
//! step_timeout_secs = 300
//! ```
//!
//! Environment variables override the file: `YOUTUBE_API_KEY`,
//! `OLLAMA_BASE_URL`, `LLM_MODEL` and `PORT`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        source: std::io::Error,
        path: String,
    },

    /// The config file is not valid TOML or does not match the schema.
    #[error("Failed to parse config TOML: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    /// The config parsed but holds an unusable value.
    #[error("Config validation error: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub youtube: YouTubeConfig,
    pub llm: LlmConfig,
    pub tasks: TasksConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Attach a permissive CORS layer to every route.
    pub cors_allow_any: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allow_any: true,
        }
    }
}

/// YouTube Data API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Upper bound on comments fetched per video.
    pub max_comments: usize,
    pub request_timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            max_comments: 200,
            request_timeout_secs: 20,
        }
    }
}

/// Ollama settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gemma3:latest".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Task engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TasksConfig {
    /// Default age threshold for `POST /api/tasks/cleanup` and the janitor.
    pub cleanup_max_age_hours: u64,
    /// Janitor period. `0` disables the janitor.
    pub janitor_interval_secs: u64,
    /// Per-step deadline. Unset means a step may block indefinitely.
    pub step_timeout_secs: Option<u64>,
    /// Cap on stored tasks. Unset means unbounded.
    pub max_tasks: Option<usize>,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            cleanup_max_age_hours: 24,
            janitor_interval_secs: 3600,
            step_timeout_secs: None,
            max_tasks: None,
        }
    }
}

impl TasksConfig {
    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_max_age_hours.saturating_mul(3600))
    }

    pub fn janitor_interval(&self) -> Option<Duration> {
        (self.janitor_interval_secs > 0).then(|| Duration::from_secs(self.janitor_interval_secs))
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Parse a TOML string into a validated [`AppConfig`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file at `path` if given, then environment
    /// overrides.
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if the TOML is malformed, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        source,
                        path: path.display().to_string(),
                    })?;
                toml::from_str(&content)?
            },
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`. Empty values
    /// are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(url) = get("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(format!("PORT is not a valid port: {port}")))?;
        }
        Ok(())
    }

    /// Checks:
    /// - `server.port` is non-zero
    /// - `llm.model` is non-empty
    /// - both base URLs parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port must be greater than 0"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::invalid("llm.model must not be empty"));
        }
        for (name, value) in [
            ("youtube.base_url", &self.youtube.base_url),
            ("llm.base_url", &self.llm.base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::invalid(format!("{name} is not a valid URL: {e}")))?;
        }
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.model, "gemma3:latest");
        assert_eq!(config.tasks.cleanup_max_age(), Duration::from_secs(24 * 3600));
        assert!(config.tasks.step_timeout().is_none());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000

            [tasks]
            step_timeout_secs = 30
            janitor_interval_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.tasks.step_timeout(), Some(Duration::from_secs(30)));
        assert!(config.tasks.janitor_interval().is_none());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = AppConfig::from_toml("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_port_rejected() {
        let err = AppConfig::from_toml("[server]\nport = 0").unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn empty_model_rejected() {
        let err = AppConfig::from_toml("[llm]\nmodel = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("YOUTUBE_API_KEY", "secret"),
                ("OLLAMA_BASE_URL", "http://ollama:11434"),
                ("LLM_MODEL", "llama3"),
                ("PORT", "8123"),
            ]))
            .unwrap();
        assert_eq!(config.youtube.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.base_url, "http://ollama:11434");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("LLM_MODEL", " ")])).unwrap();
        assert_eq!(config.llm.model, "gemma3:latest");
    }

    #[test]
    fn bad_port_env_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.toml");
        std::fs::write(&path, "[youtube]\nmax_comments = 50\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.youtube.max_comments, 50);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/insights.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
