//! Video insights backend.
//!
//! Turns a YouTube video into analytics, generated content and a critique
//! by running a chain of agents on the [`insights_tasks`] engine. Workflows
//! run either inline or as background tasks that clients poll over HTTP.
//!
//! - [`config`]: TOML plus environment configuration.
//! - [`services`]: YouTube Data API and Ollama clients, sentiment scoring.
//! - [`agents`]: the `analytics`, `content` and `critique` step processors.
//! - [`server`]: the axum router.

pub mod agents;
pub mod config;
pub mod server;
pub mod services;

pub use config::{AppConfig, ConfigError};
pub use server::{router, AppState};
