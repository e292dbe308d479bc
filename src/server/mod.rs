//! HTTP surface over the scheduler.

pub mod error;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use insights_tasks::{InMemoryTaskStore, Scheduler, StoreConfig};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::ApiError;

use crate::agents::default_registry;
use crate::config::AppConfig;
use crate::services::llm::OllamaClient;
use crate::services::youtube::YouTubeClient;
use crate::services::ServiceError;

/// Shared application state
pub struct AppState {
    pub scheduler: Scheduler,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(scheduler: Scheduler, config: AppConfig) -> Self {
        Self { scheduler, config }
    }

    /// Wires the real YouTube and Ollama clients behind a fresh in-memory
    /// store.
    pub fn from_config(config: AppConfig) -> Result<Self, ServiceError> {
        let videos = YouTubeClient::from_config(&config.youtube)?;
        if !videos.has_api_key() {
            tracing::warn!("YOUTUBE_API_KEY is not set; analytics steps will fail");
        }
        let generator = OllamaClient::from_config(&config.llm)?;
        let registry = default_registry(
            Arc::new(videos),
            Arc::new(generator),
            config.youtube.max_comments,
        );

        let store = InMemoryTaskStore::new().with_config(StoreConfig {
            max_tasks: config.tasks.max_tasks,
            ..StoreConfig::default()
        });
        let scheduler = Scheduler::new(Arc::new(store), registry)
            .with_step_timeout(config.tasks.step_timeout());

        Ok(Self::new(scheduler, config))
    }
}

/// Builds the router. CORS allows any origin when
/// `server.cors_allow_any` is set.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_allow_any = state.config.server.cors_allow_any;

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/agents", get(handlers::agents))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/content", post(handlers::content))
        .route("/api/extract-video-id", post(handlers::extract_video_id))
        .route("/api/task/{task_id}", get(handlers::task_status))
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/tasks/cleanup", post(handlers::cleanup_tasks))
        .with_state(state);

    if cors_allow_any {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    }
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
