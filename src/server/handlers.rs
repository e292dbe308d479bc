//! Route handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use insights_tasks::{
    CleanupReport, ListTasksOptions, RawWorkflowSpec, StepKind, TaskStatus, TaskSummary, TaskView,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{ApiError, AppState};
use crate::agents;
use crate::services::youtube;

/// Steps run by `/api/analyze` when the request names none.
pub const DEFAULT_WORKFLOW: [StepKind; 3] = StepKind::ALL;

/// Steps run by `/api/content`.
pub const CONTENT_WORKFLOW: [StepKind; 2] = [StepKind::Analytics, StepKind::Content];

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct AgentInfo {
    pub name: StepKind,
    /// Parameter keys the agent reads; `None` means it sees every parameter.
    pub parameters: Option<&'static [&'static str]>,
}

#[derive(Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
}

/// Lists registered step kinds in pipeline order.
pub async fn agents(State(state): State<Arc<AppState>>) -> Json<AgentsResponse> {
    let registry = state.scheduler.registry();
    let agents = registry
        .kinds()
        .into_iter()
        .filter_map(|kind| {
            registry.get(kind).map(|processor| AgentInfo {
                name: kind,
                parameters: processor.parameter_keys(),
            })
        })
        .collect();
    Json(AgentsResponse { agents })
}

/// Body of `/api/analyze` and `/api/content`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    /// Step tokens; validated by the scheduler.
    #[serde(default)]
    pub workflow_steps: Option<Vec<String>>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Run to completion before responding.
    #[serde(default)]
    pub wait: bool,
}

impl AnalyzeRequest {
    /// Resolves the target video and builds the raw workflow.
    fn into_spec(self, default_steps: &[StepKind]) -> Result<RawWorkflowSpec, ApiError> {
        let input = self
            .video_id
            .as_deref()
            .or(self.video_url.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("video_id or video_url is required"))?;
        let video_id = youtube::extract_video_id(input)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid YouTube video: {input}")))?;

        let steps: Vec<String> = match self.workflow_steps {
            Some(steps) => steps,
            None => default_steps.iter().map(|k| k.as_str().to_string()).collect(),
        };
        let mut raw = RawWorkflowSpec::new(video_id, steps);
        raw.parameters = self.parameters;
        if let Some(content_type) = self.content_type {
            raw.parameters
                .insert("content_type".into(), Value::String(content_type));
        }
        Ok(raw)
    }
}

/// Submits a workflow. Responds `202` with a receipt, or `200` with the
/// final task view when `wait` is set.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    run_workflow(&state, request, &DEFAULT_WORKFLOW).await
}

/// Analytics followed by content generation. `workflow_steps` is ignored.
pub async fn content(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(mut request) = body?;
    request.workflow_steps = None;
    run_workflow(&state, request, &CONTENT_WORKFLOW).await
}

/// A [`TaskView`] plus a plain-text recap once the workflow has completed.
#[derive(Debug, Serialize)]
pub struct WorkflowResult {
    #[serde(flatten)]
    pub task: TaskView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl From<TaskView> for WorkflowResult {
    fn from(task: TaskView) -> Self {
        let summary = agents::workflow_summary(&task);
        Self { task, summary }
    }
}

async fn run_workflow(
    state: &AppState,
    request: AnalyzeRequest,
    default_steps: &[StepKind],
) -> Result<Response, ApiError> {
    let wait = request.wait;
    let raw = request.into_spec(default_steps)?;
    if wait {
        let record = state.scheduler.execute(raw).await?;
        Ok(Json(WorkflowResult::from(record.to_view())).into_response())
    } else {
        let receipt = state.scheduler.submit(raw).await?;
        Ok((StatusCode::ACCEPTED, Json(receipt)).into_response())
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ExtractResponse {
    pub video_id: String,
}

pub async fn extract_video_id(
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(request) = body?;
    let url = request
        .video_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("video_url is required"))?;
    let video_id = youtube::extract_video_id(&url)
        .ok_or_else(|| ApiError::bad_request("Invalid YouTube URL"))?;
    Ok(Json(ExtractResponse { video_id }))
}

pub async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<WorkflowResult>, ApiError> {
    let record = state.scheduler.status(&task_id).await?;
    Ok(Json(record.to_view().into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<TaskStatus>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub tasks: Vec<TaskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub total: usize,
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let Query(query) = query?;
    let page = state
        .scheduler
        .list(ListTasksOptions {
            status: query.status,
            cursor: query.cursor,
            limit: query.limit,
        })
        .await?;
    Ok(Json(ListResponse {
        tasks: page.tasks,
        next_cursor: page.next_cursor,
        total: page.total,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupQuery {
    pub max_age_hours: Option<f64>,
}

pub async fn cleanup_tasks(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CleanupQuery>, QueryRejection>,
) -> Result<Json<CleanupReport>, ApiError> {
    let Query(query) = query?;
    let max_age = match query.max_age_hours {
        Some(hours) => Duration::try_from_secs_f64(hours * 3600.0).map_err(|_| {
            ApiError::bad_request("max_age_hours must be a non-negative number")
        })?,
        None => state.config.tasks.cleanup_max_age(),
    };
    debug!(max_age_secs = max_age.as_secs(), "manual cleanup requested");
    Ok(Json(state.scheduler.cleanup(max_age).await?))
}
