use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::warn;

use super::super::AppState;
use crate::core::engine::TaskSubmission;
use crate::core::engine::stats::JobStatusTracker;
use crate::core::error::is_validation;

#[derive(serde::Deserialize)]
pub struct SubmitTaskRequest {
    prompt: String,
    agent_id: String,
    #[serde(default)]
    work_folder: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    interaction_mode: Option<String>,
    #[serde(default)]
    checkpoint_pattern: Option<String>,
    #[serde(default)]
    max_iterations: Option<u32>,
    #[serde(default)]
    keep_records: Option<usize>,
    #[serde(default)]
    elevate: bool,
}

/// Accepts a task and returns its id immediately; the lifecycle runs in the
/// background. Validation problems are the only 400s.
pub async fn submit_task(
    State(state): State<AppState>,
    Json(payload): Json<SubmitTaskRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let submission = TaskSubmission {
        prompt: payload.prompt,
        agent_id: payload.agent_id,
        work_folder: payload.work_folder,
        session_id: payload.session_id,
        interaction_mode: payload.interaction_mode,
        checkpoint_pattern: payload.checkpoint_pattern,
        max_iterations: payload.max_iterations,
        keep_records: payload.keep_records,
        elevate: payload.elevate,
    };

    match state.engine.submit(submission).await {
        Ok(task_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "success": true, "task_id": task_id })),
        ),
        Err(e) => {
            let status = if is_validation(&e) {
                StatusCode::BAD_REQUEST
            } else {
                warn!("Task submission failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

pub async fn get_task(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.engine.active_jobs().await.iter().find(|d| d.task_id == task_id) {
        Some(descriptor) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "task": descriptor })),
        ),
        None => {
            // Resolved tasks linger in the bounded recent-completions list.
            let completed = state.engine.completed_jobs().await;
            match completed.iter().rev().find(|c| c.task_id == task_id) {
                Some(job) => (
                    StatusCode::OK,
                    Json(serde_json::json!({ "success": true, "task": job })),
                ),
                None => (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({ "success": false, "error": "Task not found" })),
                ),
            }
        }
    }
}

pub async fn list_tasks(State(state): State<AppState>) -> Json<serde_json::Value> {
    let active = state.engine.active_jobs().await;
    let completed = state.engine.completed_jobs().await;
    Json(serde_json::json!({
        "success": true,
        "active": active,
        "completed": completed,
    }))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.engine.stats();
    Json(serde_json::json!({ "success": true, "stats": stats }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.engine.stats();
    Json(serde_json::json!({
        "status": "ok",
        "active_tasks": stats.active,
    }))
}
