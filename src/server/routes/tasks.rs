//! Task definition endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{body, path, SuccessResponse};
use crate::server::error::ApiResult;
use crate::server::state::AppState;
use crate::store::{NewTask, TaskDefinition, TaskId, TaskPatch};

type TaskPath = Result<Path<TaskId>, PathRejection>;

/// GET /api/tasks - All task definitions, newest first
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<TaskDefinition>>> {
    Ok(Json(state.db.list_tasks()?))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    id: TaskPath,
) -> ApiResult<Json<TaskDefinition>> {
    Ok(Json(state.db.get_task(path(id)?)?))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskDefinition>)> {
    let new = body(payload)?;
    let task = state.db.create_task(&new)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/tasks/:id - Partial update
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    id: TaskPath,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<TaskDefinition>> {
    let id = path(id)?;
    let patch = body(payload)?;
    Ok(Json(state.db.update_task(id, &patch)?))
}

/// DELETE /api/tasks/:id - Also removes assignments and tracking history
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    id: TaskPath,
) -> ApiResult<Json<SuccessResponse>> {
    state.db.delete_task(path(id)?)?;
    Ok(SuccessResponse::ok())
}
