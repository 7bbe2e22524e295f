//! Tracking history endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{body, path, query};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::{NewTracking, TaskId, TaskTracking, TrackingPatch, TrackingStats};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingQuery {
    pub task_id: Option<TaskId>,
    pub assignment_id: Option<i64>,
}

/// GET /api/tracking?taskId= or ?assignmentId=
pub async fn list_tracking(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TrackingQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TaskTracking>>> {
    let filter = query(params)?;
    let records = match (filter.task_id, filter.assignment_id) {
        (Some(task_id), _) => state.db.tracking_for_task(task_id)?,
        (None, Some(assignment_id)) => state.db.tracking_for_assignment(assignment_id)?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "taskId or assignmentId is required".into(),
            ))
        }
    };
    Ok(Json(records))
}

/// POST /api/tracking
pub async fn create_tracking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTracking>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskTracking>)> {
    let new = body(payload)?;
    let record = state.db.create_tracking(&new)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/tracking/:id
pub async fn update_tracking(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TrackingPatch>, JsonRejection>,
) -> ApiResult<Json<TaskTracking>> {
    let id = path(id)?;
    let patch = body(payload)?;
    Ok(Json(state.db.update_tracking(id, &patch)?))
}

/// GET /api/tracking/stats/:taskId
pub async fn tracking_stats(
    State(state): State<Arc<AppState>>,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Json<TrackingStats>> {
    Ok(Json(state.db.tracking_stats(path(task_id)?)?))
}
