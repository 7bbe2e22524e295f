//! Task assignment endpoints, including recurrence expansion.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::{body, checked_range, path, query, RangeQuery, SuccessResponse, MAX_RANGE_DAYS};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::{expand, Assignment, AssignmentPatch, NewAssignment, TaskAssignment, TaskId};

type AssignmentPath = Result<Path<i64>, PathRejection>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentQuery {
    pub date_str: Option<NaiveDate>,
    pub task_id: Option<TaskId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Body of `POST /api/assignments/materialize`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeRequest {
    pub task_id: TaskId,
    pub date_str: NaiveDate,
    #[serde(flatten)]
    pub patch: AssignmentPatch,
}

#[derive(Debug, Deserialize)]
pub struct CompleteDaysRequest {
    pub dates: Vec<NaiveDate>,
}

/// GET /api/assignments - Filter by dateStr, taskId, or startDate+endDate
pub async fn list_assignments(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AssignmentQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TaskAssignment>>> {
    let assignments = match query(params)? {
        AssignmentQuery {
            date_str: Some(date),
            ..
        } => state.db.assignments_on(date)?,
        AssignmentQuery {
            task_id: Some(task_id),
            ..
        } => state.db.assignments_for_task(task_id)?,
        AssignmentQuery {
            start_date: Some(start),
            end_date: Some(end),
            ..
        } => state.db.assignments_in_range(checked_range(start, end)?)?,
        _ => {
            return Err(ApiError::BadRequest(
                "dateStr, taskId, or startDate and endDate is required".into(),
            ))
        }
    };
    Ok(Json(assignments))
}

/// GET /api/assignments/expanded - Stored plus virtual recurring entries
pub async fn list_expanded(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Assignment>>> {
    let range = query(params)?.range()?;
    let snapshot = state.db.snapshot(range)?;
    Ok(Json(expand(&snapshot.tasks, &snapshot.assignments, range)))
}

/// GET /api/assignments/:id
pub async fn get_assignment(
    State(state): State<Arc<AppState>>,
    id: AssignmentPath,
) -> ApiResult<Json<TaskAssignment>> {
    Ok(Json(state.db.get_assignment(path(id)?)?))
}

/// POST /api/assignments
pub async fn create_assignment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAssignment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskAssignment>)> {
    let new = body(payload)?;
    let assignment = state.db.create_assignment(&new)?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// POST /api/assignments/materialize - Persist a virtual entry with changes
pub async fn materialize_assignment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MaterializeRequest>, JsonRejection>,
) -> ApiResult<Json<TaskAssignment>> {
    let request = body(payload)?;
    let assignment =
        state
            .db
            .materialize_assignment(request.task_id, request.date_str, &request.patch)?;
    Ok(Json(assignment))
}

/// POST /api/assignments/complete-days - Mark every expected task on the dates done
pub async fn complete_days(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompleteDaysRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<TaskAssignment>>> {
    let request = body(payload)?;
    if request.dates.len() > MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_RANGE_DAYS} dates can be completed at once"
        )));
    }
    Ok(Json(state.db.complete_days(&request.dates)?))
}

/// PUT /api/assignments/:id - `durationOverride: null` restores the baseline
pub async fn update_assignment(
    State(state): State<Arc<AppState>>,
    id: AssignmentPath,
    payload: Result<Json<AssignmentPatch>, JsonRejection>,
) -> ApiResult<Json<TaskAssignment>> {
    let id = path(id)?;
    let patch = body(payload)?;
    Ok(Json(state.db.update_assignment(id, &patch)?))
}

/// DELETE /api/assignments/:id
pub async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    id: AssignmentPath,
) -> ApiResult<Json<SuccessResponse>> {
    state.db.delete_assignment(path(id)?)?;
    Ok(SuccessResponse::ok())
}
