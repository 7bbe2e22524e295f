//! Day note endpoints.

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

use super::{body, path, query, RangeQuery, SuccessResponse};
use crate::server::error::ApiResult;
use crate::server::state::AppState;
use crate::store::DayNote;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    pub date_str: NaiveDate,
    #[serde(default)]
    pub content: String,
}

/// GET /api/day-notes?startDate=&endDate=
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DayNote>>> {
    let range = query(params)?.range()?;
    Ok(Json(state.db.notes_in_range(range)?))
}

/// POST /api/day-notes - Create or replace the note of a date
pub async fn upsert_note(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DayNote>)> {
    let request = body(payload)?;
    let note = state.db.upsert_note(request.date_str, &request.content)?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// DELETE /api/day-notes/:dateStr - Deleting a missing note succeeds
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    date: Result<Path<NaiveDate>, PathRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    state.db.delete_note(path(date)?)?;
    Ok(SuccessResponse::ok())
}
