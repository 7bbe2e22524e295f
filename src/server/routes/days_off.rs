//! Rest day endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{body, path, query, RangeQuery};
use crate::server::error::ApiResult;
use crate::server::state::AppState;
use crate::store::DayOff;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOffRequest {
    pub date_str: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct UnmarkResponse {
    pub success: bool,
    /// False when the date was not a rest day.
    pub removed: bool,
}

/// GET /api/days-off?startDate=&endDate=
pub async fn list_days_off(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DayOff>>> {
    let range = query(params)?.range()?;
    Ok(Json(state.db.days_off_in_range(range)?))
}

/// POST /api/days-off
pub async fn mark_day_off(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DayOffRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DayOff>)> {
    let request = body(payload)?;
    let day_off = state.db.mark_day_off(request.date_str)?;
    tracing::debug!(date = %request.date_str, "Marked rest day");
    Ok((StatusCode::CREATED, Json(day_off)))
}

/// DELETE /api/days-off/:dateStr - Unmarking a normal day succeeds
pub async fn unmark_day_off(
    State(state): State<Arc<AppState>>,
    date: Result<Path<NaiveDate>, PathRejection>,
) -> ApiResult<Json<UnmarkResponse>> {
    let removed = state.db.unmark_day_off(path(date)?)?;
    Ok(Json(UnmarkResponse {
        success: true,
        removed,
    }))
}
