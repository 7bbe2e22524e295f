//! Statistics endpoint.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

use super::{checked_range, query};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::{compute_report, StatsReport};

/// Largest accepted trend window.
pub const MAX_TREND_DAYS: u32 = 366;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub trend_days: Option<u32>,
}

/// GET /api/stats - Streaks, totals and chart data for a window.
///
/// The window defaults to the configured start date through today.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    params: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Json<StatsReport>> {
    let params = query(params)?;
    let settings = state.db.stats_settings()?;
    let today = Local::now().date_naive();

    let trend_days = params.trend_days.unwrap_or(settings.trend_days);
    if trend_days > MAX_TREND_DAYS {
        return Err(ApiError::BadRequest(format!(
            "trendDays must be at most {MAX_TREND_DAYS}"
        )));
    }

    let range = checked_range(
        params.start_date.unwrap_or(settings.start_date),
        params.end_date.unwrap_or(today),
    )?;
    let snapshot = state.db.snapshot(range)?;

    Ok(Json(compute_report(
        &snapshot.tasks,
        &snapshot.assignments,
        &snapshot.rest_days,
        range,
        today,
        trend_days,
    )))
}
