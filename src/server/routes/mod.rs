//! Route handlers module.

pub mod assignments;
pub mod config;
pub mod day_notes;
pub mod days_off;
pub mod health;
pub mod stats;
pub mod tasks;
pub mod tracking;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::server::error::{ApiError, ApiResult};
use crate::store::DateRange;

/// Largest date window a single request may cover (about ten years).
pub const MAX_RANGE_DAYS: usize = 3660;

/// Inclusive `startDate`/`endDate` query window.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl RangeQuery {
    pub fn range(&self) -> ApiResult<DateRange> {
        checked_range(self.start_date, self.end_date)
    }
}

/// Builds a window, rejecting ones longer than [`MAX_RANGE_DAYS`].
///
/// A start after the end is an empty window, not an error.
pub fn checked_range(start: NaiveDate, end: NaiveDate) -> ApiResult<DateRange> {
    let range = DateRange::new(start, end);
    if range.len() > MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "date range {start}..{end} spans more than {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(range)
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Unwraps a JSON body, turning malformed input into a 400.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(value) = payload?;
    Ok(value)
}

/// Unwraps query parameters, turning malformed input into a 400.
pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    let Query(value) = params?;
    Ok(value)
}

/// Unwraps path parameters, turning malformed input into a 400.
pub(crate) fn path<T>(params: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    let Path(value) = params?;
    Ok(value)
}
