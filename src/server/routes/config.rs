//! Configuration endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{body, path, stats::MAX_TREND_DAYS, SuccessResponse};
use crate::database::{STATS_START_DATE_KEY, TREND_DAYS_KEY};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub settings: Vec<ConfigSetting>,
}

#[derive(Debug, Serialize)]
pub struct ConfigSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    pub value: String,
}

/// GET /api/config - Get all configuration settings
pub async fn get_config(State(state): State<Arc<AppState>>) -> ApiResult<Json<ConfigResponse>> {
    let settings = state
        .db
        .get_all_config()?
        .into_iter()
        .map(|(key, value, description)| ConfigSetting {
            key,
            value,
            description,
        })
        .collect();

    Ok(Json(ConfigResponse { settings }))
}

/// PUT /api/config/:key - Update one setting
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    key: Result<Path<String>, PathRejection>,
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let key = path(key)?;
    let update = body(payload)?;
    let value = update.value.trim();

    match key.as_str() {
        STATS_START_DATE_KEY => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("{key} must be a YYYY-MM-DD date"))
            })?;
        }
        TREND_DAYS_KEY => match value.parse::<u32>() {
            Ok(days) if days <= MAX_TREND_DAYS => {}
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "{key} must be a whole number up to {MAX_TREND_DAYS}"
                )))
            }
        },
        _ => {}
    }

    state.db.set_config(&key, value)?;
    tracing::info!(key = %key, value = %value, "Updated config");
    Ok(SuccessResponse::ok())
}
