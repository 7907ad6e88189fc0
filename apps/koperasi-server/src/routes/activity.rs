//! Activity log viewer. Read-only: the log is only ever appended to.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use koperasi_core::period::PeriodQuery;
use koperasi_core::{ActivityLog, Module};
use koperasi_db::ActivityFilter;

use super::{gated, period_range};
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    gated(
        Router::new().route("/activity", get(list)),
        state,
        Module::Activity,
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub module: Option<Module>,
    pub user_id: Option<String>,
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<i64>,
}

/// GET /api/activity
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    let period = PeriodQuery {
        period: query.period,
        start: query.start,
        end: query.end,
    };
    let filter = ActivityFilter {
        module: query.module,
        user_id: query.user_id,
        range: period_range(&state, period)?,
        limit: query.limit.unwrap_or(100),
    };
    Ok(Json(state.db.activity().list(&filter).await?))
}
