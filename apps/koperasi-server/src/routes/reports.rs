//! # Report Routes
//!
//! ```text
//! GET /reports/dashboard       cards + low-stock list     (Dashboard)
//! GET /reports/chart           daily cash flow, week      (Reports)
//! GET /reports/top-products    best sellers, month        (Reports)
//! GET /reports/sales           order totals, today        (Reports)
//! ```
//!
//! Periods default as noted when the query carries none.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use koperasi_core::ledger::DailyPoint;
use koperasi_core::period::{PeriodFilter, PeriodQuery};
use koperasi_core::{DashboardSummary, Module, Product, SalesSummary, TopProduct};

use super::{gated, period_range_or};
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

const DASHBOARD_LOW_STOCK: i64 = 10;

pub fn router(state: &AppState) -> Router<AppState> {
    let dashboard = gated(
        Router::new().route("/reports/dashboard", get(dashboard)),
        state,
        Module::Dashboard,
    );
    let reports = gated(
        Router::new()
            .route("/reports/chart", get(chart))
            .route("/reports/top-products", get(top_products))
            .route("/reports/sales", get(sales)),
        state,
        Module::Reports,
    );
    dashboard.merge(reports)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub store_name: String,
    pub summary: DashboardSummary,
    pub low_stock: Vec<Product>,
}

/// GET /api/reports/dashboard
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let today = state.resolve(PeriodFilter::Today)?;

    Ok(Json(DashboardResponse {
        store_name: state.config.store_name.clone(),
        summary: state.db.reports().dashboard(&today).await?,
        low_stock: state.db.products().low_stock(DASHBOARD_LOW_STOCK).await?,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl ReportQuery {
    fn period(&self) -> PeriodQuery {
        PeriodQuery {
            period: self.period.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// GET /api/reports/chart
pub async fn chart(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<DailyPoint>>> {
    let range = period_range_or(&state, query.period(), PeriodFilter::Week)?;
    Ok(Json(state.db.reports().cash_flow(&range).await?))
}

/// GET /api/reports/top-products
pub async fn top_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<TopProduct>>> {
    let range = period_range_or(&state, query.period(), PeriodFilter::Month)?;
    let limit = query.limit.unwrap_or(5);
    Ok(Json(state.db.reports().top_products(&range, limit).await?))
}

/// GET /api/reports/sales
pub async fn sales(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<SalesSummary>> {
    let range = period_range_or(&state, query.period(), PeriodFilter::Today)?;
    Ok(Json(state.db.reports().sales_summary(&range).await?))
}
