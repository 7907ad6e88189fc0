//! # Financial Routes
//!
//! The cooperative ledger. Rows written by a POS checkout carry an
//! `orderId` and are read-only here.
//!
//! ```text
//! GET    /financial/transactions          filtered list, newest first
//! POST   /financial/transactions          manual entry
//! GET    /financial/transactions/{id}
//! PUT    /financial/transactions/{id}     refused for order rows
//! DELETE /financial/transactions/{id}     refused for order rows
//! GET    /financial/summary               period totals + current balance
//! GET    /financial/export                CSV download (same filters)
//! ```

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use koperasi_core::export::export_transactions_csv;
use koperasi_core::input::TransactionInput;
use koperasi_core::ledger::{LedgerSummary, TransactionCategory, TransactionType};
use koperasi_core::period::PeriodQuery;
use koperasi_core::{ActivityAction, LedgerTransaction, Module, Money, NewActivity};
use koperasi_db::TransactionFilter;

use super::{gated, period_range};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/financial/transactions", get(list).post(create))
        .route(
            "/financial/transactions/{id}",
            get(get_by_id).put(update).delete(delete),
        )
        .route("/financial/summary", get(summary))
        .route("/financial/export", get(export));
    gated(routes, state, Module::Financial)
}

// =============================================================================
// Query
// =============================================================================

/// Ledger filters shared by the list and the export.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<TransactionCategory>,
    pub search: Option<String>,
    pub supplier_id: Option<String>,
    pub limit: Option<i64>,
}

impl TransactionQuery {
    fn into_filter(self, state: &AppState) -> ApiResult<TransactionFilter> {
        let period = PeriodQuery {
            period: self.period,
            start: self.start,
            end: self.end,
        };
        Ok(TransactionFilter {
            range: period_range(state, period)?,
            transaction_type: self.transaction_type,
            category: self.category,
            search: self.search,
            supplier_id: self.supplier_id,
            limit: self.limit,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/financial/transactions
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Json<Vec<LedgerTransaction>>> {
    let mut filter = query.into_filter(&state)?;
    filter.limit = Some(filter.limit.unwrap_or(200));
    Ok(Json(state.db.transactions().list(&filter).await?))
}

/// GET /api/financial/transactions/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LedgerTransaction>> {
    let row = state
        .db
        .transactions()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &id))?;
    Ok(Json(row))
}

/// POST /api/financial/transactions
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<TransactionInput>,
) -> ApiResult<Json<LedgerTransaction>> {
    user.require(&state, Module::Financial).await?;
    Ok(Json(state.db.transactions().create(&input, &user.id).await?))
}

/// PUT /api/financial/transactions/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TransactionInput>,
) -> ApiResult<Json<LedgerTransaction>> {
    user.require(&state, Module::Financial).await?;
    Ok(Json(state.db.transactions().update(&id, &input, &user.id).await?))
}

/// DELETE /api/financial/transactions/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<bool>> {
    user.require(&state, Module::Financial).await?;
    state.db.transactions().delete(&id, &user.id).await?;
    Ok(Json(true))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: LedgerSummary,
    /// Balance over the whole ledger, regardless of period.
    pub current_balance: Money,
}

/// GET /api/financial/summary
pub async fn summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Json<SummaryResponse>> {
    let range = period_range(&state, query)?;
    let transactions = state.db.transactions();

    Ok(Json(SummaryResponse {
        summary: transactions.summary(&range).await?,
        current_balance: transactions.balance().await?,
    }))
}

/// GET /api/financial/export
pub async fn export(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Response> {
    let filter = query.into_filter(&state)?;
    let rows = state.db.transactions().export_rows(&filter).await?;
    let csv = export_transactions_csv(&rows, state.config.utc_offset)?;

    let entry = NewActivity::new(
        &user.id,
        Module::Financial,
        ActivityAction::Export,
        format!("Exported {} transaction(s) to CSV", rows.len()),
    );
    if let Err(e) = state.db.activity().append(&entry).await {
        error!(error = %e, "Failed to record export");
    }
    info!(username = %user.username, rows = rows.len(), "Ledger exported");

    let today = Utc::now().with_timezone(&state.config.utc_offset);
    let disposition = format!("attachment; filename=\"transaksi-{}.csv\"", today.format("%Y%m%d"));

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
