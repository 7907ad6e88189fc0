//! Member savings. Deposits and withdrawals are ledger rows whose
//! description names the member (`Simpanan - <name>`, `Penarikan - <name>`).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use koperasi_core::input::MemberMovementInput;
use koperasi_core::ledger::MemberBalance;
use koperasi_core::{LedgerTransaction, Module, ValidationError};

use super::gated;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/members", get(balances))
        .route("/members/history", get(history))
        .route("/members/deposit", post(deposit))
        .route("/members/withdraw", post(withdraw));
    gated(routes, state, Module::Members)
}

/// GET /api/members
pub async fn balances(State(state): State<AppState>) -> ApiResult<Json<Vec<MemberBalance>>> {
    Ok(Json(state.db.members().balances().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub name: Option<String>,
}

/// GET /api/members/history?name=
pub async fn history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<Vec<LedgerTransaction>>> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ValidationError::Required {
            field: "name".to_string(),
        })?;
    Ok(Json(state.db.members().history(name).await?))
}

/// POST /api/members/deposit
pub async fn deposit(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<MemberMovementInput>,
) -> ApiResult<Json<LedgerTransaction>> {
    user.require(&state, Module::Members).await?;
    Ok(Json(state.db.members().deposit(&input, &user.id).await?))
}

/// POST /api/members/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<MemberMovementInput>,
) -> ApiResult<Json<LedgerTransaction>> {
    user.require(&state, Module::Members).await?;
    Ok(Json(state.db.members().withdraw(&input, &user.id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testing::{call, login, test_app};

    #[tokio::test]
    async fn test_savings_follow_deposits_and_withdrawals() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let (status, row) = call(
            &app,
            Method::POST,
            "/api/members/deposit",
            Some(&cookie),
            Some(json!({ "memberName": "Budi Santoso", "amount": 250_000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(row["description"], "Simpanan - Budi Santoso");
        assert_eq!(row["category"], "MEMBER_DEPOSIT");

        let (status, balances) = call(&app, Method::GET, "/api/members", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        let siti = balances
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["memberName"] == "Siti Aminah")
            .unwrap();
        assert_eq!(siti["balance"], 400_000);

        let (status, history) = call(
            &app,
            Method::GET,
            "/api/members/history?name=Siti%20Aminah",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_withdrawal_past_savings_is_refused() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin").await;
        let before = state.db.transactions().balance().await.unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/members/withdraw",
            Some(&cookie),
            Some(json!({ "memberName": "Siti Aminah", "amount": 400_001 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INSUFFICIENT_MEMBER_BALANCE");
        assert_eq!(state.db.transactions().balance().await.unwrap(), before);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/members/withdraw",
            Some(&cookie),
            Some(json!({ "memberName": "Siti Aminah", "amount": 400_000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_history_needs_a_name() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let (status, body) =
            call(&app, Method::GET, "/api/members/history", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "name");
    }
}
