//! Login, logout and the current session.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use koperasi_core::input::LoginInput;
use koperasi_core::{Module, User};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// Public profile plus what the UI may show.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub modules: Vec<Module>,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Response> {
    input.validate()?;

    let user = state
        .db
        .users()
        .authenticate(input.username.trim(), &input.password)
        .await?;
    let (token, claims) = state.sessions.issue(&user)?;

    let body = SessionResponse {
        modules: user.role.modules().to_vec(),
        expires_at: claims.expires_at,
        user,
    };
    Ok(([(SET_COOKIE, state.sessions.cookie(&token))], Json(body)).into_response())
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Response> {
    state.db.users().record_logout(&user.id, &user.username).await?;
    info!(username = %user.username, "Logged out");

    Ok((
        [(SET_COOKIE, state.sessions.clear_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<SessionResponse>> {
    let account = state
        .db
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Invalid session"))?;

    Ok(Json(SessionResponse {
        modules: account.role.modules().to_vec(),
        expires_at: user.expires_at,
        user: account,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::header::SET_COOKIE;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testing::{call, login, send, test_app};

    #[tokio::test]
    async fn test_login_sets_http_only_cookie() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "kasir", "password": "password123" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("koperasi_session="));
        assert!(cookie.contains("HttpOnly"));

        let cookie = login(&app, "kasir").await;
        let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "kasir");
        assert_eq!(body["user"]["role"], "KASIR");
        assert!(body["user"].get("passwordHash").is_none());
        assert_eq!(body["modules"], json!(["dashboard", "pos"]));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let (app, state) = test_app().await;

        let (wrong_status, wrong) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "kasir", "password": "nope-nope" })),
        )
        .await;
        let (unknown_status, unknown) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ghost", "password": "nope-nope" })),
        )
        .await;

        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_status, unknown_status);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong["code"], "INVALID_CREDENTIALS");
        assert!(state.db.activity().count().await.unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_session() {
        let (app, _) = test_app().await;

        let (status, body) = call(&app, Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = call(
            &app,
            Method::GET,
            "/api/auth/me",
            Some("koperasi_session=not-a-token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_account_loses_its_session() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "kasir").await;

        let admin = state.db.users().get_by_username("superadmin").await.unwrap().unwrap();
        let kasir = state.db.users().get_by_username("kasir").await.unwrap().unwrap();
        state.db.users().set_active(&kasir.id, false, &admin.id).await.unwrap();

        let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_DEACTIVATED");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "kasir", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_DEACTIVATED");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let response = send(&app, Method::POST, "/api/auth/logout", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
    }
}
