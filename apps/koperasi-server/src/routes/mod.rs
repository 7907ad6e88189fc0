//! # HTTP Routes
//!
//! One module per domain, each returning a `Router<AppState>` with its module
//! gate already applied. `build_router` merges them under `/api` and adds the
//! session layer to everything except login and health.
//!
//! ```text
//! /api
//! ├── /health                         public
//! ├── /auth/login                     public
//! ├── /auth/{logout,me}               session
//! ├── /users/...                      session + Users
//! ├── /categories, /products/...      session + Inventory
//! ├── /suppliers/...                  session + Suppliers
//! ├── /pos/...                        session + Pos
//! ├── /financial/...                  session + Financial
//! ├── /members/...                    session + Members
//! ├── /activity                       session + Activity
//! ├── /reports/dashboard              session + Dashboard
//! └── /reports/{chart,top-products,sales}  session + Reports
//! ```

pub mod activity;
pub mod auth;
pub mod financial;
pub mod health;
pub mod inventory;
pub mod members;
pub mod pos;
pub mod reports;
pub mod suppliers;
pub mod users;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use koperasi_core::period::{DateRange, PeriodFilter, PeriodQuery};
use koperasi_core::Module;

use crate::auth::{require_auth, require_module};
use crate::error::ApiResult;
use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::session_routes())
        .merge(users::router(&state))
        .merge(inventory::router(&state))
        .merge(suppliers::router(&state))
        .merge(pos::router(&state))
        .merge(financial::router(&state))
        .merge(members::router(&state))
        .merge(activity::router(&state))
        .merge(reports::router(&state))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .merge(auth::public_routes())
        .merge(health::router());

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Applies the role gate of `module` to every route of `router`.
pub(crate) fn gated(
    router: Router<AppState>,
    state: &AppState,
    module: Module,
) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        (state.clone(), module),
        require_module,
    ))
}

/// Period query parameters resolved against the store clock.
pub(crate) fn period_range(state: &AppState, query: PeriodQuery) -> ApiResult<DateRange> {
    let filter = PeriodFilter::try_from(query)?;
    state.resolve(filter)
}

/// Like [`period_range`], with `fallback` when no period was given.
pub(crate) fn period_range_or(
    state: &AppState,
    query: PeriodQuery,
    fallback: PeriodFilter,
) -> ApiResult<DateRange> {
    if query.period.is_none() {
        return state.resolve(fallback);
    }
    period_range(state, query)
}

// =============================================================================
// Test Helpers
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use koperasi_db::seed::DEMO_PASSWORD;
    use koperasi_db::{seed_demo_data, Database, DbConfig};

    use super::build_router;
    use crate::config::ServerConfig;
    use crate::state::AppState;

    /// Router over a seeded in-memory database.
    pub async fn test_app() -> (Router, AppState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        let state = AppState::new(db, ServerConfig::default());
        (build_router(state.clone()), state)
    }

    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    /// Sends a request and decodes the JSON answer (`Null` when empty).
    pub async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = send(app, method, uri, cookie, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Logs in a demo account and returns its `Cookie` header value.
    pub async fn login(app: &Router, username: &str) -> String {
        let response = send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": DEMO_PASSWORD })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Id of a seeded product, looked up through the POS search.
    pub async fn product_id(app: &Router, cookie: &str, sku: &str) -> String {
        let (status, body) = call(
            app,
            Method::GET,
            &format!("/api/pos/products?search={}", sku),
            Some(cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .unwrap()
            .iter()
            .find(|p| p["sku"] == sku)
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}
