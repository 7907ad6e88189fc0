//! Supplier directory.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use koperasi_core::input::SupplierInput;
use koperasi_core::{Module, Supplier};

use super::gated;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/suppliers", get(list).post(create))
        .route("/suppliers/{id}", get(get_by_id).put(update).delete(delete));
    gated(routes, state, Module::Suppliers)
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierQuery {
    pub search: Option<String>,
}

/// GET /api/suppliers
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SupplierQuery>,
) -> ApiResult<Json<Vec<Supplier>>> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(state.db.suppliers().list(search).await?))
}

/// GET /api/suppliers/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Supplier>> {
    let supplier = state
        .db
        .suppliers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", &id))?;
    Ok(Json(supplier))
}

/// POST /api/suppliers
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    user.require(&state, Module::Suppliers).await?;
    Ok(Json(state.db.suppliers().create(&input, &user.id).await?))
}

/// PUT /api/suppliers/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    user.require(&state, Module::Suppliers).await?;
    Ok(Json(state.db.suppliers().update(&id, &input, &user.id).await?))
}

/// DELETE /api/suppliers/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<bool>> {
    user.require(&state, Module::Suppliers).await?;
    state.db.suppliers().delete(&id, &user.id).await?;
    Ok(Json(true))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testing::{call, login, test_app};

    #[tokio::test]
    async fn test_create_search_and_delete_supplier() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let (status, created) = call(
            &app,
            Method::POST,
            "/api/suppliers",
            Some(&cookie),
            Some(json!({ "name": "PT Segar Abadi", "phone": "0821-5555-6666" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["productCount"], 0);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, found) =
            call(&app, Method::GET, "/api/suppliers?search=segar", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/api/suppliers/{}", id),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/suppliers/{}", id),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_supplier_with_products_cannot_be_deleted() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let (_, suppliers) = call(&app, Method::GET, "/api/suppliers", Some(&cookie), None).await;
        let supplier = suppliers
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["productCount"].as_i64().unwrap_or(0) > 0)
            .unwrap()
            .clone();

        let (status, body) = call(
            &app,
            Method::DELETE,
            &format!("/api/suppliers/{}", supplier["id"].as_str().unwrap()),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "REFERENTIAL_INTEGRITY");
    }

    #[tokio::test]
    async fn test_kasir_cannot_open_suppliers() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "kasir").await;

        let (status, _) = call(&app, Method::GET, "/api/suppliers", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
