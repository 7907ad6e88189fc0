//! # Inventory Routes
//!
//! Categories, products and stock movements.
//!
//! ```text
//! GET    /categories                 list (with product counts)
//! POST   /categories                 create
//! GET    /categories/{id}
//! PUT    /categories/{id}
//! DELETE /categories/{id}            refused while products use it
//!
//! GET    /products                   search / filter
//! GET    /products/low-stock
//! POST   /products                   create (opening stock → IN movement)
//! GET    /products/{id}
//! PUT    /products/{id}              edit, stock untouched
//! PUT    /products/{id}/active       activate / deactivate
//! POST   /products/{id}/stock        IN / OUT / ADJUSTMENT
//! GET    /products/{id}/movements    stock history
//! ```

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use koperasi_core::input::{
    CategoryInput, CreateProductInput, SetActiveInput, StockAdjustmentInput, UpdateProductInput,
};
use koperasi_core::{Category, Module, Product, StockAdjustment, StockMovement};
use koperasi_db::ProductFilter;

use super::gated;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/products", get(list_products).post(create_product))
        .route("/products/low-stock", get(low_stock))
        .route("/products/{id}", get(get_product).put(update_product))
        .route("/products/{id}/active", put(set_product_active))
        .route("/products/{id}/stock", post(adjust_stock))
        .route("/products/{id}/movements", get(movements));
    gated(routes, state, Module::Inventory)
}

// =============================================================================
// Categories
// =============================================================================

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list().await?))
}

/// GET /api/categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    let category = state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", &id))?;
    Ok(Json(category))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<Json<Category>> {
    user.require(&state, Module::Inventory).await?;
    Ok(Json(state.db.categories().create(&input, &user.id).await?))
}

/// PUT /api/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<Json<Category>> {
    user.require(&state, Module::Inventory).await?;
    Ok(Json(state.db.categories().update(&id, &input, &user.id).await?))
}

/// DELETE /api/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<bool>> {
    user.require(&state, Module::Inventory).await?;
    state.db.categories().delete(&id, &user.id).await?;
    Ok(Json(true))
}

// =============================================================================
// Products
// =============================================================================

/// Product list query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        let defaults = ProductFilter::default();
        ProductFilter {
            search: query.search,
            category_id: query.category_id,
            supplier_id: query.supplier_id,
            low_stock_only: query.low_stock,
            include_inactive: query.include_inactive,
            limit: query.limit.unwrap_or(defaults.limit),
            offset: query.offset.unwrap_or(defaults.offset),
        }
    }
}

/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let filter = ProductFilter::from(query);
    Ok(Json(state.db.products().list(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// GET /api/products/low-stock
pub async fn low_stock(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().low_stock(query.limit.unwrap_or(50)).await?))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(Json(product))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateProductInput>,
) -> ApiResult<Json<Product>> {
    user.require(&state, Module::Inventory).await?;
    Ok(Json(state.db.products().create(&input, &user.id).await?))
}

/// PUT /api/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateProductInput>,
) -> ApiResult<Json<Product>> {
    user.require(&state, Module::Inventory).await?;
    Ok(Json(state.db.products().update(&id, &input, &user.id).await?))
}

/// PUT /api/products/{id}/active
pub async fn set_product_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SetActiveInput>,
) -> ApiResult<Json<Product>> {
    user.require(&state, Module::Inventory).await?;
    Ok(Json(state.db.products().set_active(&id, input.is_active, &user.id).await?))
}

/// POST /api/products/{id}/stock
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<StockAdjustmentInput>,
) -> ApiResult<Json<StockAdjustment>> {
    user.require(&state, Module::Inventory).await?;
    Ok(Json(state.db.products().adjust_stock(&id, &input, &user.id).await?))
}

/// GET /api/products/{id}/movements
pub async fn movements(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    if state.db.products().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Product", &id));
    }
    Ok(Json(state.db.products().movements(&id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::testing::{call, login, product_id, test_app};

    #[tokio::test]
    async fn test_product_lifecycle() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let (status, categories) =
            call(&app, Method::GET, "/api/categories", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        let category_id = categories[0]["id"].as_str().unwrap().to_string();

        let (status, created) = call(
            &app,
            Method::POST,
            "/api/products",
            Some(&cookie),
            Some(json!({
                "sku": "kcp-asn",
                "name": "Kecap Asin",
                "categoryId": category_id,
                "purchasePrice": 8000,
                "sellingPrice": 10000,
                "stock": 12,
                "minStock": 3,
                "unit": "botol"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["sku"], "KCP-ASN");
        assert_eq!(created["stock"], 12);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, adjusted) = call(
            &app,
            Method::POST,
            &format!("/api/products/{}/stock", id),
            Some(&cookie),
            Some(json!({ "type": "IN", "quantity": 6, "recordExpense": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(adjusted["product"]["stock"], 18);
        assert_eq!(adjusted["expense"]["amount"], 48_000);

        let (status, movements) = call(
            &app,
            Method::GET,
            &format!("/api/products/{}/movements", id),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(movements.as_array().unwrap().len(), 2);

        let (status, body) = call(
            &app,
            Method::DELETE,
            &format!("/api/categories/{}", category_id),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "REFERENTIAL_INTEGRITY");
    }

    #[tokio::test]
    async fn test_stock_cannot_go_negative() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;
        let id = product_id(&app, &cookie, "TEH-KTK").await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/products/{}/stock", id),
            Some(&cookie),
            Some(json!({ "type": "OUT", "quantity": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");

        let (status, low) =
            call(&app, Method::GET, "/api/products/low-stock", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(low.as_array().unwrap().iter().any(|p| p["sku"] == "TEH-KTK"));
    }

    #[tokio::test]
    async fn test_invalid_product_lists_every_field() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "admin").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/products",
            Some(&cookie),
            Some(json!({ "sku": "", "name": "", "purchasePrice": -1, "sellingPrice": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"sku"));
        assert!(fields.contains(&"purchasePrice"));

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/products",
            Some(&cookie),
            Some(json!({ "sku": 12 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_kasir_is_kept_out_of_inventory() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "kasir").await;
        let before = state.db.activity().count().await.unwrap();

        let (status, body) = call(&app, Method::GET, "/api/products", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(state.db.activity().count().await.unwrap(), before + 1);
    }
}
