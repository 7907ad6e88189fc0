//! # POS Routes
//!
//! The cart lives with the client; the server prices it on request and
//! persists it only when payment is confirmed.
//!
//! ```text
//! GET  /pos/products        product picker (active only)
//! POST /pos/quote           live totals, no side effects
//! POST /pos/checkout        validate → price → pay → one atomic write
//! GET  /pos/orders          order history for a period
//! GET  /pos/orders/{id}     receipt
//! ```
//!
//! ## Checkout
//! ```text
//! CheckoutInput ──► CheckoutSession (DRAFT)
//!                       │ begin_payment
//!                       ▼
//!                 PENDING_PAYMENT ──confirm(products)──► CheckoutPlan
//!                       │                                   │
//!                       │◄──── 409 / 422, nothing written ───┤
//!                       ▼                                   ▼
//!                   COMPLETED ◄──────────── orders().complete_checkout
//! ```

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use koperasi_core::cart::CartTotals;
use koperasi_core::checkout::PlannedLine;
use koperasi_core::input::{CheckoutInput, QuoteInput};
use koperasi_core::period::PeriodQuery;
use koperasi_core::{Module, Order, Product, Receipt};
use koperasi_db::ProductFilter;

use super::{gated, period_range};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/pos/products", get(products))
        .route("/pos/quote", post(quote))
        .route("/pos/checkout", post(checkout))
        .route("/pos/orders", get(orders))
        .route("/pos/orders/{id}", get(receipt));
    gated(routes, state, Module::Pos)
}

#[derive(Debug, Default, Deserialize)]
pub struct PickerQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/pos/products
pub async fn products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PickerQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let filter = ProductFilter {
        search: query.search,
        limit: query.limit.unwrap_or(50),
        ..ProductFilter::default()
    };
    Ok(Json(state.db.products().list(&filter).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub lines: Vec<PlannedLine>,
    pub totals: CartTotals,
}

/// POST /api/pos/quote
pub async fn quote(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<QuoteInput>,
) -> ApiResult<Json<QuoteResponse>> {
    input.validate()?;

    let session = input.into_session(state.config.default_tax);
    let products = state.db.products().get_many(&session.product_ids()).await?;
    let (lines, totals) = session.quote(&products)?;

    Ok(Json(QuoteResponse { lines, totals }))
}

/// POST /api/pos/checkout
pub async fn checkout(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CheckoutInput>,
) -> ApiResult<Json<Receipt>> {
    user.require(&state, Module::Pos).await?;
    input.validate()?;

    let (mut session, payment) = input.into_session(state.config.default_tax);
    session.begin_payment()?;

    let products = state.db.products().get_many(&session.product_ids()).await?;
    let plan = session.confirm(payment, &products).map_err(|e| {
        warn!(cashier = %user.username, error = %e, "Checkout refused");
        e
    })?;

    let receipt = state.db.orders().complete_checkout(&plan, &user.id).await?;
    session.complete(receipt.order.id.clone())?;

    info!(
        order_number = %receipt.order.order_number,
        cashier = %user.username,
        total = receipt.order.total,
        "Sale completed"
    );
    Ok(Json(receipt))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<i64>,
}

/// GET /api/pos/orders
pub async fn orders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let period = PeriodQuery {
        period: query.period,
        start: query.start,
        end: query.end,
    };
    let range = period_range(&state, period)?;
    Ok(Json(state.db.orders().list(&range, query.limit.unwrap_or(100)).await?))
}

/// GET /api/pos/orders/{id}
pub async fn receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Receipt>> {
    let receipt = state
        .db
        .orders()
        .receipt(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &id))?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};

    use crate::routes::testing::{call, login, product_id, test_app};

    async fn new_product(app: &Router, cookie: &str, sku: &str, price: i64, stock: i64) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/products",
            Some(cookie),
            Some(json!({
                "sku": sku,
                "name": format!("Produk {}", sku),
                "purchasePrice": price / 2,
                "sellingPrice": price,
                "stock": stock
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["id"].as_str().unwrap().to_string()
    }

    async fn checkout(
        app: &Router,
        cookie: &str,
        items: Value,
        payment: i64) -> (StatusCode, Value,
    ) {
        call(
            app,
            Method::POST,
            "/api/pos/checkout",
            Some(cookie),
            Some(json!({ "items": items, "paymentAmount": payment, "paymentMethod": "CASH" })),
        )
        .await
    }

    #[tokio::test]
    async fn test_checkout_prices_pays_and_books_the_sale() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin").await;
        let a = new_product(&app, &cookie, "TST-A", 10_000, 5).await;
        let b = new_product(&app, &cookie, "TST-B", 15_000, 5).await;
        let items = json!([
            { "productId": a, "quantity": 2 },
            { "productId": b, "quantity": 3 }
        ]);

        let (status, quote) = call(
            &app,
            Method::POST,
            "/api/pos/quote",
            Some(&cookie),
            Some(json!({ "items": items })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["totals"]["total"], 65_000);

        let (status, body) = checkout(&app, &cookie, items.clone(), 60_000).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INSUFFICIENT_PAYMENT");

        let (status, receipt) = checkout(&app, &cookie, items, 70_000).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["order"]["total"], 65_000);
        assert_eq!(receipt["order"]["changeAmount"], 5_000);
        assert!(receipt["order"]["orderNumber"].as_str().unwrap().starts_with("INV-"));
        assert_eq!(receipt["items"].as_array().unwrap().len(), 2);

        let product = state.db.products().get_by_id(&a).await.unwrap().unwrap();
        assert_eq!(product.stock, 3);

        let order_id = receipt["order"]["id"].as_str().unwrap();
        let (status, again) = call(
            &app,
            Method::GET,
            &format!("/api/pos/orders/{}", order_id),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["order"]["orderNumber"], receipt["order"]["orderNumber"]);

        let (status, ledger) = call(
            &app,
            Method::GET,
            "/api/financial/transactions?category=SALES",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sale = ledger
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["orderId"] == order_id)
            .unwrap();
        assert_eq!(sale["amount"], 65_000);
        assert_eq!(sale["type"], "CASH_IN");
    }

    #[tokio::test]
    async fn test_sold_out_product_is_refused() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "kasir").await;
        let admin = login(&app, "admin").await;
        let id = new_product(&app, &admin, "TST-C", 5_000, 5).await;

        let (status, _) =
            checkout(&app, &cookie, json!([{ "productId": id, "quantity": 5 }]), 25_000).await;
        assert_eq!(status, StatusCode::OK);

        let before = state.db.transactions().balance().await.unwrap();
        let (status, body) =
            checkout(&app, &cookie, json!([{ "productId": id, "quantity": 1 }]), 5_000).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");
        assert_eq!(state.db.transactions().balance().await.unwrap(), before);

        let product = state.db.products().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(product.stock, 0);
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_cart() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "kasir").await;
        let id = product_id(&app, &cookie, "BRS-5KG").await;

        let (status, body) = checkout(&app, &cookie, json!([]), 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) =
            checkout(&app, &cookie, json!([{ "productId": id, "quantity": 0 }]), 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "items[0].quantity");
    }

    #[tokio::test]
    async fn test_order_history_lists_todays_sale() {
        let (app, _) = test_app().await;
        let cookie = login(&app, "kasir").await;
        let id = product_id(&app, &cookie, "BRS-5KG").await;

        let (status, _) =
            checkout(&app, &cookie, json!([{ "productId": id, "quantity": 1 }]), 100_000).await;
        assert_eq!(status, StatusCode::OK);

        let (status, orders) =
            call(&app, Method::GET, "/api/pos/orders?period=today", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(orders.as_array().unwrap().len(), 1);
        assert_eq!(orders[0]["total"], 68_000);
    }
}
