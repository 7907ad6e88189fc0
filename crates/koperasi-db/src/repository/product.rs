//! # Product Repository
//!
//! Database operations for products and their stock movements.
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Every stock change is one transaction                   │
//! │                                                                         │
//! │  UPDATE products                                                        │
//! │     SET stock = stock + Δ, version = version + 1                        │
//! │   WHERE id = ? AND stock + Δ >= 0        ← never below zero            │
//! │  RETURNING stock                                                        │
//! │       │                                                                 │
//! │       ├── no row ──► NotFound or InsufficientStock, nothing written     │
//! │       ▼                                                                 │
//! │  INSERT stock_movements (type, Δ, before, after)                        │
//! │  INSERT transactions (CASH_OUT / PURCHASE)   ← restock expense, opt-in  │
//! │  INSERT activity_logs                                                   │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `update` never touches `stock`; the only ways stock moves are
//! [`ProductRepository::adjust_stock`], the opening stock of
//! [`ProductRepository::create`] and completed checkouts.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use koperasi_core::input::{CreateProductInput, StockAdjustmentInput, UpdateProductInput};
use koperasi_core::ledger::{TransactionCategory, TransactionType};
use koperasi_core::stock::{apply_movement, MovementType};
use koperasi_core::validation::validate_search_query;
use koperasi_core::{
    ActivityAction, CoreError, LedgerTransaction, Module, NewActivity, Product, StockAdjustment,
    StockMovement,
};

use super::activity::record;
use super::clean;
use super::transaction::{insert_transaction, TransactionRepository};
use crate::error::{DbError, DbResult};

pub(crate) const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id,
        p.sku,
        p.name,
        p.description,
        p.category_id,
        c.name AS category_name,
        p.supplier_id,
        s.name AS supplier_name,
        p.purchase_price,
        p.selling_price,
        p.stock,
        p.min_stock,
        p.unit,
        p.is_active,
        p.version,
        p.created_at,
        p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN suppliers s ON s.id = p.supplier_id
    WHERE 1 = 1
"#;

// =============================================================================
// Filter
// =============================================================================

/// Inventory list filter.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    /// Matches name or SKU, case-insensitive.
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
    /// Only products at or below their threshold.
    pub low_stock_only: bool,
    pub include_inactive: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            search: None,
            category_id: None,
            supplier_id: None,
            low_stock_only: false,
            include_inactive: false,
            limit: 100,
            offset: 0,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.list(&ProductFilter { search: Some("beras".into()), ..Default::default() }).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products matching the filter, ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(?filter, "Listing products");

        let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
        if !filter.include_inactive {
            qb.push(" AND p.is_active = 1");
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", validate_search_query(search).map_err(CoreError::from)?);
            qb.push(" AND (p.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.sku LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category_id) = &filter.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id.clone());
        }
        if let Some(supplier_id) = &filter.supplier_id {
            qb.push(" AND p.supplier_id = ").push_bind(supplier_id.clone());
        }
        if filter.low_stock_only {
            qb.push(" AND p.stock <= p.min_stock");
        }
        qb.push(" ORDER BY p.name COLLATE NOCASE, p.sku LIMIT ")
            .push_bind(filter.limit.clamp(1, 1000))
            .push(" OFFSET ")
            .push_bind(filter.offset.max(0));

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        debug!(count = products.len(), "Products listed");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{} AND p.sku = ?1", PRODUCT_SELECT))
            .bind(sku.trim().to_ascii_uppercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Loads the given products in one query. Unknown ids are skipped.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
        qb.push(" AND p.id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Active products at or below their low-stock threshold, emptiest first.
    pub async fn low_stock(&self, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{} AND p.is_active = 1 AND p.stock <= p.min_stock ORDER BY p.stock, p.name LIMIT ?1",
            PRODUCT_SELECT
        ))
        .bind(limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Creates a product. Opening stock is recorded as an `IN` movement.
    pub async fn create(&self, input: &CreateProductInput, actor_id: &str) -> DbResult<Product> {
        input.validate()?;

        let id = Uuid::new_v4().to_string();
        let sku = input.sku.trim().to_ascii_uppercase();
        let now = Utc::now();

        debug!(sku = %sku, "Creating product");

        let mut tx = self.pool.begin().await?;

        ensure_references(
            &mut tx,
            input.category_id.as_deref(),
            input.supplier_id.as_deref(),
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category_id, supplier_id,
                purchase_price, selling_price, stock, min_stock, unit,
                is_active, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, 0, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(&sku)
        .bind(input.name.trim())
        .bind(clean(input.description.as_deref()))
        .bind(clean(input.category_id.as_deref()))
        .bind(clean(input.supplier_id.as_deref()))
        .bind(input.purchase_price)
        .bind(input.selling_price)
        .bind(input.stock)
        .bind(input.min_stock)
        .bind(input.unit.trim())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&sku))?;

        if input.stock > 0 {
            insert_movement(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: id.clone(),
                    movement_type: MovementType::In,
                    quantity: input.stock,
                    stock_before: 0,
                    stock_after: input.stock,
                    reference: Some("Initial stock".to_string()),
                    notes: None,
                    created_by: actor_id.to_string(),
                    created_at: now,
                },
            )
            .await?;
        }

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                ActivityAction::Create,
                format!("Created product {} '{}' (stock {})", sku, input.name.trim(), input.stock),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(product_id = %id, sku = %sku, "Product created");
        self.require(&id).await
    }

    /// Updates descriptive fields and prices. Stock is left untouched.
    pub async fn update(
        &self,
        id: &str,
        input: &UpdateProductInput,
        actor_id: &str,
    ) -> DbResult<Product> {
        input.validate()?;

        let sku = input.sku.trim().to_ascii_uppercase();
        let mut tx = self.pool.begin().await?;

        ensure_references(
            &mut tx,
            input.category_id.as_deref(),
            input.supplier_id.as_deref(),
        )
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET sku = ?2, name = ?3, description = ?4, category_id = ?5, supplier_id = ?6,
                purchase_price = ?7, selling_price = ?8, min_stock = ?9, unit = ?10,
                is_active = ?11, updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&sku)
        .bind(input.name.trim())
        .bind(clean(input.description.as_deref()))
        .bind(clean(input.category_id.as_deref()))
        .bind(clean(input.supplier_id.as_deref()))
        .bind(input.purchase_price)
        .bind(input.selling_price)
        .bind(input.min_stock)
        .bind(input.unit.trim())
        .bind(input.is_active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&sku))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                ActivityAction::Update,
                format!("Updated product {} '{}'", sku, input.name.trim()),
            ),
        )
        .await?;

        tx.commit().await?;
        self.require(id).await
    }

    /// Soft-deletes (or restores) a product.
    ///
    /// Products are never removed: order items and movements reference them.
    pub async fn set_active(&self, id: &str, is_active: bool, actor_id: &str) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;

        let sku: Option<String> = sqlx::query_scalar(
            "UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1 RETURNING sku",
        )
        .bind(id)
        .bind(is_active)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(sku) = sku else {
            return Err(DbError::not_found("Product", id));
        };

        let (action, verb) = if is_active {
            (ActivityAction::Activate, "Reactivated")
        } else {
            (ActivityAction::Deactivate, "Deactivated")
        };
        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                action,
                format!("{} product {}", verb, sku),
            ),
        )
        .await?;

        tx.commit().await?;
        self.require(id).await
    }

    /// Applies a manual stock movement.
    ///
    /// With `record_expense`, a restock also books a CASH_OUT/PURCHASE
    /// ledger row of `quantity × purchase_price` in the same transaction.
    pub async fn adjust_stock(
        &self,
        id: &str,
        input: &StockAdjustmentInput,
        actor_id: &str,
    ) -> DbResult<StockAdjustment> {
        input.validate()?;
        let delta = input.movement_type.signed_delta(input.quantity).map_err(CoreError::from)?;
        let now = Utc::now();

        debug!(product_id = %id, movement = input.movement_type.as_str(), delta, "Adjusting stock");

        let mut tx = self.pool.begin().await?;

        let stock_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock + ?2, version = version + 1, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            RETURNING stock
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let Some(stock_after) = stock_after else {
            // Refused by the stock guard; report why in domain terms
            apply_movement(&product.sku, product.stock, input.movement_type, input.quantity)?;
            return Err(DbError::TransactionFailed(format!(
                "stock update for {} was not applied",
                product.sku
            )));
        };

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            movement_type: input.movement_type,
            quantity: delta,
            stock_before: stock_after - delta,
            stock_after,
            reference: clean(input.reference.as_deref()),
            notes: clean(input.notes.as_deref()),
            created_by: actor_id.to_string(),
            created_at: now,
        };
        insert_movement(&mut tx, &movement).await?;

        let amount = product.purchase_price.saturating_mul(input.quantity);
        let expense = if input.record_expense && amount > 0 {
            let row = LedgerTransaction {
                id: Uuid::new_v4().to_string(),
                transaction_type: TransactionType::CashOut,
                category: TransactionCategory::Purchase,
                amount,
                description: format!(
                    "Pembelian stok {} {} {}",
                    product.name, input.quantity, product.unit
                ),
                notes: clean(input.notes.as_deref()),
                payment_method: input.payment_method,
                supplier_id: product.supplier_id.clone(),
                supplier_name: product.supplier_name.clone(),
                order_id: None,
                created_by: actor_id.to_string(),
                created_at: now,
                updated_at: now,
            };
            insert_transaction(&mut tx, &row).await?;
            Some(row.id)
        } else {
            None
        };

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Inventory,
                ActivityAction::StockAdjust,
                format!(
                    "Stock {} {:+} for {} ({} → {})",
                    input.movement_type.as_str(),
                    delta,
                    product.sku,
                    movement.stock_before,
                    movement.stock_after
                ),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            sku = %product.sku,
            delta,
            stock = stock_after,
            "Stock adjusted"
        );

        let expense = match expense {
            Some(expense_id) => TransactionRepository::new(self.pool.clone())
                .get_by_id(&expense_id)
                .await?,
            None => None,
        };

        Ok(StockAdjustment {
            product: self.require(id).await?,
            movement,
            expense,
        })
    }

    /// Movement history of a product, oldest first.
    pub async fn movements(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, type, quantity, stock_before, stock_after,
                   reference, notes, created_by, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }
}

// =============================================================================
// Shared write helpers
// =============================================================================

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{} AND p.id = ?1", PRODUCT_SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, type, quantity, stock_before, stock_after,
            reference, notes, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.stock_before)
    .bind(movement.stock_after)
    .bind(&movement.reference)
    .bind(&movement.notes)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Fails with `NotFound` when a referenced category or supplier is missing.
async fn ensure_references(
    conn: &mut SqliteConnection,
    category_id: Option<&str>,
    supplier_id: Option<&str>,
) -> DbResult<()> {
    if let Some(category_id) = category_id.filter(|v| !v.trim().is_empty()) {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?1")
            .bind(category_id.trim())
            .fetch_one(&mut *conn)
            .await?;
        if exists == 0 {
            return Err(DbError::not_found("Category", category_id));
        }
    }
    if let Some(supplier_id) = supplier_id.filter(|v| !v.trim().is_empty()) {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers WHERE id = ?1")
            .bind(supplier_id.trim())
            .fetch_one(&mut *conn)
            .await?;
        if exists == 0 {
            return Err(DbError::not_found("Supplier", supplier_id));
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
