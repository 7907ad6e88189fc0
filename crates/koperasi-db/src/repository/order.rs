//! # Order Repository
//!
//! Persists completed checkouts and reads receipts back.
//!
//! ## Checkout Write Group
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                complete_checkout(plan): one transaction                 │
//! │                                                                         │
//! │  1. INSERT orders                     INV-YYYYMMDD-XXXXXX               │
//! │  2. for each line:                                                      │
//! │     ├── UPDATE products SET stock = stock - qty, version = version + 1  │
//! │     │    WHERE id = ? AND version = ? AND stock >= ?    ← CAS           │
//! │     │        └── 0 rows ──► InsufficientStock / OrderCreationFailed     │
//! │     ├── INSERT order_items          (sku, name, price snapshot)         │
//! │     └── INSERT stock_movements      (OUT, reference = order id)         │
//! │  3. INSERT transactions              CASH_IN / SALES, order_id set      │
//! │  4. INSERT activity_logs                                                │
//! │  5. COMMIT                            any failure ──► full ROLLBACK     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan carries the product version seen during validation. A checkout
//! that lost a race to another one finds the version moved and fails
//! instead of writing negative stock.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use koperasi_core::checkout::{order_number, CheckoutPlan, PlannedLine};
use koperasi_core::ledger::{TransactionCategory, TransactionType};
use koperasi_core::period::DateRange;
use koperasi_core::stock::MovementType;
use koperasi_core::{
    ActivityAction, CoreError, LedgerTransaction, Module, NewActivity, Order, OrderItem,
    OrderStatus, Receipt, StockMovement,
};

use super::activity::record;
use super::product::insert_movement;
use super::push_range;
use super::transaction::insert_transaction;
use crate::error::{DbError, DbResult};

const ORDER_SELECT: &str = r#"
    SELECT
        o.id,
        o.order_number,
        o.user_id,
        o.subtotal,
        o.discount,
        o.tax,
        o.total,
        o.payment_amount,
        o.change_amount,
        o.payment_method,
        o.status,
        o.notes,
        o.created_at
    FROM orders o
    WHERE 1 = 1
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a confirmed checkout plan and returns its receipt.
    ///
    /// One transaction writes the order and its lines, decrements stock with
    /// an OUT movement per line, books the CASH_IN / SALES ledger row and
    /// appends the activity row.
    ///
    /// An order whose total is zero (fully discounted) gets no ledger row:
    /// ledger amounts are strictly positive, and such an order moves no cash.
    /// The receipt and stock movements are still written.
    ///
    /// ## Errors
    /// * `InsufficientStock` - a line's stock fell below its quantity
    /// * `OrderCreationFailed` - anything else; nothing was written
    pub async fn complete_checkout(
        &self,
        plan: &CheckoutPlan,
        cashier_id: &str,
    ) -> DbResult<Receipt> {
        if plan.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(order_id = %order_id, lines = plan.lines.len(), "Completing checkout");

        let order = match self.write_order(&order_id, plan, cashier_id, now).await {
            Ok(order) => order,
            Err(DbError::Rule(rule)) => {
                warn!(order_id = %order_id, error = %rule, "Checkout refused");
                return Err(DbError::Rule(rule));
            }
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Checkout write group failed");
                let reason = "the order could not be saved, please retry";
                return Err(CoreError::order_failed(reason).into());
            }
        };

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = order.total,
            "Order completed"
        );

        self.receipt(&order.id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", &order.id))
    }

    async fn write_order(
        &self,
        order_id: &str,
        plan: &CheckoutPlan,
        cashier_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Order> {
        let totals = &plan.totals;
        let order = Order {
            id: order_id.to_string(),
            order_number: order_number(now, order_id),
            user_id: cashier_id.to_string(),
            subtotal: totals.subtotal.rupiah(),
            discount: totals.discount.rupiah(),
            tax: totals.tax.rupiah(),
            total: totals.total.rupiah(),
            payment_amount: plan.payment_amount.rupiah(),
            change_amount: plan.change.rupiah(),
            payment_method: plan.payment_method,
            status: OrderStatus::Completed,
            notes: plan.notes.clone(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, subtotal, discount, tax, total,
                payment_amount, change_amount, payment_method, status, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.tax)
        .bind(order.total)
        .bind(order.payment_amount)
        .bind(order.change_amount)
        .bind(order.payment_method)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for line in &plan.lines {
            let stock_after = decrement_stock(&mut tx, line, now).await?;

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, sku_snapshot, name_snapshot,
                    quantity, unit_price, subtotal
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order.id)
            .bind(&line.product_id)
            .bind(&line.sku)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price.rupiah())
            .bind(line.subtotal.rupiah())
            .execute(&mut *tx)
            .await?;

            insert_movement(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: line.product_id.clone(),
                    movement_type: MovementType::Out,
                    quantity: -line.quantity,
                    stock_before: stock_after + line.quantity,
                    stock_after,
                    reference: Some(order.id.clone()),
                    notes: Some(format!("Penjualan {}", order.order_number)),
                    created_by: cashier_id.to_string(),
                    created_at: now,
                },
            )
            .await?;
        }

        // A fully discounted order moves no cash
        if order.total > 0 {
            insert_transaction(
                &mut tx,
                &LedgerTransaction {
                    id: Uuid::new_v4().to_string(),
                    transaction_type: TransactionType::CashIn,
                    category: TransactionCategory::Sales,
                    amount: order.total,
                    description: format!("Penjualan {}", order.order_number),
                    notes: order.notes.clone(),
                    payment_method: Some(order.payment_method),
                    supplier_id: None,
                    supplier_name: None,
                    order_id: Some(order.id.clone()),
                    created_by: cashier_id.to_string(),
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;
        }

        record(
            &mut tx,
            &NewActivity::new(
                cashier_id,
                Module::Pos,
                ActivityAction::Checkout,
                format!(
                    "Order {} completed: {} item(s), total {}, paid {} by {}",
                    order.order_number,
                    plan.totals.total_quantity,
                    plan.totals.total,
                    plan.payment_amount,
                    order.payment_method.as_str()
                ),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!("{} AND o.id = ?1", ORDER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Lines of an order, in checkout order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, sku_snapshot, name_snapshot,
                   quantity, unit_price, subtotal
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// An order with its lines and the cashier's name.
    pub async fn receipt(&self, id: &str) -> DbResult<Option<Receipt>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let cashier_name: Option<String> =
            sqlx::query_scalar("SELECT full_name FROM users WHERE id = ?1")
                .bind(&order.user_id)
                .fetch_optional(&self.pool)
                .await?;
        let items = self.items(&order.id).await?;

        Ok(Some(Receipt {
            order,
            items,
            cashier_name: cashier_name.unwrap_or_default(),
        }))
    }

    /// Orders in a period, newest first.
    pub async fn list(&self, range: &DateRange, limit: i64) -> DbResult<Vec<Order>> {
        let mut qb = QueryBuilder::<Sqlite>::new(ORDER_SELECT);
        push_range(&mut qb, "o.created_at", range);
        qb.push(" ORDER BY o.created_at DESC, o.rowid DESC LIMIT ")
            .push_bind(limit.clamp(1, 1000));

        let orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;
        Ok(orders)
    }
}

/// Compare-and-swap decrement of one planned line. Returns the new stock.
async fn decrement_stock(
    conn: &mut SqliteConnection,
    line: &PlannedLine,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let stock_after: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock - ?2, version = version + 1, updated_at = ?4
        WHERE id = ?1 AND version = ?3 AND stock >= ?2 AND is_active = 1
        RETURNING stock
        "#,
    )
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.expected_version)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock_after) = stock_after {
        return Ok(stock_after);
    }

    let current: Option<(i64, bool)> =
        sqlx::query_as("SELECT stock, is_active FROM products WHERE id = ?1")
            .bind(&line.product_id)
            .fetch_optional(&mut *conn)
            .await?;

    let err = match current {
        None => CoreError::order_failed(format!("product {} no longer exists", line.sku)),
        Some((_, false)) => {
            CoreError::order_failed(format!("product {} is no longer sold", line.sku))
        }
        Some((stock, true)) if stock < line.quantity => CoreError::InsufficientStock {
            sku: line.sku.clone(),
            available: stock,
            requested: line.quantity,
        },
        Some(_) => CoreError::order_failed(format!(
            "product {} changed during checkout, please retry",
            line.sku
        )),
    };
    Err(err.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::sample_product;
    use crate::repository::testing::{test_db, test_user};
    use crate::repository::transaction::TransactionFilter;
    use crate::Database;
    use koperasi_core::checkout::{CheckoutItem, CheckoutSession};
    use koperasi_core::stock::{history_is_consistent, MovementType as Mt};
    use koperasi_core::{Money, PaymentMethod, Product, Role, TaxRate, User};

    async fn setup(db: &Database) -> (User, Product, Product) {
        let cashier = test_user(db, "kasir1", Role::Kasir).await;
        let admin = test_user(db, "admin1", Role::Admin).await;

        let mut a = sample_product("BRS-5KG", 10);
        a.selling_price = 10_000;
        let mut b = sample_product("GULA-1KG", 10);
        b.selling_price = 15_000;
        let a = db.products().create(&a, &admin.id).await.unwrap();
        let b = db.products().create(&b, &admin.id).await.unwrap();
        (cashier, a, b)
    }

    async fn plan_for(db: &Database, items: Vec<(&str, i64)>, payment: i64) -> CheckoutPlan {
        let items = items
            .into_iter()
            .map(|(id, quantity)| CheckoutItem {
                product_id: id.to_string(),
                quantity,
            })
            .collect();
        let mut session = CheckoutSession::new(
            items,
            Money::zero(),
            None,
            TaxRate::zero(),
            PaymentMethod::Cash,
            None,
        );
        let products = db.products().get_many(&session.product_ids()).await.unwrap();
        session.begin_payment().unwrap();
        session.confirm(Money::from_rupiah(payment), &products).unwrap()
    }

    #[tokio::test]
    async fn test_checkout_writes_whole_group() {
        let db = test_db().await;
        let (cashier, a, b) = setup(&db).await;

        let plan = plan_for(&db, vec![(&a.id, 2), (&b.id, 3)], 70_000).await;
        let receipt = db.orders().complete_checkout(&plan, &cashier.id).await.unwrap();

        assert_eq!(receipt.order.total, 65_000);
        assert_eq!(receipt.order.change_amount, 5_000);
        assert!(receipt.order.is_consistent());
        assert!(receipt.order.order_number.starts_with("INV-"));
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.cashier_name, "User kasir1");

        let a_after = db.products().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 8);
        assert_eq!(a_after.version, a.version + 1);

        let movements = db.products().movements(&b.id).await.unwrap();
        let last = movements.last().unwrap();
        assert_eq!(last.movement_type, Mt::Out);
        assert_eq!(last.quantity, -3);
        assert_eq!(last.reference.as_deref(), Some(receipt.order.id.as_str()));
        assert!(history_is_consistent(&movements));

        let sales = db
            .transactions()
            .list(&TransactionFilter {
                category: Some(TransactionCategory::Sales),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].amount, 65_000);
        assert_eq!(sales[0].order_id.as_deref(), Some(receipt.order.id.as_str()));
    }

    #[tokio::test]
    async fn test_fully_discounted_order_books_no_cash() {
        let db = test_db().await;
        let (cashier, a, _) = setup(&db).await;

        let mut session = CheckoutSession::new(
            vec![CheckoutItem {
                product_id: a.id.clone(),
                quantity: 1,
            }],
            Money::from_rupiah(10_000),
            None,
            TaxRate::zero(),
            PaymentMethod::Cash,
            None,
        );
        let products = db.products().get_many(&session.product_ids()).await.unwrap();
        session.begin_payment().unwrap();
        let plan = session.confirm(Money::zero(), &products).unwrap();

        let receipt = db.orders().complete_checkout(&plan, &cashier.id).await.unwrap();
        assert_eq!(receipt.order.total, 0);

        let a_after = db.products().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock, 9);
        assert!(db
            .transactions()
            .list(&TransactionFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_stale_plan_rolls_back_everything() {
        let db = test_db().await;
        let (cashier, a, b) = setup(&db).await;

        // Two cashiers validate against the same stock; the first one wins
        let first = plan_for(&db, vec![(&a.id, 6)], 60_000).await;
        let second = plan_for(&db, vec![(&b.id, 1), (&a.id, 6)], 100_000).await;
        db.orders().complete_checkout(&first, &cashier.id).await.unwrap();

        let err = db.orders().complete_checkout(&second, &cashier.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::InsufficientStock { available: 4, requested: 6, .. })
        ));

        // b was decremented inside the failed group and must be restored
        let b_after = db.products().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(b_after.stock, 10);
        assert_eq!(b_after.version, b.version);
        assert_eq!(db.orders().list(&DateRange::unbounded(), 10).await.unwrap().len(), 1);
        assert_eq!(db.transactions().balance().await.unwrap().rupiah(), 60_000);
    }

    #[tokio::test]
    async fn test_version_conflict_with_enough_stock_fails_order() {
        let db = test_db().await;
        let (cashier, a, _) = setup(&db).await;
        let admin = db.users().get_by_username("admin1").await.unwrap().unwrap();

        let plan = plan_for(&db, vec![(&a.id, 1)], 10_000).await;
        db.products()
            .adjust_stock(
                &a.id,
                &koperasi_core::input::StockAdjustmentInput {
                    movement_type: Mt::In,
                    quantity: 5,
                    reference: None,
                    notes: None,
                    record_expense: false,
                    payment_method: None,
                },
                &admin.id,
            )
            .await
            .unwrap();

        let err = db.orders().complete_checkout(&plan, &cashier.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::OrderCreationFailed { .. })));
        assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 15);
    }

    #[tokio::test]
    async fn test_receipt_lookup() {
        let db = test_db().await;
        let (cashier, a, _) = setup(&db).await;

        let plan = plan_for(&db, vec![(&a.id, 1)], 10_000).await;
        let receipt = db.orders().complete_checkout(&plan, &cashier.id).await.unwrap();

        let found = db.orders().receipt(&receipt.order.id).await.unwrap().unwrap();
        assert_eq!(found.order.order_number, receipt.order.order_number);
        assert_eq!(found.items[0].sku_snapshot, "BRS-5KG");
        assert!(db.orders().receipt("missing").await.unwrap().is_none());
    }
}
