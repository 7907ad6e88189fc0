//! # Report Repository
//!
//! Read-only aggregates for the dashboard and report screens.
//!
//! ```text
//! dashboard(today)      orders + ledger for today, stock alerts, member count
//! cash_flow(range)      one DailyPoint per UTC day, running from the opening
//!                       balance of everything before the range
//! top_products(range)   best sellers by quantity
//! sales_summary(range)  order count and summed totals
//! ```

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use koperasi_core::ledger::{daily_series, fill_days, DailyPoint};
use koperasi_core::period::DateRange;
use koperasi_core::{DashboardSummary, LedgerTransaction, Money, SalesSummary, TopProduct};

use super::member::MemberRepository;
use super::product::ProductRepository;
use super::push_range;
use super::transaction::{TransactionFilter, TransactionRepository};
use crate::error::DbResult;

/// Longest range the chart pads with empty days. Longer ranges stay sparse.
pub const MAX_FILLED_DAYS: i64 = 1_000;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Dashboard cards. `today` is the store's current local day.
    pub async fn dashboard(&self, today: &DateRange) -> DbResult<DashboardSummary> {
        let transactions = TransactionRepository::new(self.pool.clone());
        let products = ProductRepository::new(self.pool.clone());

        let sales = self.sales_summary(today).await?;
        let ledger = transactions.summary(today).await?;
        let balance = transactions.balance().await?;
        let active_products = products.count().await?;

        let low_stock_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_active = 1 AND stock <= min_stock",
        )
        .fetch_one(&self.pool)
        .await?;

        let member_count = MemberRepository::new(self.pool.clone()).balances().await?.len() as i64;

        Ok(DashboardSummary {
            today_sales: Money::from_rupiah(sales.total),
            today_orders: sales.order_count,
            today_cash_in: ledger.cash_in,
            today_cash_out: ledger.cash_out,
            balance,
            active_products,
            low_stock_count,
            member_count,
        })
    }

    /// Daily cash flow for the chart.
    ///
    /// A bounded range of up to [`MAX_FILLED_DAYS`] yields every day in it,
    /// empty days included. Longer or unbounded ranges yield only days with
    /// rows.
    pub async fn cash_flow(&self, range: &DateRange) -> DbResult<Vec<DailyPoint>> {
        let transactions = TransactionRepository::new(self.pool.clone());

        let opening = match range.start {
            Some(start) => transactions.opening_balance(start).await?,
            None => Money::zero(),
        };
        let rows: Vec<LedgerTransaction> = transactions
            .export_rows(&TransactionFilter::for_range(*range))
            .await?;

        debug!(rows = rows.len(), %opening, "Building cash-flow series");

        let series = daily_series(&rows, opening);
        Ok(match range.utc_days() {
            Some((first, end)) if (end - first).num_days() <= MAX_FILLED_DAYS => {
                fill_days(&series, first, end, opening)
            }
            _ => series,
        })
    }

    /// Best-selling products in a period, by quantity then revenue.
    pub async fn top_products(&self, range: &DateRange, limit: i64) -> DbResult<Vec<TopProduct>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                oi.product_id,
                p.sku,
                p.name,
                SUM(oi.quantity) AS quantity_sold,
                SUM(oi.subtotal) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE 1 = 1
            "#,
        );
        push_range(&mut qb, "o.created_at", range);
        qb.push(" GROUP BY oi.product_id, p.sku, p.name")
            .push(" ORDER BY quantity_sold DESC, revenue DESC LIMIT ")
            .push_bind(limit.clamp(1, 100));

        let top = qb.build_query_as::<TopProduct>().fetch_all(&self.pool).await?;
        Ok(top)
    }

    pub async fn sales_summary(&self, range: &DateRange) -> DbResult<SalesSummary> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                COUNT(*) AS order_count,
                COALESCE(SUM(subtotal), 0) AS subtotal,
                COALESCE(SUM(discount), 0) AS discount,
                COALESCE(SUM(tax), 0) AS tax,
                COALESCE(SUM(total), 0) AS total
            FROM orders
            WHERE 1 = 1
            "#,
        );
        push_range(&mut qb, "created_at", range);

        let summary = qb.build_query_as::<SalesSummary>().fetch_one(&self.pool).await?;
        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::sample_product;
    use crate::repository::testing::{test_db, test_user};
    use chrono::{Duration, NaiveDate, Utc};
    use koperasi_core::checkout::{CheckoutItem, CheckoutSession};
    use koperasi_core::input::{MemberMovementInput, TransactionInput};
    use koperasi_core::ledger::{TransactionCategory, TransactionType};
    use koperasi_core::{PaymentMethod, Role, TaxRate};

    fn today() -> DateRange {
        let now = Utc::now();
        DateRange {
            start: Some(now - Duration::hours(1)),
            end: Some(now + Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn test_dashboard_and_top_products() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let kasir = test_user(&db, "kasir1", Role::Kasir).await;

        let beras = db.products().create(&sample_product("BRS-5KG", 10), &admin.id).await.unwrap();
        let gula = db.products().create(&sample_product("GULA-1KG", 3), &admin.id).await.unwrap();

        for (product, quantity) in [(&beras, 3), (&gula, 1), (&beras, 2)] {
            let mut session = CheckoutSession::new(
                vec![CheckoutItem {
                    product_id: product.id.clone(),
                    quantity,
                }],
                Money::zero(),
                None,
                TaxRate::zero(),
                PaymentMethod::Cash,
                None,
            );
            let products = db.products().get_many(&session.product_ids()).await.unwrap();
            session.begin_payment().unwrap();
            let plan = session.confirm(Money::from_rupiah(100_000), &products).unwrap();
            db.orders().complete_checkout(&plan, &kasir.id).await.unwrap();
        }

        db.members()
            .deposit(
                &MemberMovementInput {
                    member_name: "Siti".to_string(),
                    amount: 20_000,
                    notes: None,
                    payment_method: None,
                },
                &admin.id,
            )
            .await
            .unwrap();

        let summary = db.reports().dashboard(&today()).await.unwrap();
        assert_eq!(summary.today_orders, 3);
        assert_eq!(summary.today_sales.rupiah(), 60_000);
        assert_eq!(summary.today_cash_in.rupiah(), 80_000);
        assert_eq!(summary.balance.rupiah(), 80_000);
        assert_eq!(summary.active_products, 2);
        // gula: 3 - 1 = 2 <= min_stock 2
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.member_count, 1);

        let top = db.reports().top_products(&DateRange::unbounded(), 5).await.unwrap();
        assert_eq!(top[0].sku, "BRS-5KG");
        assert_eq!(top[0].quantity_sold, 5);
        assert_eq!(top[0].revenue, 50_000);
        assert_eq!(top[1].quantity_sold, 1);
    }

    #[tokio::test]
    async fn test_cash_flow_fills_every_day() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;

        db.transactions()
            .create(
                &TransactionInput {
                    transaction_type: TransactionType::CashIn,
                    category: TransactionCategory::Other,
                    amount: 40_000,
                    description: "Modal".to_string(),
                    notes: None,
                    payment_method: None,
                    supplier_id: None,
                },
                &admin.id,
            )
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let start = (today - Duration::days(2)).and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = (today + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap().and_utc();
        let series = db
            .reports()
            .cash_flow(&DateRange {
                start: Some(start),
                end: Some(end),
            })
            .await
            .unwrap();

        assert_eq!(series.len(), 3);
        assert!(series[0].running_balance.is_zero());
        assert_eq!(series[2].date, today);
        assert_eq!(series[2].cash_in.rupiah(), 40_000);
        assert_eq!(series[2].running_balance.rupiah(), 40_000);
    }

    #[tokio::test]
    async fn test_long_range_stays_sparse() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;

        db.transactions()
            .create(
                &TransactionInput {
                    transaction_type: TransactionType::CashIn,
                    category: TransactionCategory::Other,
                    amount: 15_000,
                    description: "Modal".to_string(),
                    notes: None,
                    payment_method: None,
                    supplier_id: None,
                },
                &admin.id,
            )
            .await
            .unwrap();

        let start = NaiveDate::from_ymd_opt(1, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let series = db
            .reports()
            .cash_flow(&DateRange {
                start: Some(start),
                end: Some(Utc::now() + Duration::days(1)),
            })
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].running_balance.rupiah(), 15_000);
    }

    #[tokio::test]
    async fn test_empty_store_reports_zero() {
        let db = test_db().await;

        let sales = db.reports().sales_summary(&DateRange::unbounded()).await.unwrap();
        assert_eq!(sales, SalesSummary::default());
        assert!(db.reports().cash_flow(&DateRange::unbounded()).await.unwrap().is_empty());
        assert!(db.reports().top_products(&today(), 5).await.unwrap().is_empty());
    }
}
