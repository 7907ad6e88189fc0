//! # Transaction Repository
//!
//! The cooperative's cash ledger.
//!
//! ## Row Origins
//! ```text
//! ┌──────────────────────────┬─────────────────────────────┬───────────────┐
//! │ Written by               │ type / category             │ Editable      │
//! ├──────────────────────────┼─────────────────────────────┼───────────────┤
//! │ POS checkout             │ CASH_IN  / SALES            │ no (order_id) │
//! │ Restock with expense     │ CASH_OUT / PURCHASE         │ yes           │
//! │ Member deposit           │ CASH_IN  / MEMBER_DEPOSIT   │ yes           │
//! │ Member withdrawal        │ CASH_OUT / MEMBER_WITHDRAWAL│ yes           │
//! │ Manual entry             │ any compatible pair         │ yes           │
//! └──────────────────────────┴─────────────────────────────┴───────────────┘
//! ```
//!
//! Balance is `Σ CASH_IN − Σ CASH_OUT`; TRANSFER and ADJUSTMENT rows are
//! recorded but move nothing.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use koperasi_core::input::TransactionInput;
use koperasi_core::ledger::{LedgerSummary, TransactionCategory, TransactionType};
use koperasi_core::period::DateRange;
use koperasi_core::validation::validate_search_query;
use koperasi_core::{ActivityAction, CoreError, LedgerTransaction, Module, Money, NewActivity};

use super::activity::record;
use super::member::ensure_savings_cover;
use super::{clean, push_range};
use crate::error::{DbError, DbResult};

pub(crate) const TRANSACTION_SELECT: &str = r#"
    SELECT
        t.id,
        t.type,
        t.category,
        t.amount,
        t.description,
        t.notes,
        t.payment_method,
        t.supplier_id,
        s.name AS supplier_name,
        t.order_id,
        t.created_by,
        t.created_at,
        t.updated_at
    FROM transactions t
    LEFT JOIN suppliers s ON s.id = t.supplier_id
    WHERE 1 = 1
"#;

const BALANCE_SUM: &str = "COALESCE(SUM(CASE type \
    WHEN 'CASH_IN' THEN amount WHEN 'CASH_OUT' THEN -amount ELSE 0 END), 0)";

// =============================================================================
// Filter
// =============================================================================

/// Ledger list filter.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub range: DateRange,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<TransactionCategory>,
    /// Matches description or notes.
    pub search: Option<String>,
    pub supplier_id: Option<String>,
    /// `None` returns every matching row.
    pub limit: Option<i64>,
}

impl TransactionFilter {
    pub fn for_range(range: DateRange) -> Self {
        TransactionFilter {
            range,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOrder {
    NewestFirst,
    OldestFirst,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Lists matching rows, newest first.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<LedgerTransaction>> {
        self.query(filter, RowOrder::NewestFirst).await
    }

    /// Rows for the CSV export, oldest first, with supplier names.
    pub async fn export_rows(
        &self,
        filter: &TransactionFilter,
    ) -> DbResult<Vec<LedgerTransaction>> {
        let unlimited = TransactionFilter {
            limit: None,
            ..filter.clone()
        };
        self.query(&unlimited, RowOrder::OldestFirst).await
    }

    async fn query(
        &self,
        filter: &TransactionFilter,
        order: RowOrder,
    ) -> DbResult<Vec<LedgerTransaction>> {
        debug!(?filter, "Listing transactions");

        let mut qb = QueryBuilder::<Sqlite>::new(TRANSACTION_SELECT);
        push_range(&mut qb, "t.created_at", &filter.range);
        if let Some(transaction_type) = filter.transaction_type {
            qb.push(" AND t.type = ").push_bind(transaction_type);
        }
        if let Some(category) = filter.category {
            qb.push(" AND t.category = ").push_bind(category);
        }
        if let Some(supplier_id) = &filter.supplier_id {
            qb.push(" AND t.supplier_id = ").push_bind(supplier_id.clone());
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", validate_search_query(search).map_err(CoreError::from)?);
            qb.push(" AND (t.description LIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.notes LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        match order {
            RowOrder::NewestFirst => qb.push(" ORDER BY t.created_at DESC, t.rowid DESC"),
            RowOrder::OldestFirst => qb.push(" ORDER BY t.created_at, t.rowid"),
        };
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.clamp(1, 1000));
        }

        let rows = qb
            .build_query_as::<LedgerTransaction>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<LedgerTransaction>> {
        let mut conn = self.pool.acquire().await?;
        fetch_transaction(&mut conn, id).await
    }

    /// Records a manual ledger entry.
    pub async fn create(
        &self,
        input: &TransactionInput,
        actor_id: &str,
    ) -> DbResult<LedgerTransaction> {
        input.validate()?;

        let now = Utc::now();
        let row = LedgerTransaction {
            id: Uuid::new_v4().to_string(),
            transaction_type: input.transaction_type,
            category: input.category,
            amount: input.amount,
            description: input.description.trim().to_string(),
            notes: clean(input.notes.as_deref()),
            payment_method: input.payment_method,
            supplier_id: clean(input.supplier_id.as_deref()),
            supplier_name: None,
            order_id: None,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        ensure_supplier(&mut tx, row.supplier_id.as_deref()).await?;
        ensure_savings_cover(&mut tx, None, Some(&row)).await?;
        insert_transaction(&mut tx, &row).await?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Financial,
                ActivityAction::Create,
                format!(
                    "Recorded {} {} {}: {}",
                    row.transaction_type.as_str(),
                    row.category.as_str(),
                    row.amount(),
                    row.description
                ),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(transaction_id = %row.id, amount = row.amount, "Ledger entry recorded");
        self.require(&row.id).await
    }

    /// Rewrites a manual entry. Rows generated by a POS order are refused.
    pub async fn update(
        &self,
        id: &str,
        input: &TransactionInput,
        actor_id: &str,
    ) -> DbResult<LedgerTransaction> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        let existing = fetch_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;
        refuse_linked(&existing)?;

        let updated = LedgerTransaction {
            transaction_type: input.transaction_type,
            category: input.category,
            amount: input.amount,
            description: input.description.trim().to_string(),
            notes: clean(input.notes.as_deref()),
            payment_method: input.payment_method,
            supplier_id: clean(input.supplier_id.as_deref()),
            updated_at: Utc::now(),
            ..existing.clone()
        };

        ensure_supplier(&mut tx, updated.supplier_id.as_deref()).await?;
        ensure_savings_cover(&mut tx, Some(&existing), Some(&updated)).await?;

        sqlx::query(
            r#"
            UPDATE transactions
            SET type = ?2, category = ?3, amount = ?4, description = ?5, notes = ?6,
                payment_method = ?7, supplier_id = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(updated.transaction_type)
        .bind(updated.category)
        .bind(updated.amount)
        .bind(&updated.description)
        .bind(&updated.notes)
        .bind(updated.payment_method)
        .bind(&updated.supplier_id)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Financial,
                ActivityAction::Update,
                format!("Updated transaction '{}' ({})", updated.description, updated.amount()),
            ),
        )
        .await?;

        tx.commit().await?;
        self.require(id).await
    }

    /// Removes a manual entry. Rows generated by a POS order are refused.
    pub async fn delete(&self, id: &str, actor_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;
        refuse_linked(&existing)?;
        ensure_savings_cover(&mut tx, Some(&existing), None).await?;

        sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Financial,
                ActivityAction::Delete,
                format!(
                    "Deleted transaction '{}' ({} {})",
                    existing.description,
                    existing.transaction_type.as_str(),
                    existing.amount()
                ),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(transaction_id = %id, "Ledger entry deleted");
        Ok(())
    }

    /// Current cash balance over the whole ledger.
    pub async fn balance(&self) -> DbResult<Money> {
        let balance: i64 = sqlx::query_scalar(&format!("SELECT {} FROM transactions", BALANCE_SUM))
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_rupiah(balance))
    }

    /// Balance of every row strictly before `before`.
    pub async fn opening_balance(&self, before: DateTime<Utc>) -> DbResult<Money> {
        let balance: i64 = sqlx::query_scalar(&format!(
            "SELECT {} FROM transactions WHERE created_at < ?1",
            BALANCE_SUM
        ))
        .bind(before)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_rupiah(balance))
    }

    /// Cash in, cash out, net and row count for a period.
    pub async fn summary(&self, range: &DateRange) -> DbResult<LedgerSummary> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                COALESCE(SUM(CASE type WHEN 'CASH_IN' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE type WHEN 'CASH_OUT' THEN amount ELSE 0 END), 0),
                COUNT(*)
            FROM transactions
            WHERE 1 = 1
            "#,
        );
        push_range(&mut qb, "created_at", range);

        let (cash_in, cash_out, count): (i64, i64, i64) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        Ok(LedgerSummary {
            cash_in: Money::from_rupiah(cash_in),
            cash_out: Money::from_rupiah(cash_out),
            balance: Money::from_rupiah(cash_in - cash_out),
            count,
        })
    }

    async fn require(&self, id: &str) -> DbResult<LedgerTransaction> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }
}

// =============================================================================
// Shared write helpers
// =============================================================================

pub(crate) async fn fetch_transaction(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<LedgerTransaction>> {
    let sql = format!("{} AND t.id = ?1", TRANSACTION_SELECT);
    let row = sqlx::query_as::<_, LedgerTransaction>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Inserts a ledger row. `supplier_name` is derived on read and ignored here.
pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    row: &LedgerTransaction,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, type, category, amount, description, notes, payment_method,
            supplier_id, order_id, created_by, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&row.id)
    .bind(row.transaction_type)
    .bind(row.category)
    .bind(row.amount)
    .bind(&row.description)
    .bind(&row.notes)
    .bind(row.payment_method)
    .bind(&row.supplier_id)
    .bind(&row.order_id)
    .bind(&row.created_by)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn refuse_linked(row: &LedgerTransaction) -> DbResult<()> {
    match &row.order_id {
        Some(order_id) => Err(CoreError::LinkedTransaction {
            transaction_id: row.id.clone(),
            order_id: order_id.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

async fn ensure_supplier(conn: &mut SqliteConnection, supplier_id: Option<&str>) -> DbResult<()> {
    let Some(supplier_id) = supplier_id else {
        return Ok(());
    };
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers WHERE id = ?1")
        .bind(supplier_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists == 0 {
        return Err(DbError::not_found("Supplier", supplier_id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{test_db, test_user};
    use chrono::Duration;
    use koperasi_core::input::MemberMovementInput;
    use koperasi_core::{PaymentMethod, Role};

    fn entry(
        transaction_type: TransactionType,
        category: TransactionCategory,
        amount: i64,
        description: &str,
    ) -> TransactionInput {
        TransactionInput {
            transaction_type,
            category,
            amount,
            description: description.to_string(),
            notes: None,
            payment_method: Some(PaymentMethod::Cash),
            supplier_id: None,
        }
    }

    #[tokio::test]
    async fn test_balance_ignores_neutral_types() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let repo = db.transactions();

        repo.create(
            &entry(TransactionType::CashIn, TransactionCategory::Other, 100_000, "Modal awal"),
            &admin.id,
        )
        .await
        .unwrap();
        repo.create(
            &entry(TransactionType::CashOut, TransactionCategory::Operational, 30_000, "Listrik"),
            &admin.id,
        )
        .await
        .unwrap();
        repo.create(
            &entry(TransactionType::Transfer, TransactionCategory::Other, 50_000, "Pindah kas"),
            &admin.id,
        )
        .await
        .unwrap();

        assert_eq!(repo.balance().await.unwrap().rupiah(), 70_000);

        let summary = repo.summary(&DateRange::unbounded()).await.unwrap();
        assert_eq!(summary.cash_in.rupiah(), 100_000);
        assert_eq!(summary.cash_out.rupiah(), 30_000);
        assert_eq!(summary.balance.rupiah(), 70_000);
        assert_eq!(summary.count, 3);

        let future = Utc::now() + Duration::days(1);
        assert_eq!(repo.opening_balance(future).await.unwrap().rupiah(), 70_000);
        let past = Utc::now() - Duration::days(1);
        assert!(repo.opening_balance(past).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_category_type_mismatch_rejected() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;

        let err = db
            .transactions()
            .create(
                &entry(TransactionType::CashOut, TransactionCategory::Sales, 10_000, "Salah"),
                &admin.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
        assert_eq!(db.transactions().list(&TransactionFilter::default()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let repo = db.transactions();

        let row = repo
            .create(
                &entry(TransactionType::CashOut, TransactionCategory::Operational, 25_000, "Air"),
                &admin.id,
            )
            .await
            .unwrap();

        let updated = repo
            .update(
                &row.id,
                &entry(
                    TransactionType::CashOut,
                    TransactionCategory::Operational,
                    40_000,
                    "Air PDAM",
                ),
                &admin.id,
            )
            .await
            .unwrap();
        assert_eq!(updated.amount, 40_000);
        assert_eq!(updated.created_at, row.created_at);
        assert_eq!(repo.balance().await.unwrap().rupiah(), -40_000);

        repo.delete(&row.id, &admin.id).await.unwrap();
        assert!(repo.get_by_id(&row.id).await.unwrap().is_none());
        assert!(repo.balance().await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_filters_and_supplier_name() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let supplier = db
            .suppliers()
            .create(
                &koperasi_core::input::SupplierInput {
                    name: "CV Sumber Tani".to_string(),
                    contact_person: None,
                    phone: None,
                    email: None,
                    address: None,
                },
                &admin.id,
            )
            .await
            .unwrap();
        let repo = db.transactions();

        let mut purchase =
            entry(TransactionType::CashOut, TransactionCategory::Purchase, 90_000, "Beras");
        purchase.supplier_id = Some(supplier.id.clone());
        repo.create(&purchase, &admin.id).await.unwrap();
        repo.create(
            &entry(TransactionType::CashIn, TransactionCategory::Other, 5_000, "Hibah"),
            &admin.id,
        )
        .await
        .unwrap();

        let purchases = repo
            .list(&TransactionFilter {
                category: Some(TransactionCategory::Purchase),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].supplier_name.as_deref(), Some("CV Sumber Tani"));

        let searched = repo
            .list(&TransactionFilter {
                search: Some("hibah".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);

        let exported = repo.export_rows(&TransactionFilter::default()).await.unwrap();
        assert_eq!(exported.len(), 2);
        assert!(exported[0].created_at <= exported[1].created_at);

        let mut unknown =
            entry(TransactionType::CashOut, TransactionCategory::Purchase, 1_000, "X");
        unknown.supplier_id = Some(Uuid::new_v4().to_string());
        let err = repo.create(&unknown, &admin.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Supplier"));
    }

    #[tokio::test]
    async fn test_manual_withdrawal_respects_savings() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let repo = db.transactions();

        repo.create(
            &entry(
                TransactionType::CashIn,
                TransactionCategory::MemberDeposit,
                50_000,
                "Simpanan - Siti",
            ),
            &admin.id,
        )
        .await
        .unwrap();

        let err = repo
            .create(
                &entry(
                    TransactionType::CashOut,
                    TransactionCategory::MemberWithdrawal,
                    60_000,
                    "Penarikan - Siti",
                ),
                &admin.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::InsufficientMemberBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_deposit_edits_cannot_overdraw_savings() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let repo = db.transactions();

        let movement = |amount| MemberMovementInput {
            member_name: "Siti".to_string(),
            amount,
            notes: None,
            payment_method: Some(PaymentMethod::Cash),
        };
        let deposit = db.members().deposit(&movement(100_000), &admin.id).await.unwrap();
        let withdrawal = db.members().withdraw(&movement(80_000), &admin.id).await.unwrap();

        let err = repo.delete(&deposit.id, &admin.id).await.unwrap_err();
        match err {
            DbError::Rule(CoreError::InsufficientMemberBalance { member, balance, requested }) => {
                assert_eq!(member, "Siti");
                assert_eq!(balance.rupiah(), 20_000);
                assert_eq!(requested.rupiah(), 100_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let shrink = |amount| {
            entry(
                TransactionType::CashIn,
                TransactionCategory::MemberDeposit,
                amount,
                "Simpanan - Siti",
            )
        };
        let err = repo.update(&deposit.id, &shrink(70_000), &admin.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientMemberBalance { .. })));

        let recategorised = entry(
            TransactionType::CashIn,
            TransactionCategory::Other,
            100_000,
            "Simpanan - Siti",
        );
        let err = repo.update(&deposit.id, &recategorised, &admin.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientMemberBalance { .. })));

        repo.update(&deposit.id, &shrink(80_000), &admin.id).await.unwrap();
        let balances = db.members().balances().await.unwrap();
        assert!(balances[0].balance.is_zero());

        // Removing a withdrawal only raises savings
        repo.delete(&withdrawal.id, &admin.id).await.unwrap();
        let balances = db.members().balances().await.unwrap();
        assert_eq!(balances[0].balance.rupiah(), 80_000);
    }
}
