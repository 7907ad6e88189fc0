//! # Member Repository
//!
//! Member savings (simpanan) live in the cash ledger as
//! MEMBER_DEPOSIT / MEMBER_WITHDRAWAL rows whose description carries the
//! member's name:
//!
//! ```text
//! CASH_IN  MEMBER_DEPOSIT     "Simpanan - Siti Aminah"    100.000
//! CASH_OUT MEMBER_WITHDRAWAL  "Penarikan - Siti Aminah"    40.000
//!                                                         ───────
//!                                  savings of Siti Aminah  60.000
//! ```
//!
//! A withdrawal is refused when it exceeds the member's savings. The check
//! and the insert share one transaction.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use koperasi_core::input::MemberMovementInput;
use koperasi_core::ledger::{
    deposit_description, member_balance, member_balances, member_name_of, member_savings_effect,
    withdrawal_description, MemberBalance, TransactionCategory, TransactionType,
};
use koperasi_core::{ActivityAction, CoreError, LedgerTransaction, Module, Money, NewActivity};

use super::activity::record;
use super::clean;
use super::transaction::{insert_transaction, TRANSACTION_SELECT};
use crate::error::DbResult;

const MEMBER_ROWS: &str = " AND t.category IN ('MEMBER_DEPOSIT', 'MEMBER_WITHDRAWAL')";

#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MemberRepository { pool }
    }

    /// Books a savings deposit.
    pub async fn deposit(
        &self,
        input: &MemberMovementInput,
        actor_id: &str,
    ) -> DbResult<LedgerTransaction> {
        input.validate()?;
        let row = member_row(input, actor_id, TransactionCategory::MemberDeposit);

        let mut tx = self.pool.begin().await?;
        insert_transaction(&mut tx, &row).await?;
        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Members,
                ActivityAction::Deposit,
                format!("Deposit {} for {}", row.amount(), input.member_name.trim()),
            ),
        )
        .await?;
        tx.commit().await?;

        info!(member = %input.member_name.trim(), amount = row.amount, "Member deposit recorded");
        Ok(row)
    }

    /// Pays out savings. Refused past the member's balance.
    pub async fn withdraw(
        &self,
        input: &MemberMovementInput,
        actor_id: &str,
    ) -> DbResult<LedgerTransaction> {
        input.validate()?;
        let row = member_row(input, actor_id, TransactionCategory::MemberWithdrawal);

        let mut tx = self.pool.begin().await?;
        ensure_savings_cover(&mut tx, None, Some(&row)).await?;
        insert_transaction(&mut tx, &row).await?;
        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Members,
                ActivityAction::Withdraw,
                format!("Withdrawal {} for {}", row.amount(), input.member_name.trim()),
            ),
        )
        .await?;
        tx.commit().await?;

        info!(
            member = %input.member_name.trim(),
            amount = row.amount,
            "Member withdrawal recorded"
        );
        Ok(row)
    }

    /// Savings per member, sorted by name.
    pub async fn balances(&self) -> DbResult<Vec<MemberBalance>> {
        let sql = format!("{}{}", TRANSACTION_SELECT, MEMBER_ROWS);
        let rows = sqlx::query_as::<_, LedgerTransaction>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(member_balances(&rows))
    }

    /// Deposits and withdrawals of one member, newest first.
    pub async fn history(&self, member_name: &str) -> DbResult<Vec<LedgerTransaction>> {
        let mut qb = QueryBuilder::<Sqlite>::new(TRANSACTION_SELECT);
        qb.push(MEMBER_ROWS)
            .push(" AND t.description IN (")
            .push_bind(deposit_description(member_name))
            .push(", ")
            .push_bind(withdrawal_description(member_name))
            .push(") ORDER BY t.created_at DESC, t.rowid DESC");

        let rows = qb
            .build_query_as::<LedgerTransaction>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

fn member_row(
    input: &MemberMovementInput,
    actor_id: &str,
    category: TransactionCategory,
) -> LedgerTransaction {
    let now = Utc::now();
    let (transaction_type, description) = match category {
        TransactionCategory::MemberWithdrawal => {
            (TransactionType::CashOut, withdrawal_description(&input.member_name))
        }
        _ => (TransactionType::CashIn, deposit_description(&input.member_name)),
    };

    LedgerTransaction {
        id: Uuid::new_v4().to_string(),
        transaction_type,
        category,
        amount: input.amount,
        description,
        notes: clean(input.notes.as_deref()),
        payment_method: input.payment_method,
        supplier_id: None,
        supplier_name: None,
        order_id: None,
        created_by: actor_id.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Fails with `InsufficientMemberBalance` when a ledger write would leave a
/// member's savings below zero.
///
/// `replacing` is the stored row being rewritten or deleted, `adding` the row
/// about to be written. Every member named by either is checked. A change
/// that does not lower a member's savings always passes.
pub(crate) async fn ensure_savings_cover(
    conn: &mut SqliteConnection,
    replacing: Option<&LedgerTransaction>,
    adding: Option<&LedgerTransaction>,
) -> DbResult<()> {
    let mut affected: Vec<&str> = [replacing, adding]
        .into_iter()
        .flatten()
        .filter(|row| row.category.is_member())
        .filter_map(|row| member_name_of(&row.description))
        .collect();
    affected.dedup();
    if affected.is_empty() {
        return Ok(());
    }

    let sql = format!("{}{}", TRANSACTION_SELECT, MEMBER_ROWS);
    let rows = sqlx::query_as::<_, LedgerTransaction>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    for member in affected {
        let balance = member_balance(&rows, member);
        let removed = replacing.map_or(Money::zero(), |row| member_savings_effect(row, member));
        let added = adding.map_or(Money::zero(), |row| member_savings_effect(row, member));
        let after = balance - removed + added;

        if after.is_negative() && after < balance {
            let requested = balance - after;
            warn!(member = %member, %balance, %requested, "Ledger change exceeds member savings");
            return Err(CoreError::InsufficientMemberBalance {
                member: member.to_string(),
                balance,
                requested,
            }
            .into());
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::{test_db, test_user};
    use koperasi_core::{PaymentMethod, Role};

    fn movement(name: &str, amount: i64) -> MemberMovementInput {
        MemberMovementInput {
            member_name: name.to_string(),
            amount,
            notes: None,
            payment_method: Some(PaymentMethod::Cash),
        }
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let members = db.members();

        let deposit = members.deposit(&movement("Siti Aminah", 100_000), &admin.id).await.unwrap();
        assert_eq!(deposit.description, "Simpanan - Siti Aminah");
        assert_eq!(deposit.transaction_type, TransactionType::CashIn);

        members.withdraw(&movement("Siti Aminah", 40_000), &admin.id).await.unwrap();
        members.deposit(&movement("Budi", 25_000), &admin.id).await.unwrap();

        let balances = members.balances().await.unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].member_name, "Budi");
        assert_eq!(balances[1].balance.rupiah(), 60_000);
        assert_eq!(balances[1].transaction_count, 2);

        let history = members.history("Siti Aminah").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].category, TransactionCategory::MemberWithdrawal);

        // Savings are cash held by the store
        assert_eq!(db.transactions().balance().await.unwrap().rupiah(), 85_000);
    }

    #[tokio::test]
    async fn test_withdrawal_past_balance_refused() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;
        let members = db.members();

        members.deposit(&movement("Siti", 50_000), &admin.id).await.unwrap();

        let err = members.withdraw(&movement("Siti", 50_001), &admin.id).await.unwrap_err();
        match err {
            DbError::Rule(CoreError::InsufficientMemberBalance { member, balance, requested }) => {
                assert_eq!(member, "Siti");
                assert_eq!(balance.rupiah(), 50_000);
                assert_eq!(requested.rupiah(), 50_001);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        members.withdraw(&movement("Siti", 50_000), &admin.id).await.unwrap();
        let balances = members.balances().await.unwrap();
        assert!(balances[0].balance.is_zero());
    }

    #[tokio::test]
    async fn test_unknown_member_cannot_withdraw() {
        let db = test_db().await;
        let admin = test_user(&db, "admin1", Role::Admin).await;

        let err = db.members().withdraw(&movement("Nobody", 1_000), &admin.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientMemberBalance { .. })));
        assert!(db.members().history("Nobody").await.unwrap().is_empty());
    }
}
