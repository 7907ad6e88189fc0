//! # Ledger Rules
//!
//! How ledger rows move the cooperative's cash balance, and the aggregates
//! built on top of that: running balance, daily chart series, period
//! summary, and member savings.
//!
//! ## Balance Effect
//! ```text
//! ┌──────────────┬──────────────────────────────────────────┐
//! │ type         │ effect on balance                        │
//! ├──────────────┼──────────────────────────────────────────┤
//! │ CASH_IN      │ + amount                                 │
//! │ CASH_OUT     │ − amount                                 │
//! │ TRANSFER     │ 0  (moves money between cash and bank)   │
//! │ ADJUSTMENT   │ 0  (bookkeeping correction, memo only)   │
//! └──────────────┴──────────────────────────────────────────┘
//! ```
//!
//! ## Member Savings
//! Member deposits and withdrawals are ordinary ledger rows whose
//! description carries the member's name:
//! ```text
//! "Simpanan - Siti Aminah"   MEMBER_DEPOSIT     CASH_IN
//! "Penarikan - Siti Aminah"  MEMBER_WITHDRAWAL  CASH_OUT
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::LedgerTransaction;
use crate::{MEMBER_DEPOSIT_PREFIX, MEMBER_WITHDRAWAL_PREFIX};

// =============================================================================
// Transaction Type & Category
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    CashIn,
    CashOut,
    Transfer,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::CashIn => "CASH_IN",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Signed effect of a row of this type on the cash balance.
    ///
    /// ## Example
    /// ```rust
    /// use koperasi_core::ledger::TransactionType;
    /// use koperasi_core::money::Money;
    ///
    /// let amount = Money::from_rupiah(50_000);
    /// assert_eq!(TransactionType::CashOut.balance_effect(amount).rupiah(), -50_000);
    /// assert!(TransactionType::Transfer.balance_effect(amount).is_zero());
    /// ```
    pub fn balance_effect(self, amount: Money) -> Money {
        match self {
            TransactionType::CashIn => amount,
            TransactionType::CashOut => Money::zero() - amount,
            TransactionType::Transfer | TransactionType::Adjustment => Money::zero(),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TransactionType::CashIn,
            TransactionType::CashOut,
            TransactionType::Transfer,
            TransactionType::Adjustment,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown transaction type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    Sales,
    Purchase,
    Operational,
    MemberDeposit,
    MemberWithdrawal,
    Other,
}

impl TransactionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionCategory::Sales => "SALES",
            TransactionCategory::Purchase => "PURCHASE",
            TransactionCategory::Operational => "OPERATIONAL",
            TransactionCategory::MemberDeposit => "MEMBER_DEPOSIT",
            TransactionCategory::MemberWithdrawal => "MEMBER_WITHDRAWAL",
            TransactionCategory::Other => "OTHER",
        }
    }

    /// The transaction type rows of this category must carry, if fixed.
    pub fn required_type(self) -> Option<TransactionType> {
        match self {
            TransactionCategory::Sales | TransactionCategory::MemberDeposit => {
                Some(TransactionType::CashIn)
            }
            TransactionCategory::Purchase | TransactionCategory::MemberWithdrawal => {
                Some(TransactionType::CashOut)
            }
            TransactionCategory::Operational | TransactionCategory::Other => None,
        }
    }

    pub fn is_member(self) -> bool {
        matches!(
            self,
            TransactionCategory::MemberDeposit | TransactionCategory::MemberWithdrawal
        )
    }
}

impl std::str::FromStr for TransactionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TransactionCategory::Sales,
            TransactionCategory::Purchase,
            TransactionCategory::Operational,
            TransactionCategory::MemberDeposit,
            TransactionCategory::MemberWithdrawal,
            TransactionCategory::Other,
        ]
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown transaction category '{}'", s))
    }
}

// =============================================================================
// Balance
// =============================================================================

/// `Σ CASH_IN − Σ CASH_OUT`. Order of the rows does not matter.
pub fn compute_balance<'a, I>(transactions: I) -> Money
where
    I: IntoIterator<Item = &'a LedgerTransaction>,
{
    transactions
        .into_iter()
        .map(|t| t.transaction_type.balance_effect(t.amount()))
        .sum()
}

/// Totals for a set of ledger rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub cash_in: Money,
    pub cash_out: Money,
    pub balance: Money,
    pub count: i64,
}

pub fn summarize<'a, I>(transactions: I) -> LedgerSummary
where
    I: IntoIterator<Item = &'a LedgerTransaction>,
{
    let mut summary = LedgerSummary::default();
    for t in transactions {
        match t.transaction_type {
            TransactionType::CashIn => summary.cash_in += t.amount(),
            TransactionType::CashOut => summary.cash_out += t.amount(),
            TransactionType::Transfer | TransactionType::Adjustment => {}
        }
        summary.count += 1;
    }
    summary.balance = summary.cash_in - summary.cash_out;
    summary
}

// =============================================================================
// Daily Series
// =============================================================================

/// One day on the cash-flow chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub cash_in: Money,
    pub cash_out: Money,
    pub running_balance: Money,
}

/// Buckets rows by UTC calendar day of `created_at`.
///
/// The result is strictly ascending by date and
/// `running_balance[n] = running_balance[n−1] + cash_in[n] − cash_out[n]`,
/// starting from `opening_balance`. Days without rows are omitted.
pub fn daily_series<'a, I>(transactions: I, opening_balance: Money) -> Vec<DailyPoint>
where
    I: IntoIterator<Item = &'a LedgerTransaction>,
{
    let mut buckets: BTreeMap<NaiveDate, (Money, Money)> = BTreeMap::new();
    for t in transactions {
        let entry = buckets
            .entry(t.created_at.date_naive())
            .or_insert((Money::zero(), Money::zero()));
        match t.transaction_type {
            TransactionType::CashIn => entry.0 += t.amount(),
            TransactionType::CashOut => entry.1 += t.amount(),
            TransactionType::Transfer | TransactionType::Adjustment => {}
        }
    }

    let mut running = opening_balance;
    buckets
        .into_iter()
        .map(|(date, (cash_in, cash_out))| {
            running += cash_in - cash_out;
            DailyPoint {
                date,
                cash_in,
                cash_out,
                running_balance: running,
            }
        })
        .collect()
}

/// Pads a series so every day in `[start, end)` has a point. Empty days carry
/// the previous running balance forward.
pub fn fill_days(
    series: &[DailyPoint],
    start: NaiveDate,
    end: NaiveDate,
    opening_balance: Money,
) -> Vec<DailyPoint> {
    let mut filled = Vec::new();
    let mut running = opening_balance;
    let mut day = start;
    while day < end {
        match series.iter().find(|p| p.date == day) {
            Some(point) => {
                running = point.running_balance;
                filled.push(*point);
            }
            None => filled.push(DailyPoint {
                date: day,
                cash_in: Money::zero(),
                cash_out: Money::zero(),
                running_balance: running,
            }),
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    filled
}

// =============================================================================
// Member Savings
// =============================================================================

/// Ledger description for a member deposit.
pub fn deposit_description(member_name: &str) -> String {
    format!("{} - {}", MEMBER_DEPOSIT_PREFIX, member_name.trim())
}

/// Ledger description for a member withdrawal.
pub fn withdrawal_description(member_name: &str) -> String {
    format!("{} - {}", MEMBER_WITHDRAWAL_PREFIX, member_name.trim())
}

/// Extracts the member name from a member ledger description.
///
/// ## Example
/// ```rust
/// use koperasi_core::ledger::member_name_of;
///
/// assert_eq!(member_name_of("Simpanan - Siti Aminah"), Some("Siti Aminah"));
/// assert_eq!(member_name_of("Bayar listrik"), None);
/// ```
pub fn member_name_of(description: &str) -> Option<&str> {
    let (_, name) = description.split_once(" - ")?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// One member's savings position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub member_name: String,
    pub total_deposit: Money,
    pub total_withdrawal: Money,
    pub balance: Money,
    pub transaction_count: i64,
}

/// Groups member rows by the name in their description. Rows of other
/// categories, and member rows without a name, are ignored.
///
/// Sorted by member name.
pub fn member_balances<'a, I>(transactions: I) -> Vec<MemberBalance>
where
    I: IntoIterator<Item = &'a LedgerTransaction>,
{
    let mut members: BTreeMap<String, MemberBalance> = BTreeMap::new();
    for t in transactions {
        if !t.category.is_member() {
            continue;
        }
        let Some(name) = member_name_of(&t.description) else {
            continue;
        };
        let entry = members
            .entry(name.to_string())
            .or_insert_with(|| MemberBalance {
                member_name: name.to_string(),
                total_deposit: Money::zero(),
                total_withdrawal: Money::zero(),
                balance: Money::zero(),
                transaction_count: 0,
            });
        match t.category {
            TransactionCategory::MemberDeposit => entry.total_deposit += t.amount(),
            _ => entry.total_withdrawal += t.amount(),
        }
        entry.balance = entry.total_deposit - entry.total_withdrawal;
        entry.transaction_count += 1;
    }
    members.into_values().collect()
}

/// Savings balance of a single member.
pub fn member_balance<'a, I>(transactions: I, member_name: &str) -> Money
where
    I: IntoIterator<Item = &'a LedgerTransaction>,
{
    let wanted = member_name.trim();
    member_balances(transactions)
        .into_iter()
        .find(|m| m.member_name == wanted)
        .map(|m| m.balance)
        .unwrap_or_default()
}

/// What `row` contributes to `member_name`'s savings: its amount for a
/// deposit, the negated amount for a withdrawal, zero otherwise.
pub fn member_savings_effect(row: &LedgerTransaction, member_name: &str) -> Money {
    if member_name_of(&row.description) != Some(member_name.trim()) {
        return Money::zero();
    }
    match row.category {
        TransactionCategory::MemberDeposit => row.amount(),
        TransactionCategory::MemberWithdrawal => Money::zero() - row.amount(),
        _ => Money::zero(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn tx(
        transaction_type: TransactionType,
        category: TransactionCategory,
        amount: i64,
        description: &str,
        at: &str,
    ) -> LedgerTransaction {
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(at)
            .unwrap()
            .with_timezone(&Utc);
        LedgerTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_type,
            category,
            amount,
            description: description.to_string(),
            notes: None,
            payment_method: None,
            supplier_id: None,
            supplier_name: None,
            order_id: None,
            created_by: "u-1".to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    fn sample() -> Vec<LedgerTransaction> {
        use TransactionCategory::*;
        use TransactionType::*;
        vec![
            tx(CashIn, Sales, 65_000, "Penjualan", "2026-03-01T02:00:00Z"),
            tx(CashOut, Purchase, 40_000, "Beli beras", "2026-03-01T05:00:00Z"),
            tx(Transfer, Other, 99_000, "Setor ke bank", "2026-03-02T01:00:00Z"),
            tx(CashIn, MemberDeposit, 100_000, "Simpanan - Siti", "2026-03-03T01:00:00Z"),
            tx(CashOut, MemberWithdrawal, 30_000, "Penarikan - Siti", "2026-03-03T04:00:00Z"),
            tx(Adjustment, Other, 5_000, "Koreksi", "2026-03-04T01:00:00Z"),
        ]
    }

    #[test]
    fn test_balance_ignores_transfer_and_adjustment() {
        let rows = sample();
        assert_eq!(compute_balance(&rows), Money::from_rupiah(95_000));
    }

    #[test]
    fn test_balance_invariant_under_reordering() {
        let rows = sample();
        let mut reversed = rows.clone();
        reversed.reverse();
        let mut rotated = rows.clone();
        rotated.rotate_left(2);

        let expected = compute_balance(&rows);
        assert_eq!(compute_balance(&reversed), expected);
        assert_eq!(compute_balance(&rotated), expected);
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&sample());
        assert_eq!(summary.cash_in, Money::from_rupiah(165_000));
        assert_eq!(summary.cash_out, Money::from_rupiah(70_000));
        assert_eq!(summary.balance, Money::from_rupiah(95_000));
        assert_eq!(summary.count, 6);
    }

    #[test]
    fn test_daily_series_running_balance() {
        let mut rows = sample();
        rows.reverse();
        let series = daily_series(&rows, Money::from_rupiah(10_000));

        let dates: Vec<String> = series.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(
            dates,
            vec!["2026-03-01", "2026-03-02", "2026-03-03", "2026-03-04"]
        );
        assert_eq!(series[0].running_balance, Money::from_rupiah(35_000));
        assert_eq!(series[1].running_balance, Money::from_rupiah(35_000));
        assert_eq!(series[2].cash_in, Money::from_rupiah(100_000));
        assert_eq!(series[3].running_balance, Money::from_rupiah(105_000));

        for pair in series.windows(2) {
            assert!(pair[0].date < pair[1].date);
            assert_eq!(
                pair[1].running_balance,
                pair[0].running_balance + pair[1].cash_in - pair[1].cash_out
            );
        }
    }

    #[test]
    fn test_fill_days_carries_balance() {
        let rows = vec![tx(
            TransactionType::CashIn,
            TransactionCategory::Sales,
            1_000,
            "Penjualan",
            "2026-03-02T01:00:00Z",
        )];
        let series = daily_series(&rows, Money::zero());
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let filled = fill_days(&series, start, end, Money::zero());

        assert_eq!(filled.len(), 3);
        assert_eq!(filled[0].running_balance, Money::zero());
        assert_eq!(filled[1].cash_in, Money::from_rupiah(1_000));
        assert_eq!(filled[2].running_balance, Money::from_rupiah(1_000));
    }

    #[test]
    fn test_member_balances() {
        use TransactionCategory::*;
        use TransactionType::*;
        let mut rows = sample();
        rows.push(tx(CashIn, MemberDeposit, 50_000, "Simpanan - Budi", "2026-03-05T01:00:00Z"));
        rows.push(tx(CashIn, Sales, 1, "Penjualan - kasir 2", "2026-03-05T01:00:00Z"));

        let members = member_balances(&rows);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member_name, "Budi");
        assert_eq!(members[1].member_name, "Siti");
        assert_eq!(members[1].balance, Money::from_rupiah(70_000));
        assert_eq!(members[1].transaction_count, 2);

        assert_eq!(member_balance(&rows, " Siti "), Money::from_rupiah(70_000));
        assert_eq!(member_balance(&rows, "Joko"), Money::zero());
    }

    #[test]
    fn test_member_savings_effect() {
        let rows = sample();
        assert_eq!(member_savings_effect(&rows[3], "Siti"), Money::from_rupiah(100_000));
        assert_eq!(member_savings_effect(&rows[4], "Siti"), Money::from_rupiah(-30_000));
        assert_eq!(member_savings_effect(&rows[4], "Budi"), Money::zero());
        assert_eq!(member_savings_effect(&rows[0], "Siti"), Money::zero());
    }

    #[test]
    fn test_member_descriptions_round_trip() {
        assert_eq!(deposit_description("  Siti Aminah "), "Simpanan - Siti Aminah");
        assert_eq!(
            member_name_of(&withdrawal_description("Budi")),
            Some("Budi")
        );
        assert_eq!(member_name_of("Simpanan - "), None);
    }

    #[test]
    fn test_category_required_type() {
        assert_eq!(
            TransactionCategory::Sales.required_type(),
            Some(TransactionType::CashIn)
        );
        assert_eq!(TransactionCategory::Other.required_type(), None);
        assert_eq!(
            "member_withdrawal".parse::<TransactionCategory>().unwrap(),
            TransactionCategory::MemberWithdrawal
        );
        assert!("refund".parse::<TransactionType>().is_err());
    }
}
