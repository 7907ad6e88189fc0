//! # Repository Module
//!
//! Database repository implementations for the koperasi store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().adjust_stock(id, &input, actor)                 │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── BEGIN                                                             │
//! │  ├── UPDATE products ...          ← the change                         │
//! │  ├── INSERT stock_movements ...   ← its audit row                      │
//! │  ├── INSERT activity_logs ...     ← who did it                         │
//! │  └── COMMIT                       ← all three, or none                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and login
//! - [`CategoryRepository`](category::CategoryRepository) - Product categories
//! - [`SupplierRepository`](supplier::SupplierRepository) - Goods suppliers
//! - [`ProductRepository`](product::ProductRepository) - Products and stock movements
//! - [`OrderRepository`](order::OrderRepository) - Checkout write group and receipts
//! - [`TransactionRepository`](transaction::TransactionRepository) - Cash ledger
//! - [`MemberRepository`](member::MemberRepository) - Member savings
//! - [`ActivityRepository`](activity::ActivityRepository) - Audit trail
//! - [`ReportRepository`](report::ReportRepository) - Dashboard and charts

use sqlx::{QueryBuilder, Sqlite};

use koperasi_core::period::DateRange;

pub mod activity;
pub mod category;
pub mod member;
pub mod order;
pub mod product;
pub mod report;
pub mod supplier;
pub mod transaction;
pub mod user;

/// Appends `AND column >= start AND column < end` for the bounded sides.
pub(crate) fn push_range(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, range: &DateRange) {
    if let Some(start) = range.start {
        qb.push(format!(" AND {} >= ", column)).push_bind(start);
    }
    if let Some(end) = range.end {
        qb.push(format!(" AND {} < ", column)).push_bind(end);
    }
}

/// Trims optional text, mapping blank to `None`.
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod testing {
    use koperasi_core::input::CreateUserInput;
    use koperasi_core::{Role, User};

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn test_user(db: &Database, username: &str, role: Role) -> User {
        db.users()
            .create(
                &CreateUserInput {
                    username: username.to_string(),
                    email: format!("{}@koperasi.test", username),
                    full_name: format!("User {}", username),
                    password: "password123".to_string(),
                    role,
                },
                None,
            )
            .await
            .unwrap()
    }
}
