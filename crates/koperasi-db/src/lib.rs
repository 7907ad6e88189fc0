//! # koperasi-db: Database Layer for the Koperasi Store
//!
//! This crate provides database access for the cooperative store backend.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Koperasi Store Data Flow                           │
//! │                                                                         │
//! │  HTTP handler (POST /api/pos/checkout)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   koperasi-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ ProductRepo   │    │ 001_initial_ │  │   │
//! │  │   │ Connection    │◄───│ OrderRepo     │    │ schema.sql   │  │   │
//! │  │   │ Management    │    │ LedgerRepo .. │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                  ./data/koperasi.db                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`credentials`] - Password hashing
//! - [`seed`] - Demo data
//!
//! ## Usage
//!
//! ```rust,ignore
//! use koperasi_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/koperasi.db")).await?;
//!
//! let user = db.users().authenticate("kasir", "password123").await?;
//! let low = db.products().low_stock(20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credentials;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use seed::{seed_demo_data, SeedReport};

// Repository re-exports for convenience
pub use repository::activity::{ActivityFilter, ActivityRepository};
pub use repository::category::CategoryRepository;
pub use repository::member::MemberRepository;
pub use repository::order::OrderRepository;
pub use repository::product::{ProductFilter, ProductRepository};
pub use repository::report::ReportRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::transaction::{TransactionFilter, TransactionRepository};
pub use repository::user::UserRepository;
