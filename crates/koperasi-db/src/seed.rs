//! # Demo Data
//!
//! Populates a fresh database with accounts, reference data, products and a
//! handful of ledger rows so every screen has something to show.
//!
//! ## Idempotency
//! ```text
//! accounts      skipped per username
//! categories    skipped per name
//! suppliers     skipped per name
//! products      skipped per SKU
//! transactions  only written while the ledger is empty
//! ```
//! Running the seed twice leaves the database as the first run did.

use tracing::info;

use koperasi_core::input::{
    CategoryInput, CreateProductInput, CreateUserInput, MemberMovementInput, SupplierInput,
    TransactionInput,
};
use koperasi_core::ledger::{TransactionCategory, TransactionType};
use koperasi_core::{PaymentMethod, Role};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::transaction::TransactionFilter;

/// Password of every demo account.
pub const DEMO_PASSWORD: &str = "password123";

const ACCOUNTS: &[(&str, &str, Role)] = &[
    ("developer", "Developer", Role::Developer),
    ("superadmin", "Super Admin", Role::SuperAdmin),
    ("admin", "Admin Koperasi", Role::Admin),
    ("kasir", "Kasir Koperasi", Role::Kasir),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("Sembako", "Beras, gula, minyak dan kebutuhan pokok"),
    ("Minuman", "Air mineral, teh, kopi"),
    ("Makanan Ringan", "Biskuit dan camilan"),
    ("Kebutuhan Rumah", "Sabun, deterjen, perlengkapan rumah tangga"),
];

const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("CV Sumber Tani", "Pak Budi", "0812-1111-2222"),
    ("UD Makmur Jaya", "Bu Rina", "0813-3333-4444"),
];

/// (sku, name, category, supplier index, purchase, selling, stock, min, unit)
type ProductSeed = (
    &'static str,
    &'static str,
    &'static str,
    usize,
    i64,
    i64,
    i64,
    i64,
    &'static str,
);

const PRODUCTS: &[ProductSeed] = &[
    ("BRS-5KG", "Beras Premium 5kg", "Sembako", 0, 62_000, 68_000, 40, 10, "karung"),
    ("GULA-1KG", "Gula Pasir 1kg", "Sembako", 0, 14_500, 16_000, 60, 15, "kg"),
    ("MNY-GRG-1L", "Minyak Goreng 1L", "Sembako", 1, 15_000, 17_500, 48, 12, "botol"),
    ("TLR-10", "Telur Ayam 10 butir", "Sembako", 0, 21_000, 24_000, 20, 5, "pack"),
    ("AIR-600ML", "Air Mineral 600ml", "Minuman", 1, 2_500, 3_500, 120, 24, "botol"),
    ("TEH-KTK", "Teh Kotak 200ml", "Minuman", 1, 3_200, 4_500, 3, 12, "kotak"),
    ("BSK-CKL", "Biskuit Cokelat", "Makanan Ringan", 1, 7_000, 9_000, 30, 6, "bungkus"),
    ("SBN-MND", "Sabun Mandi", "Kebutuhan Rumah", 1, 3_000, 4_000, 36, 6, "pcs"),
];

/// What one seed run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub categories: usize,
    pub suppliers: usize,
    pub products: usize,
    pub transactions: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == SeedReport::default()
    }
}

/// Seeds demo data, skipping whatever already exists.
pub async fn seed_demo_data(db: &Database) -> DbResult<SeedReport> {
    let mut report = SeedReport::default();

    // Accounts
    for (username, full_name, role) in ACCOUNTS {
        if db.users().get_by_username(username).await?.is_some() {
            continue;
        }
        db.users()
            .create(
                &CreateUserInput {
                    username: username.to_string(),
                    email: format!("{}@koperasi.local", username),
                    full_name: full_name.to_string(),
                    password: DEMO_PASSWORD.to_string(),
                    role: *role,
                },
                None,
            )
            .await?;
        report.users += 1;
    }

    let actor = db
        .users()
        .get_by_username("admin")
        .await?
        .ok_or_else(|| DbError::not_found("User", "admin"))?;

    // Reference data
    let mut categories = db.categories().list().await?;
    for (name, description) in CATEGORIES {
        if categories.iter().any(|c| c.name == *name) {
            continue;
        }
        let created = db
            .categories()
            .create(
                &CategoryInput {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                },
                &actor.id,
            )
            .await?;
        categories.push(created);
        report.categories += 1;
    }

    let mut suppliers = db.suppliers().list(None).await?;
    for (name, contact, phone) in SUPPLIERS {
        if suppliers.iter().any(|s| s.name == *name) {
            continue;
        }
        let created = db
            .suppliers()
            .create(
                &SupplierInput {
                    name: name.to_string(),
                    contact_person: Some(contact.to_string()),
                    phone: Some(phone.to_string()),
                    email: None,
                    address: None,
                },
                &actor.id,
            )
            .await?;
        suppliers.push(created);
        report.suppliers += 1;
    }

    // Products
    for (sku, name, category, supplier, purchase, selling, stock, min_stock, unit) in PRODUCTS {
        if db.products().get_by_sku(sku).await?.is_some() {
            continue;
        }
        let category_id = categories.iter().find(|c| c.name == *category).map(|c| c.id.clone());
        let supplier_id = SUPPLIERS
            .get(*supplier)
            .and_then(|(supplier_name, _, _)| suppliers.iter().find(|s| s.name == *supplier_name))
            .map(|s| s.id.clone());

        db.products()
            .create(
                &CreateProductInput {
                    sku: sku.to_string(),
                    name: name.to_string(),
                    description: None,
                    category_id,
                    supplier_id,
                    purchase_price: *purchase,
                    selling_price: *selling,
                    stock: *stock,
                    min_stock: *min_stock,
                    unit: unit.to_string(),
                },
                &actor.id,
            )
            .await?;
        report.products += 1;
    }

    // Ledger
    let existing = db
        .transactions()
        .list(&TransactionFilter {
            limit: Some(1),
            ..Default::default()
        })
        .await?;
    if existing.is_empty() {
        let supplier_id = suppliers.first().map(|s| s.id.clone());
        report.transactions = seed_ledger(db, &actor.id, supplier_id).await?;
    }

    info!(?report, "Demo data seeded");
    Ok(report)
}

async fn seed_ledger(
    db: &Database,
    actor_id: &str,
    supplier_id: Option<String>,
) -> DbResult<usize> {
    let manual = [
        TransactionInput {
            transaction_type: TransactionType::CashIn,
            category: TransactionCategory::Other,
            amount: 5_000_000,
            description: "Modal awal koperasi".to_string(),
            notes: None,
            payment_method: Some(PaymentMethod::Transfer),
            supplier_id: None,
        },
        TransactionInput {
            transaction_type: TransactionType::CashOut,
            category: TransactionCategory::Purchase,
            amount: 1_240_000,
            description: "Pembelian beras 20 karung".to_string(),
            notes: None,
            payment_method: Some(PaymentMethod::Transfer),
            supplier_id,
        },
        TransactionInput {
            transaction_type: TransactionType::CashOut,
            category: TransactionCategory::Operational,
            amount: 350_000,
            description: "Bayar listrik bulanan".to_string(),
            notes: None,
            payment_method: Some(PaymentMethod::Cash),
            supplier_id: None,
        },
    ];
    for input in &manual {
        db.transactions().create(input, actor_id).await?;
    }

    db.members()
        .deposit(
            &MemberMovementInput {
                member_name: "Siti Aminah".to_string(),
                amount: 500_000,
                notes: Some("Simpanan wajib".to_string()),
                payment_method: Some(PaymentMethod::Cash),
            },
            actor_id,
        )
        .await?;
    db.members()
        .withdraw(
            &MemberMovementInput {
                member_name: "Siti Aminah".to_string(),
                amount: 100_000,
                notes: None,
                payment_method: Some(PaymentMethod::Cash),
            },
            actor_id,
        )
        .await?;

    Ok(manual.len() + 2)
}

// =============================================================================
// Unit Tests
// =============================================================================
