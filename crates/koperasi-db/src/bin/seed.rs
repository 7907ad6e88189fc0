//! # Demo Data Seeder
//!
//! Creates the demo accounts, categories, suppliers, products and a few
//! ledger rows.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p koperasi-db --bin seed
//!
//! # Specify database path
//! cargo run -p koperasi-db --bin seed -- --db ./data/koperasi.db
//! ```
//!
//! Every demo account (`developer`, `superadmin`, `admin`, `kasir`) uses the
//! password `password123`. Safe to run repeatedly.

use std::env;

use koperasi_db::seed::DEMO_PASSWORD;
use koperasi_db::{seed_demo_data, Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./data/koperasi.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Koperasi Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./data/koperasi.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Koperasi Demo Data Seeder");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let start = std::time::Instant::now();
    let report = seed_demo_data(&db).await?;

    if report.is_empty() {
        println!("⚠ Demo data already present, nothing to do.");
        return Ok(());
    }

    println!();
    println!("✓ Seeded in {:?}", start.elapsed());
    println!("  Accounts:     {}", report.users);
    println!("  Categories:   {}", report.categories);
    println!("  Suppliers:    {}", report.suppliers);
    println!("  Products:     {}", report.products);
    println!("  Transactions: {}", report.transactions);
    println!();
    println!("Log in as developer / superadmin / admin / kasir with '{}'.", DEMO_PASSWORD);

    db.close().await;
    Ok(())
}
