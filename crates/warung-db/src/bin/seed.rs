//! # Seed Data Generator
//!
//! Fills a database with a pempek shop's catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Built-in catalogue into ./warung_dev.db
//! cargo run -p warung-db --bin seed
//!
//! # Products from a JSON file (array of {name, stock, price, category?, image_url?})
//! cargo run -p warung-db --bin seed -- --file products.json
//!
//! # Also record a sample sale and expense
//! cargo run -p warung-db --bin seed -- --db ./data/warung.db --with-history
//! ```

use chrono::{Duration, Utc};
use std::env;
use warung_core::{CartLine, NewExpense, NewProduct, Session};
use warung_db::{Database, DbConfig};

/// (name, stock, price, category)
const CATALOGUE: &[(&str, i64, i64, &str)] = &[
    ("Pempek Kapal Selam", 12, 15_000, "Pempek"),
    ("Pempek Lenjer", 30, 8_000, "Pempek"),
    ("Pempek Adaan", 25, 5_000, "Pempek"),
    ("Pempek Kulit", 40, 3_000, "Pempek"),
    ("Pempek Telur Kecil", 35, 4_000, "Pempek"),
    ("Pempek Pistel", 4, 5_000, "Pempek"),
    ("Tekwan", 10, 15_000, "Kuah"),
    ("Model", 8, 17_000, "Kuah"),
    ("Celimpungan", 3, 17_000, "Kuah"),
    ("Cuko Botol 250ml", 20, 10_000, "Cuko"),
    ("Es Kacang Merah", 15, 12_000, "Minuman"),
    ("Es Teh Manis", 50, 4_000, "Minuman"),
    ("Kerupuk Kemplang", 0, 20_000, ""),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./warung_dev.db");
    let mut file: Option<String> = None;
    let mut with_history = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    file = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--with-history" => with_history = true,
            "--help" | "-h" => {
                println!("Warung Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./warung_dev.db)");
                println!("  -f, --file <PATH>   Load products from a JSON array instead");
                println!("      --with-history  Record a sample sale and expense");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Unknown option: {}", other);
                return Ok(());
            }
        }
        i += 1;
    }

    let products = match &file {
        Some(path) => serde_json::from_str::<Vec<NewProduct>>(&std::fs::read_to_string(path)?)?,
        None => CATALOGUE
            .iter()
            .map(|(name, stock, price, category)| NewProduct {
                name: name.to_string(),
                stock: *stock,
                price: *price,
                category: Some(category.to_string()),
                image_url: None,
            })
            .collect(),
    };

    println!("🌱 Warung Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", products.len());
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut inserted = Vec::with_capacity(products.len());
    for input in &products {
        match db.products().insert(input).await {
            Ok(product) => inserted.push(product),
            Err(e) => eprintln!("Failed to insert {}: {}", input.name, e),
        }
    }
    println!("✓ Inserted {} products", inserted.len());

    if with_history {
        let session = Session::new("seed");

        let items: Vec<CartLine> = inserted
            .iter()
            .filter(|p| p.stock >= 2)
            .take(3)
            .map(|p| CartLine::from_product(p, 2))
            .collect();
        if !items.is_empty() {
            let total = items.iter().map(|l| l.line_total().units()).sum();
            let sale = db.sales().execute(&session, &items, total).await?;
            println!("✓ Sample sale {} ({})", sale.id, sale.total_money());
        }

        let expense = db
            .transactions()
            .record_expense(
                &session,
                &NewExpense {
                    note: "Ikan tenggiri 3kg".to_string(),
                    amount: 210_000,
                    occurred_at: Utc::now() - Duration::days(1),
                },
            )
            .await?;
        println!("✓ Sample expense {} ({})", expense.id, expense.total_money());
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
