//! # Seed Data Generator
//!
//! Populates the database with products (and their initial stock movements)
//! for one tenant, for development against the ledger API.
//!
//! ## Usage
//! ```bash
//! # 200 products for tenant "demo" (default)
//! cargo run -p tillpoint-db --bin seed
//!
//! # Custom amount, tenant and database
//! cargo run -p tillpoint-db --bin seed -- --count 1000 --tenant acme --db ./data/tillpoint.db
//! ```
//!
//! Each product has a realistic name, a price between 0.99 and 24.99 and an
//! initial stock between 0 and 99 recorded as an `in` movement.

use std::env;
use tillpoint_core::TenantScope;
use tillpoint_db::{Database, DbConfig, NewProduct};

/// Product families for realistic test data.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &["Cola", "Lemonade", "Orange Juice", "Mineral Water", "Iced Tea", "Energy Drink"],
    ),
    (
        "Bakery",
        &["Baguette", "Croissant", "Rye Bread", "Muffin", "Bagel"],
    ),
    (
        "Dairy",
        &["Milk", "Yogurt", "Butter", "Cheddar", "Cream Cheese"],
    ),
    (
        "Grocery",
        &["Pasta", "Rice", "Olive Oil", "Tomato Sauce", "Coffee Beans", "Tea Bags"],
    ),
];

/// Size variants and their price add-on in cents.
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 150), ("Large", 300), ("Family", 600)];

/// User id stamped on the initial-stock movements.
const SEED_USER: &str = "seed";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tillpoint_dev.db");
    let mut tenant = String::from("demo");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--count" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "-t" | "--tenant" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Tillpoint Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 200)");
                println!("  -t, --tenant <ID>    Tenant id to seed (default: demo)");
                println!("  -d, --db <PATH>      Database file path (default: ./tillpoint_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tillpoint Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let scope = TenantScope::Tenant(tenant.clone());
    let existing = db.products().count(&scope).await?;
    if existing > 0 {
        println!("⚠ Tenant {} already has {} products", tenant, existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (family_idx, (family, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = family_idx * 1000 + name_idx * 20 + size_idx;
                let product = generate_product(&tenant, family, name, size, *addon, seed);

                if let Err(e) = db.products().insert(&product, SEED_USER).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    println!();
    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    let sample = db.products().list(&scope, 3).await?;
    for p in &sample {
        println!("  {} | {} | stock {}", p.id, p.name, p.current_stock);
    }

    db.close().await;
    Ok(())
}

/// Builds one product with deterministic pseudo-random price and stock.
fn generate_product(
    tenant: &str,
    family: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    let base_price = 99 + ((seed * 37) % 1900) as i64;
    let sale_price_cents = base_price + price_addon;

    NewProduct {
        tenant_id: Some(tenant.to_string()),
        name: format!("{} {} ({})", name, size, family),
        barcode: Some(format!("200{:010}", seed)),
        sale_price_cents,
        purchase_price_cents: Some(sale_price_cents * 6 / 10),
        initial_stock: ((seed * 13) % 100) as i64,
        branch_id: None,
    }
}
