//! # Seed Data Generator
//!
//! Populates the database with a small shop for development: categories,
//! products, customers, and orders in every payment status.
//!
//! ## Usage
//! ```bash
//! # 8 customers (default)
//! cargo run -p bazaar-db --bin seed
//!
//! # Custom amount
//! cargo run -p bazaar-db --bin seed -- --customers 25
//!
//! # Specify database path
//! cargo run -p bazaar-db --bin seed -- --db ./data/bazaar.db
//! ```
//!
//! ## Generated Orders
//! Customer `i` gets one order cycling through:
//! ```text
//! i % 4 == 0  → pending
//! i % 4 == 1  → partially paid (a third of the total)
//! i % 4 == 2  → paid in full
//! i % 4 == 3  → pending, plus a second order that is created and reversed
//! ```

use bazaar_core::order::{OrderLineRequest, OrderRequest};
use bazaar_core::{Gender, Money, NewProduct, Product};
use bazaar_db::{Database, DbConfig};
use std::env;
use tracing_subscriber::EnvFilter;

/// Categories and their products: (name, price, cost, gender).
const CATALOG: &[(&str, &[(&str, i64, i64, Option<Gender>)])] = &[
    (
        "Shirts",
        &[
            ("Linen Shirt", 4500, 2600, Some(Gender::Male)),
            ("Silk Blouse", 6200, 3900, Some(Gender::Female)),
            ("Oxford Shirt", 3900, 2200, Some(Gender::Male)),
        ],
    ),
    (
        "Shoes",
        &[
            ("Leather Loafers", 12000, 7800, Some(Gender::Male)),
            ("Canvas Sneakers", 5500, 3000, None),
            ("Ankle Boots", 9800, 6100, Some(Gender::Female)),
        ],
    ),
    (
        "Accessories",
        &[
            ("Wool Scarf", 2500, 1100, None),
            ("Leather Belt", 3200, 1700, Some(Gender::Male)),
            ("Canvas Tote", 1800, 700, Some(Gender::Female)),
        ],
    ),
];

const FIRST_NAMES: &[&str] = &[
    "Rima", "Karim", "Nour", "Hadi", "Lina", "Omar", "Maya", "Sami", "Yara", "Fadi",
];

const LAST_NAMES: &[&str] = &["Haddad", "Khoury", "Saleh", "Nassar", "Aoun", "Fares"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bazaar=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let mut customers: usize = 8;
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--customers" | "-n" => {
                if i + 1 < args.len() {
                    customers = args[i + 1].parse().unwrap_or(8);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --customers <N>  Number of customers to generate (default: 8)");
                println!("  -d, --db <PATH>      Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar Seed Data Generator");
    println!("=============================");
    println!("Database:  {}", db_path);
    println!("Customers: {}", customers);
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

    // ---- catalog ----
    println!();
    println!("Creating catalog...");

    let mut products: Vec<Product> = Vec::new();
    for (category_name, items) in CATALOG {
        let category = db.categories().insert(category_name, None).await?;

        for (idx, (name, price, cost, gender)) in items.iter().enumerate() {
            let product = db
                .products()
                .insert(&NewProduct {
                    name: name.to_string(),
                    quantity: 20 + (idx as i64) * 10,
                    price: Money::from_cents(*price),
                    initial_price: Money::from_cents(*cost),
                    gender: *gender,
                    category_id: Some(category.id.clone()),
                    images: vec![format!(
                        "https://img.example.com/{}.jpg",
                        name.to_lowercase().replace(' ', "-")
                    )],
                })
                .await?;
            products.push(product);
        }

        println!("  {} ({} products)", category_name, items.len());
    }

    // ---- customers and orders ----
    println!();
    println!("Creating customers and orders...");

    let start = std::time::Instant::now();
    let mut orders = 0;

    for n in 0..customers {
        let full_name = format!(
            "{} {}",
            FIRST_NAMES[n % FIRST_NAMES.len()],
            LAST_NAMES[n % LAST_NAMES.len()]
        );
        let phone_number = format!("70{:06}", 100_000 + n);
        let opening_debt = Money::from_cents(if n % 3 == 0 { 1500 } else { 0 });

        let customer = match db
            .customers()
            .insert(&full_name, &phone_number, opening_debt)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to insert {}: {}", full_name, e);
                continue;
            }
        };

        let first = &products[n % products.len()];
        let second = &products[(n * 3 + 1) % products.len()];
        let request = OrderRequest {
            customer_id: customer.id.clone(),
            lines: vec![
                OrderLineRequest {
                    product_id: first.id.clone(),
                    quantity: 1 + (n % 2) as i64,
                    unit_price: first.price,
                },
                OrderLineRequest {
                    product_id: second.id.clone(),
                    quantity: 1,
                    unit_price: second.price,
                },
            ],
            total: None,
        };

        let order = match db.orders().create_order(&request).await {
            Ok(order) => order,
            Err(e) => {
                eprintln!("Failed to create order for {}: {}", full_name, e);
                continue;
            }
        };
        orders += 1;

        match n % 4 {
            1 => {
                let third = Money::from_cents(order.total.cents() / 3);
                db.orders().apply_partial_payment(&order.id, third).await?;
            }
            2 => {
                db.orders().mark_fully_paid(&order.id).await?;
            }
            3 => {
                let reversed = db.orders().create_order(&request).await?;
                db.orders().delete_order(&reversed.id).await?;
            }
            _ => {}
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Created {} orders in {:?}", orders, elapsed);

    // ---- verify ----
    println!();
    println!("Verifying balances...");
    let drifted = db.audit_all().await?;
    println!("  Total debt: {}", db.total_debt().await?);
    println!("  Customers with drift: {}", drifted.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
