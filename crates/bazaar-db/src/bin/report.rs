//! # Dashboard Report
//!
//! Prints the profit report, total debt and best sellers as JSON.
//!
//! ## Usage
//! ```bash
//! # Uses BAZAAR_DB_PATH (default ./bazaar.db)
//! cargo run -p bazaar-db --bin report
//!
//! # Specify database path
//! cargo run -p bazaar-db --bin report -- --db ./bazaar_dev.db
//! ```
//!
//! Windows are computed in the machine's local timezone.

use bazaar_core::report::ProfitReport;
use bazaar_core::{Money, TopProduct};
use bazaar_db::{AppConfig, Database};
use chrono::Local;
use serde::Serialize;
use std::env;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    generated_at: String,
    profit: ProfitReport,
    total_debt: Money,
    top_products: Vec<TopProduct>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bazaar=debug,sqlx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Dashboard Report");
                println!();
                println!("Usage: report [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $BAZAAR_DB_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let db = Database::new(config.db_config()).await?;
    let now = Local::now();

    let dashboard = Dashboard {
        generated_at: now.to_rfc3339(),
        profit: db.profit_report(&now).await?,
        total_debt: db.total_debt().await?,
        top_products: db.top_products(config.top_products_limit).await?,
    };

    println!("{}", serde_json::to_string_pretty(&dashboard)?);

    db.close().await;
    Ok(())
}
