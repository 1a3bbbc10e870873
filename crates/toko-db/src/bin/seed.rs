//! # Demo Ledger Seeder
//!
//! Builds a small, consistent ledger for development: suppliers, a catalog,
//! purchases received through the intake engine, a member and a few sales.
//!
//! ## Usage
//! ```bash
//! # Use TOKO_DATABASE_PATH (default ./toko.db)
//! cargo run -p toko-db --bin seed
//!
//! # Specify database path
//! cargo run -p toko-db --bin seed -- --db ./data/toko_dev.db
//! ```
//!
//! Every stock movement goes through the same engines the register uses, so
//! the seeded database satisfies the ledger invariants.

use std::env;
use std::path::PathBuf;
use toko_core::checkout::{NewSale, SaleLine, TenderLine};
use toko_core::input::{NewMember, NewProduct, NewPurchase, PurchaseLine};
use toko_core::Variant;
use toko_db::{Database, LedgerConfig};
use tracing_subscriber::EnvFilter;

/// `(code, name, min_stock, [(variant, buy, sell, qty)])`
type CatalogEntry = (&'static str, &'static str, i64, &'static [(&'static str, i64, i64, i64)]);

const SUPPLIERS: &[(&str, &str)] = &[
    ("PT Sinar Elektronik", "021-5550101"),
    ("CV Maju Aksesoris", "022-5550202"),
];

const CATALOG: &[CatalogEntry] = &[
    ("CHG-20W", "Charger 20W", 3, &[("Standard", 45_000, 75_000, 20)]),
    ("CBL-USBC", "Kabel USB-C 1m", 5, &[("Standard", 12_000, 25_000, 40)]),
    (
        "CSE-A15",
        "Softcase A15",
        2,
        &[("Hitam", 8_000, 20_000, 10), ("Bening", 7_500, 18_000, 15)],
    ),
    ("TG-A15", "Tempered Glass A15", 5, &[("Standard", 5_000, 15_000, 30)]),
    ("PB-10K", "Powerbank 10000mAh", 2, &[("Standard", 110_000, 165_000, 8)]),
];

fn tender(method: &str, amount: i64) -> TenderLine {
    TenderLine {
        method: method.to_string(),
        amount,
        method_id: None,
        variant_id: None,
        reference: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = LedgerConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Toko Demo Ledger Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: TOKO_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Toko Demo Ledger Seeder");
    println!("==========================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::open(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Suppliers and catalog
    let mut suppliers = Vec::with_capacity(SUPPLIERS.len());
    for (name, phone) in SUPPLIERS {
        suppliers.push(db.suppliers().insert(name, Some(*phone)).await?);
    }
    let category = db.products().insert_category("Aksesoris HP").await?;

    let mut products = Vec::with_capacity(CATALOG.len());
    for (code, name, min_stock, _) in CATALOG {
        let product = db
            .products()
            .insert(&NewProduct {
                code: Some(code.to_string()),
                name: name.to_string(),
                category_id: Some(category.id.clone()),
                min_stock: *min_stock,
            })
            .await?;
        products.push(product);
    }
    println!("✓ {} suppliers, {} products", suppliers.len(), products.len());

    // Purchases, alternating suppliers
    let mut received = 0;
    for (idx, supplier) in suppliers.iter().enumerate() {
        let items: Vec<PurchaseLine> = CATALOG
            .iter()
            .zip(&products)
            .enumerate()
            .filter(|(n, _)| n % suppliers.len() == idx)
            .flat_map(|(_, ((_, _, _, lots), product))| {
                lots.iter().map(move |(variant, buy, sell, qty)| PurchaseLine {
                    product_id: product.id.clone(),
                    variant: Variant::from(*variant),
                    qty: *qty,
                    buy_price: *buy,
                    sell_price: *sell,
                })
            })
            .collect();

        if items.is_empty() {
            continue;
        }

        db.purchases()
            .create_purchase(&NewPurchase {
                supplier_id: supplier.id.clone(),
                user_id: "seed".to_string(),
                invoice_number: Some(format!("INV-SEED-{:03}", idx + 1)),
                items,
                notes: Some("Initial stock".to_string()),
            })
            .await?;
        received += 1;
    }
    println!("✓ {} purchases received", received);

    // A member with credit and two sales
    let member = db
        .members()
        .insert(&NewMember {
            name: "Budi Santoso".to_string(),
            phone: Some("0812-0000-1111".to_string()),
            credit_limit: 500_000,
        })
        .await?;

    let cash = db
        .sales()
        .create_sale(&NewSale {
            user_id: "seed".to_string(),
            member_id: None,
            items: vec![
                SaleLine {
                    product_id: products[0].id.clone(),
                    variant: Variant::standard(),
                    qty: 1,
                    price: 75_000,
                },
                SaleLine {
                    product_id: products[1].id.clone(),
                    variant: Variant::standard(),
                    qty: 2,
                    price: 25_000,
                },
            ],
            payments: vec![tender("cash", 150_000)],
            discount_amount: 5_000,
            notes: None,
        })
        .await?;

    let tempo = db
        .sales()
        .create_sale(&NewSale {
            user_id: "seed".to_string(),
            member_id: Some(member.id.clone()),
            items: vec![SaleLine {
                product_id: products[4].id.clone(),
                variant: Variant::standard(),
                qty: 1,
                price: 165_000,
            }],
            payments: vec![tender("cash", 65_000), tender("tempo", 100_000)],
            discount_amount: 0,
            notes: None,
        })
        .await?;

    println!(
        "✓ Sales: {} (change {}), {} ({:?})",
        cash.sale_id, cash.change_amount, tempo.sale_id, tempo.payment_status
    );

    let drift = db.batches().audit_stock().await?;
    let pending = db.outbox().count_pending().await?;
    println!();
    println!("Ledger check: {} drifted products, {} outbox events pending", drift.len(), pending);

    db.close().await;
    Ok(())
}
