//! Fixtures shared by the repository tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::pool::{Database, DbConfig};
use crate::repository::batch::insert_batch;
use crate::repository::new_id;
use crate::repository::product::sync_product_stock;
use toko_core::checkout::{NewSale, SaleLine, TenderLine};
use toko_core::input::NewProduct;
use toko_core::{Member, Product, ProductBatch, Supplier, Variant};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Day `n` after 2024-01-01, for ordering batches.
pub fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::days(i64::from(day))
}

pub async fn seed_supplier(db: &Database, name: &str) -> Supplier {
    db.suppliers().insert(name, None).await.unwrap()
}

pub async fn seed_product(db: &Database, name: &str, min_stock: i64) -> Product {
    db.products()
        .insert(&NewProduct {
            code: None,
            name: name.to_string(),
            category_id: None,
            min_stock,
        })
        .await
        .unwrap()
}

pub async fn seed_member(db: &Database, debt: i64, credit_limit: i64) -> Member {
    let id = new_id();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO members (id, name, phone, debt, credit_limit, created_at, updated_at) \
         VALUES (?1, 'Budi', NULL, ?2, ?3, ?4, ?4)",
    )
    .bind(&id)
    .bind(debt)
    .bind(credit_limit)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    db.members().get_by_id(&id).await.unwrap().unwrap()
}

/// Inserts a batch holding `stock` units and resyncs the product, without
/// low-stock events.
pub async fn seed_batch(
    db: &Database,
    product_id: &str,
    supplier_id: &str,
    variant: Variant,
    buy_price: i64,
    stock: i64,
    created_at: DateTime<Utc>,
) -> ProductBatch {
    let batch = ProductBatch {
        id: new_id(),
        product_id: product_id.to_string(),
        variant,
        supplier_id: Some(supplier_id.to_string()),
        supplier_name: None,
        buy_price,
        sell_price: buy_price + buy_price / 4,
        initial_stock: stock,
        current_stock: stock,
        created_at,
        updated_at: created_at,
    };

    let mut tx = db.pool().begin().await.unwrap();
    insert_batch(&mut tx, &batch).await.unwrap();
    sync_product_stock(&mut tx, product_id, false).await.unwrap();
    tx.commit().await.unwrap();

    batch
}

pub async fn batch_stock(db: &Database, batch_id: &str) -> i64 {
    sqlx::query_scalar("SELECT current_stock FROM product_batches WHERE id = ?1")
        .bind(batch_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

pub async fn product_stock(db: &Database, product_id: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

pub async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

pub fn sale_line(product_id: &str, qty: i64, price: i64) -> SaleLine {
    SaleLine {
        product_id: product_id.to_string(),
        variant: Variant::standard(),
        qty,
        price,
    }
}

pub fn tender(method: &str, amount: i64) -> TenderLine {
    TenderLine {
        method: method.to_string(),
        amount,
        method_id: None,
        variant_id: None,
        reference: None,
    }
}

pub fn sale_input(items: Vec<SaleLine>, payments: Vec<TenderLine>) -> NewSale {
    NewSale {
        user_id: "kasir-1".to_string(),
        member_id: None,
        items,
        payments,
        discount_amount: 0,
        notes: None,
    }
}

/// Ledger-wide invariants that must hold after any committed operation.
pub async fn assert_invariants(db: &Database) {
    assert!(db.batches().audit_stock().await.unwrap().is_empty(), "product stock drifted from batches");

    let negative: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_batches WHERE current_stock < 0")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(negative, 0, "negative batch stock");

    let mismatched: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM sales s
        WHERE s.total_amount <> (SELECT COALESCE(SUM(subtotal), 0) FROM sale_items WHERE sale_id = s.id)
        "#,
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(mismatched, 0, "sale total differs from its items");

    let over_limit: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM members WHERE credit_limit > 0 AND debt > credit_limit",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(over_limit, 0, "member debt over credit limit");
}
