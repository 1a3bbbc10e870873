//! # Product Repository
//!
//! Catalog rows and the denormalized product stock.
//!
//! ## Stock Synchronization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock is never adjusted by deltas. Every ledger transaction  │
//! │  that touches a batch ends with:                                        │
//! │                                                                         │
//! │    UPDATE products                                                      │
//! │    SET stock = (SELECT SUM(current_stock) FROM product_batches ...)    │
//! │                                                                         │
//! │  so the aggregate always equals Σ batch.current_stock at commit.        │
//! │  A product crossing its min_stock on the way down queues `stock.low`.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::outbox::{self, topics};
use toko_core::input::NewProduct;
use toko_core::{Category, CoreError, Product};

const PRODUCT_COLUMNS: &str =
    "id, code, name, category_id, stock, min_stock, created_at, updated_at";

/// Product stock before and after a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSync {
    pub before: i64,
    pub after: i64,
    pub min_stock: i64,
}

impl StockSync {
    /// Stock went from above the threshold to at or below it.
    pub fn crossed_min_stock(&self) -> bool {
        self.min_stock > 0 && self.before > self.min_stock && self.after <= self.min_stock
    }
}

#[derive(Debug, Serialize)]
struct LowStockEvent<'a> {
    product_id: &'a str,
    stock: i64,
    min_stock: i64,
}

/// Loads a product inside `tx`.
pub async fn fetch_product(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<Product> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    product.ok_or_else(|| CoreError::not_found("product", id).into())
}

/// Rewrites `products.stock` from its batches and queues a low-stock event
/// when the product just crossed its threshold.
pub async fn sync_product_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    low_stock_alerts: bool,
) -> DbResult<StockSync> {
    let (before, min_stock): (i64, i64) =
        sqlx::query_as("SELECT stock, min_stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| DbError::from(CoreError::not_found("product", product_id)))?;

    let after: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(current_stock), 0) FROM product_batches WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(after)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

    let sync = StockSync {
        before,
        after,
        min_stock,
    };

    debug!(product_id = %product_id, before, after, "Product stock synced");

    if low_stock_alerts && sync.crossed_min_stock() {
        info!(product_id = %product_id, stock = after, min_stock, "Product reached minimum stock");
        outbox::enqueue(
            tx,
            topics::STOCK_LOW,
            "product",
            product_id,
            &LowStockEvent {
                product_id,
                stock: after,
                min_stock,
            },
        )
        .await?;
    }

    Ok(sync)
}

/// Repository for product and category rows.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product with zero stock. Stock only arrives through batches.
    pub async fn insert(&self, input: &NewProduct) -> DbResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            code: input
                .code
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            name: input.name.trim().to_string(),
            category_id: input.category_id.clone(),
            stock: 0,
            min_stock: input.min_stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, category_id, stock, min_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn insert_category(&self, name: &str) -> DbResult<Category> {
        toko_core::validation::validate_name("name", name).map_err(CoreError::from)?;

        let category = Category {
            id: new_id(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Looks a product up by its SKU.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Products at or below a positive `min_stock`, emptiest first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE min_stock > 0 AND stock <= min_stock \
             ORDER BY stock ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_batch, seed_product, seed_supplier, test_db, ts};
    use toko_core::Variant;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let repo = db.products();
        let category = repo.insert_category("Aksesoris").await.unwrap();

        let product = repo
            .insert(&NewProduct {
                code: Some(" CBL-USBC ".into()),
                name: "Kabel USB-C".into(),
                category_id: Some(category.id.clone()),
                min_stock: 2,
            })
            .await
            .unwrap();

        assert_eq!(product.stock, 0);
        let found = repo.get_by_code("CBL-USBC").await.unwrap().unwrap();
        assert_eq!(found.id, product.id);
        assert_eq!(found.category_id.as_deref(), Some(category.id.as_str()));
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.products();
        let input = NewProduct {
            code: Some("SKU-1".into()),
            name: "Casing".into(),
            category_id: None,
            min_stock: 0,
        };
        repo.insert(&input).await.unwrap();
        let err = repo.insert(&input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_sync_queues_low_stock_once() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sinar").await;
        let product = seed_product(&db, "Charger", 3).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 1_000, 5, ts(1)).await;

        sqlx::query("UPDATE product_batches SET current_stock = 3 WHERE id = ?1")
            .bind(&batch.id)
            .execute(db.pool())
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let sync = sync_product_stock(&mut tx, &product.id, true).await.unwrap();
        assert_eq!(sync, StockSync { before: 5, after: 3, min_stock: 3 });
        // Already below: no second event
        let again = sync_product_stock(&mut tx, &product.id, true).await.unwrap();
        assert!(!again.crossed_min_stock());
        tx.commit().await.unwrap();

        assert_eq!(db.outbox().get_pending_by_topic(topics::STOCK_LOW, 10).await.unwrap().len(), 1);
        let low = db.products().list_low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].stock, 3);
    }
}
