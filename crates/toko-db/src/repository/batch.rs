//! # Batch Store
//!
//! Procurement lots and every mutation of their stock.
//!
//! ## Mutation Helpers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  All helpers take `&mut Transaction<'_, Sqlite>`; none takes a pool.   │
//! │                                                                         │
//! │  decrement_batch   current -= q   WHERE current >= q                    │
//! │  increment_batch   current += q   (initial += q for intake)             │
//! │  reverse_intake    current -= q, initial -= q   WHERE both >= q         │
//! │  insert_batch      new lot                                              │
//! │                                                                         │
//! │  A guarded UPDATE matching 0 rows after the caller already read the    │
//! │  batch in the same transaction → ConcurrencyConflict.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! FIFO order is decided in Rust by [`toko_core::fifo`], not by SQL text
//! ordering of timestamps.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::activity::{self, ActivityEntry, SYSTEM_USER};
use crate::repository::product::sync_product_stock;
use toko_core::fifo::{self, Allocation};
use toko_core::{CoreError, ProductBatch, Variant};

pub(crate) const BATCH_COLUMNS: &str = "id, product_id, variant, supplier_id, supplier_name, \
                                        buy_price, sell_price, initial_stock, current_stock, \
                                        created_at, updated_at";

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a batch inside `tx`.
pub async fn fetch_batch(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<ProductBatch> {
    let batch = sqlx::query_as::<_, ProductBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM product_batches WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    batch.ok_or_else(|| CoreError::not_found("product_batch", id).into())
}

/// Every batch of one `(product, variant)` group, empty ones included.
pub async fn fetch_group(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    variant: &Variant,
) -> DbResult<Vec<ProductBatch>> {
    let batches = sqlx::query_as::<_, ProductBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM product_batches \
         WHERE product_id = ?1 AND variant = ?2 \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(product_id)
    .bind(variant.as_str())
    .fetch_all(&mut **tx)
    .await?;

    Ok(batches)
}

/// FIFO allocation against the batches as seen by `tx`.
pub async fn allocate_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    variant: &Variant,
    quantity: i64,
) -> DbResult<Vec<(Allocation, ProductBatch)>> {
    let group = fetch_group(tx, product_id, variant).await?;
    let views: Vec<_> = group.iter().map(ProductBatch::stock_view).collect();
    let plan = fifo::allocate_fifo(product_id, variant, quantity, &views)?;

    let mut out = Vec::with_capacity(plan.len());
    for allocation in plan {
        if let Some(batch) = group.iter().find(|b| b.id == allocation.batch_id) {
            out.push((allocation, batch.clone()));
        }
    }
    Ok(out)
}

/// Takes `qty` out of a batch. Never lets `current_stock` go negative.
pub async fn decrement_batch(
    tx: &mut Transaction<'_, Sqlite>,
    batch_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE product_batches
        SET current_stock = current_stock - ?2, updated_at = ?3
        WHERE id = ?1 AND current_stock >= ?2
        "#,
    )
    .bind(batch_id)
    .bind(qty)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("product_batch", batch_id).into());
    }

    debug!(batch_id = %batch_id, qty, "Batch decremented");
    Ok(())
}

/// Adds `qty` to a batch; intake also grows `initial_stock`.
pub async fn increment_batch(
    tx: &mut Transaction<'_, Sqlite>,
    batch_id: &str,
    qty: i64,
    intake: bool,
) -> DbResult<()> {
    let initial_delta = if intake { qty } else { 0 };

    let result = sqlx::query(
        r#"
        UPDATE product_batches
        SET current_stock = current_stock + ?2,
            initial_stock = initial_stock + ?3,
            updated_at = ?4
        WHERE id = ?1
        "#,
    )
    .bind(batch_id)
    .bind(qty)
    .bind(initial_delta)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("product_batch", batch_id).into());
    }

    debug!(batch_id = %batch_id, qty, intake, "Batch incremented");
    Ok(())
}

/// Undoes an intake of `qty` units.
pub async fn reverse_intake(
    tx: &mut Transaction<'_, Sqlite>,
    batch_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE product_batches
        SET current_stock = current_stock - ?2,
            initial_stock = initial_stock - ?2,
            updated_at = ?3
        WHERE id = ?1 AND current_stock >= ?2 AND initial_stock >= ?2
        "#,
    )
    .bind(batch_id)
    .bind(qty)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("product_batch", batch_id).into());
    }

    Ok(())
}

pub async fn insert_batch(tx: &mut Transaction<'_, Sqlite>, batch: &ProductBatch) -> DbResult<()> {
    debug!(
        id = %batch.id,
        product_id = %batch.product_id,
        variant = %batch.variant,
        stock = batch.current_stock,
        "Creating batch"
    );

    sqlx::query(
        r#"
        INSERT INTO product_batches (
            id, product_id, variant, supplier_id, supplier_name,
            buy_price, sell_price, initial_stock, current_stock,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.product_id)
    .bind(batch.variant.as_str())
    .bind(&batch.supplier_id)
    .bind(&batch.supplier_name)
    .bind(batch.buy_price)
    .bind(batch.sell_price)
    .bind(batch.initial_stock)
    .bind(batch.current_stock)
    .bind(batch.created_at)
    .bind(batch.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Read Models
// =============================================================================

/// Stock held by one variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VariantStock {
    pub variant: Variant,
    pub stock: i64,
    pub batches: i64,
}

/// A product whose recorded stock disagrees with its batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StockDrift {
    pub product_id: String,
    pub recorded: i64,
    pub actual: i64,
}

impl StockDrift {
    pub fn delta(&self) -> i64 {
        self.actual - self.recorded
    }
}

/// Repository for batch reads and stock maintenance.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductBatch>> {
        let batch = sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM product_batches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// All batches of a product, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<ProductBatch>> {
        let mut batches = sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM product_batches WHERE product_id = ?1"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        batches.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(batches)
    }

    /// Per-variant stock of a product.
    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<VariantStock>> {
        let rows = sqlx::query_as::<_, VariantStock>(
            r#"
            SELECT variant, COALESCE(SUM(current_stock), 0) AS stock, COUNT(*) AS batches
            FROM product_batches
            WHERE product_id = ?1
            GROUP BY variant
            ORDER BY variant ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Read-only FIFO preview: which batches a sale of `quantity` would
    /// consume right now.
    pub async fn allocate_fifo(
        &self,
        product_id: &str,
        variant: &Variant,
        quantity: i64,
    ) -> DbResult<Vec<Allocation>> {
        let views: Vec<_> = sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM product_batches WHERE product_id = ?1 AND variant = ?2"
        ))
        .bind(product_id)
        .bind(variant.as_str())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(ProductBatch::stock_view)
        .collect();

        Ok(fifo::allocate_fifo(product_id, variant, quantity, &views)?)
    }

    /// Every product whose `stock` differs from Σ batch stock.
    pub async fn audit_stock(&self) -> DbResult<Vec<StockDrift>> {
        let drift = sqlx::query_as::<_, StockDrift>(
            r#"
            SELECT p.id AS product_id,
                   p.stock AS recorded,
                   COALESCE(SUM(b.current_stock), 0) AS actual
            FROM products p
            LEFT JOIN product_batches b ON b.product_id = p.id
            GROUP BY p.id, p.stock
            HAVING p.stock <> COALESCE(SUM(b.current_stock), 0)
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if !drift.is_empty() {
            warn!(products = drift.len(), "Product stock drift detected");
        }

        Ok(drift)
    }

    /// Rewrites one product's stock from its batches.
    ///
    /// Returns the drift that was repaired; `recorded == actual` means the
    /// product was already consistent and nothing was logged.
    pub async fn recompute_product_stock(&self, product_id: &str) -> DbResult<StockDrift> {
        let mut tx = self.pool.begin().await?;

        // No alerts: a repair is not a stock movement
        let sync = sync_product_stock(&mut tx, product_id, false).await?;
        let drift = StockDrift {
            product_id: product_id.to_string(),
            recorded: sync.before,
            actual: sync.after,
        };

        if drift.delta() != 0 {
            warn!(
                product_id = %product_id,
                recorded = drift.recorded,
                actual = drift.actual,
                "Repairing product stock drift"
            );
            activity::record(
                &mut tx,
                ActivityEntry {
                    user_id: SYSTEM_USER,
                    action: "stock.repair",
                    entity_type: "product",
                    entity_id: product_id,
                    description: format!(
                        "Stock recomputed from batches: {} -> {}",
                        drift.recorded, drift.actual
                    ),
                    changes: Some(json!({ "before": drift.recorded, "after": drift.actual })),
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(product_id = %product_id, stock = drift.actual, "Product stock recomputed");
        Ok(drift)
    }
}
