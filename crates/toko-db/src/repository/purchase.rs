//! # Purchase Intake Engine
//!
//! Receives goods into batches and reverses a whole purchase.
//!
//! ## Batch Matching
//! ```text
//! line (product, variant, buy_price) from supplier S
//!        │
//!        ▼
//!  batch with same (product, supplier, buy_price, variant)?
//!        │
//!    yes ├──► initial_stock += qty, current_stock += qty
//!    no  └──► new batch, initial_stock = current_stock = qty
//!        │
//!        ▼
//!  purchase_items row → products.stock resynced
//! ```
//!
//! Deletion is the exact inverse, and is refused once any of the received
//! units have left their batch.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::LedgerSettings;
use crate::repository::activity::{self, ActivityEntry};
use crate::repository::batch::{
    fetch_batch, increment_batch, insert_batch, reverse_intake, BATCH_COLUMNS,
};
use crate::repository::new_id;
use crate::repository::outbox::{self, topics};
use crate::repository::product::{fetch_product, sync_product_stock};
use crate::repository::supplier::fetch_supplier;
use toko_core::input::NewPurchase;
use toko_core::{CoreError, ProductBatch, Purchase, PurchaseItem, Variant};

const PURCHASE_COLUMNS: &str =
    "id, supplier_id, invoice_number, total_amount, user_id, notes, created_at";

const PURCHASE_ITEM_COLUMNS: &str = "id, purchase_id, product_id, batch_id, variant, \
                                     qty_received, buy_price, sell_price, subtotal";

#[derive(Debug, Serialize)]
struct PurchaseJournal<'a> {
    purchase_id: &'a str,
    supplier_id: &'a str,
    invoice_number: Option<&'a str>,
    total_amount: i64,
    lines: Vec<JournalLine>,
}

#[derive(Debug, Serialize)]
struct JournalLine {
    product_id: String,
    batch_id: String,
    qty: i64,
    buy_price: i64,
}

impl From<&PurchaseItem> for JournalLine {
    fn from(item: &PurchaseItem) -> Self {
        JournalLine {
            product_id: item.product_id.clone(),
            batch_id: item.batch_id.clone(),
            qty: item.qty_received,
            buy_price: item.buy_price,
        }
    }
}

/// Oldest batch a purchase line merges into, if any.
async fn find_matching_batch(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    supplier_id: &str,
    buy_price: i64,
    variant: &Variant,
) -> DbResult<Option<ProductBatch>> {
    let batch = sqlx::query_as::<_, ProductBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM product_batches \
         WHERE product_id = ?1 AND supplier_id = ?2 AND buy_price = ?3 AND variant = ?4 \
         ORDER BY created_at ASC, id ASC \
         LIMIT 1"
    ))
    .bind(product_id)
    .bind(supplier_id)
    .bind(buy_price)
    .bind(variant.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(batch)
}

async fn fetch_items(
    tx: &mut Transaction<'_, Sqlite>,
    purchase_id: &str,
) -> DbResult<Vec<PurchaseItem>> {
    let items = sqlx::query_as::<_, PurchaseItem>(&format!(
        "SELECT {PURCHASE_ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid ASC"
    ))
    .bind(purchase_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(items)
}

/// Purchase intake engine and purchase read models.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        PurchaseRepository { pool, settings }
    }

    /// Records a purchase and moves its goods into batches.
    ///
    /// ## Errors
    /// - `DuplicateInvoice` when the invoice number is already recorded
    /// - `NotFound` for an unknown supplier or product
    /// - `Validation` for empty or malformed lines
    pub async fn create_purchase(&self, input: &NewPurchase) -> DbResult<String> {
        self.receive(input).await.inspect_err(|err| {
            warn!(supplier_id = %input.supplier_id, error = %err, "Purchase rejected");
        })
    }

    async fn receive(&self, input: &NewPurchase) -> DbResult<String> {
        input.validate()?;
        let invoice = input.invoice();

        if let Some(invoice) = invoice {
            if self.invoice_exists(invoice).await? {
                return Err(CoreError::DuplicateInvoice(invoice.to_string()).into());
            }
        }

        let purchase_id = new_id();
        let now = Utc::now();
        let total_amount = input.total_amount()?;

        let mut tx = self.pool.begin().await?;

        let supplier = fetch_supplier(&mut tx, &input.supplier_id).await?;

        sqlx::query(
            r#"
            INSERT INTO purchases (id, supplier_id, invoice_number, total_amount, user_id, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&purchase_id)
        .bind(&supplier.id)
        .bind(invoice)
        .bind(total_amount)
        .bind(&input.user_id)
        .bind(&input.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|err| match (DbError::from(err), invoice) {
            // Lost a race with a concurrent intake of the same invoice
            (DbError::UniqueViolation { .. }, Some(invoice)) => {
                DbError::from(CoreError::DuplicateInvoice(invoice.to_string()))
            }
            (other, _) => other,
        })?;

        let mut touched = BTreeSet::new();
        let mut journal_lines = Vec::with_capacity(input.items.len());

        for line in &input.items {
            fetch_product(&mut tx, &line.product_id).await?;

            let existing = find_matching_batch(
                &mut tx,
                &line.product_id,
                &supplier.id,
                line.buy_price,
                &line.variant,
            )
            .await?;

            let batch_id = match existing {
                Some(batch) => {
                    increment_batch(&mut tx, &batch.id, line.qty, true).await?;
                    debug!(batch_id = %batch.id, qty = line.qty, "Purchase merged into batch");
                    batch.id
                }
                None => {
                    let batch = ProductBatch {
                        id: new_id(),
                        product_id: line.product_id.clone(),
                        variant: line.variant.clone(),
                        supplier_id: Some(supplier.id.clone()),
                        supplier_name: Some(supplier.name.clone()),
                        buy_price: line.buy_price,
                        sell_price: line.sell_price,
                        initial_stock: line.qty,
                        current_stock: line.qty,
                        created_at: now,
                        updated_at: now,
                    };
                    insert_batch(&mut tx, &batch).await?;
                    batch.id
                }
            };

            let item = PurchaseItem {
                id: new_id(),
                purchase_id: purchase_id.clone(),
                product_id: line.product_id.clone(),
                batch_id,
                variant: line.variant.clone(),
                qty_received: line.qty,
                buy_price: line.buy_price,
                sell_price: line.sell_price,
                subtotal: line.qty * line.buy_price,
            };

            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, product_id, batch_id, variant,
                    qty_received, buy_price, sell_price, subtotal
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_id)
            .bind(&item.product_id)
            .bind(&item.batch_id)
            .bind(item.variant.as_str())
            .bind(item.qty_received)
            .bind(item.buy_price)
            .bind(item.sell_price)
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;

            journal_lines.push(JournalLine::from(&item));
            touched.insert(line.product_id.as_str());
        }

        for product_id in touched {
            sync_product_stock(&mut tx, product_id, self.settings.low_stock_alerts).await?;
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id: &input.user_id,
                action: "purchase.create",
                entity_type: "purchase",
                entity_id: &purchase_id,
                description: format!(
                    "Purchase from {} with {} lines",
                    supplier.name,
                    input.items.len()
                ),
                changes: Some(json!({ "total_amount": total_amount, "invoice_number": invoice })),
            },
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            topics::JOURNAL_PURCHASE,
            "purchase",
            &purchase_id,
            &PurchaseJournal {
                purchase_id: &purchase_id,
                supplier_id: &supplier.id,
                invoice_number: invoice,
                total_amount,
                lines: journal_lines,
            },
        )
        .await?;

        tx.commit().await?;

        info!(purchase_id = %purchase_id, supplier = %supplier.name, total_amount, "Purchase recorded");
        Ok(purchase_id)
    }

    /// Removes a purchase and takes its units back out of the batches.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown purchase
    /// - `InsufficientBatchStock` when received units were already sold,
    ///   returned or quarantined
    pub async fn delete_purchase(&self, purchase_id: &str, user_id: &str) -> DbResult<()> {
        self.reverse(purchase_id, user_id).await.inspect_err(|err| {
            warn!(purchase_id = %purchase_id, error = %err, "Purchase deletion rejected");
        })
    }

    async fn reverse(&self, purchase_id: &str, user_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::not_found("purchase", purchase_id))?;

        let items = fetch_items(&mut tx, purchase_id).await?;

        let mut per_batch: BTreeMap<&str, i64> = BTreeMap::new();
        for item in &items {
            *per_batch.entry(item.batch_id.as_str()).or_default() += item.qty_received;
        }

        for (&batch_id, &qty) in &per_batch {
            let batch = fetch_batch(&mut tx, batch_id).await?;
            if batch.current_stock < qty {
                return Err(CoreError::InsufficientBatchStock {
                    batch_id: batch_id.to_string(),
                    available: batch.current_stock,
                    requested: qty,
                }
                .into());
            }
            reverse_intake(&mut tx, batch_id, qty).await?;
        }

        sqlx::query("DELETE FROM purchase_items WHERE purchase_id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        // Batches this purchase created and nothing else ever touched
        let mut removed_batches = 0u64;
        for &batch_id in per_batch.keys() {
            let result = sqlx::query(
                r#"
                DELETE FROM product_batches
                WHERE id = ?1
                  AND initial_stock = 0
                  AND current_stock = 0
                  AND NOT EXISTS (SELECT 1 FROM purchase_items WHERE batch_id = ?1)
                  AND NOT EXISTS (SELECT 1 FROM sale_items WHERE batch_id = ?1)
                  AND NOT EXISTS (SELECT 1 FROM defective_items WHERE batch_id = ?1)
                  AND NOT EXISTS (SELECT 1 FROM purchase_return_items WHERE batch_id = ?1)
                "#,
            )
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
            removed_batches += result.rows_affected();
        }

        let touched: BTreeSet<&str> = items.iter().map(|i| i.product_id.as_str()).collect();
        for product_id in touched {
            sync_product_stock(&mut tx, product_id, self.settings.low_stock_alerts).await?;
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id,
                action: "purchase.delete",
                entity_type: "purchase",
                entity_id: purchase_id,
                description: format!("Purchase deleted, {} lines reversed", items.len()),
                changes: Some(json!({
                    "total_amount": purchase.total_amount,
                    "invoice_number": purchase.invoice_number,
                    "removed_batches": removed_batches,
                })),
            },
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            topics::JOURNAL_PURCHASE_REVERSAL,
            "purchase",
            purchase_id,
            &PurchaseJournal {
                purchase_id,
                supplier_id: &purchase.supplier_id,
                invoice_number: purchase.invoice_number.as_deref(),
                total_amount: purchase.total_amount,
                lines: items.iter().map(JournalLine::from).collect(),
            },
        )
        .await?;

        tx.commit().await?;

        info!(purchase_id = %purchase_id, removed_batches, "Purchase deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {PURCHASE_ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid ASC"
        ))
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn invoice_exists(&self, invoice: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE invoice_number = ?1")
            .bind(invoice)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }
}
