//! # Purchase Return Engine
//!
//! Goods going back to a supplier, either straight off the shelf or via the
//! defective-item quarantine.
//!
//! ## Paths
//! ```text
//! direct return      batch ──(qty)──► purchase_return_items        stock -= qty
//!
//! quarantine         batch ──(qty)──► defective_items[pending]     stock -= qty
//!                                          │
//! process defectives                       ▼
//!                    defective_items[processed] ──► purchase_return_items
//!                                                                  (no stock move)
//! ```

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::error::DbResult;
use crate::pool::LedgerSettings;
use crate::repository::activity::{self, ActivityEntry};
use crate::repository::batch::{decrement_batch, fetch_batch};
use crate::repository::new_id;
use crate::repository::outbox::{self, topics};
use crate::repository::product::sync_product_stock;
use toko_core::input::{NewDefectiveItem, NewPurchaseReturn};
use toko_core::validation::{checked_total, validate_non_empty};
use toko_core::{
    CoreError, DefectStatus, DefectiveItem, ProductBatch, PurchaseReturn, PurchaseReturnItem,
};

const DEFECT_COLUMNS: &str = "id, product_id, batch_id, supplier_id, qty, source, status, \
                              reason, return_id, user_id, created_at, updated_at";

const RETURN_ITEM_COLUMNS: &str =
    "id, return_id, batch_id, product_id, defective_item_id, qty, buy_price, subtotal, reason";

#[derive(Debug, Serialize)]
struct ReturnJournal<'a> {
    return_id: &'a str,
    supplier_id: Option<&'a str>,
    total_amount: i64,
    from_quarantine: bool,
}

async fn insert_return_header(
    tx: &mut Transaction<'_, Sqlite>,
    header: &PurchaseReturn,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO purchase_returns (id, supplier_id, user_id, total_amount, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&header.id)
    .bind(&header.supplier_id)
    .bind(&header.user_id)
    .bind(header.total_amount)
    .bind(&header.notes)
    .bind(header.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_return_item(
    tx: &mut Transaction<'_, Sqlite>,
    item: &PurchaseReturnItem,
) -> DbResult<()> {
    sqlx::query(&format!(
        "INSERT INTO purchase_return_items ({RETURN_ITEM_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ))
    .bind(&item.id)
    .bind(&item.return_id)
    .bind(&item.batch_id)
    .bind(&item.product_id)
    .bind(&item.defective_item_id)
    .bind(item.qty)
    .bind(item.buy_price)
    .bind(item.subtotal)
    .bind(&item.reason)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Returns, quarantine and their read models.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        ReturnRepository { pool, settings }
    }

    // =========================================================================
    // Direct Returns
    // =========================================================================

    /// Sends units from specific batches back to the supplier.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown batch
    /// - `InsufficientBatchStock` when a batch holds less than requested
    /// - `MixedSupplier` when the batches come from different suppliers or
    ///   from someone other than `supplier_id`
    pub async fn create_purchase_return(&self, input: &NewPurchaseReturn) -> DbResult<String> {
        self.return_from_batches(input).await.inspect_err(|err| {
            warn!(user_id = %input.user_id, error = %err, "Purchase return rejected");
        })
    }

    async fn return_from_batches(&self, input: &NewPurchaseReturn) -> DbResult<String> {
        input.validate()?;

        let return_id = new_id();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Check every batch before touching any of them
        let mut batches: BTreeMap<&str, ProductBatch> = BTreeMap::new();
        let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
        for line in &input.items {
            if !batches.contains_key(line.batch_id.as_str()) {
                let batch = fetch_batch(&mut tx, &line.batch_id).await?;
                batches.insert(line.batch_id.as_str(), batch);
            }
            *requested.entry(line.batch_id.as_str()).or_default() += line.qty;
        }
        for (&batch_id, &qty) in &requested {
            let available = batches.get(batch_id).map_or(0, |b| b.current_stock);
            if available < qty {
                return Err(CoreError::InsufficientBatchStock {
                    batch_id: batch_id.to_string(),
                    available,
                    requested: qty,
                }
                .into());
            }
        }

        // One supplier per document, and it must own every batch
        let mut suppliers = input
            .items
            .iter()
            .filter_map(|l| batches.get(l.batch_id.as_str()))
            .map(|b| b.supplier_id.as_deref());
        let supplier_id = match &input.supplier_id {
            Some(requested) => Some(requested.as_str()),
            None => suppliers.next().flatten(),
        };
        if let Some(other) = suppliers.find(|s| *s != supplier_id) {
            return Err(CoreError::MixedSupplier {
                expected: supplier_id.unwrap_or("none").to_string(),
                found: other.unwrap_or("none").to_string(),
            }
            .into());
        }
        let supplier_id = supplier_id.map(str::to_string);

        let total_amount = checked_total(
            "total_amount",
            input
                .items
                .iter()
                .filter_map(|l| batches.get(l.batch_id.as_str()).map(|b| (b.buy_price, l.qty))),
        )
        .map_err(CoreError::from)?
        .minor();

        let header = PurchaseReturn {
            id: return_id.clone(),
            supplier_id,
            user_id: input.user_id.clone(),
            total_amount,
            notes: input.notes.clone(),
            created_at: now,
        };
        insert_return_header(&mut tx, &header).await?;

        let mut touched = BTreeSet::new();
        for line in &input.items {
            let Some(batch) = batches.get(line.batch_id.as_str()) else {
                continue;
            };

            decrement_batch(&mut tx, &batch.id, line.qty).await?;
            insert_return_item(
                &mut tx,
                &PurchaseReturnItem {
                    id: new_id(),
                    return_id: return_id.clone(),
                    batch_id: batch.id.clone(),
                    product_id: batch.product_id.clone(),
                    defective_item_id: None,
                    qty: line.qty,
                    buy_price: batch.buy_price,
                    subtotal: line.qty * batch.buy_price,
                    reason: line.reason.clone(),
                },
            )
            .await?;
            touched.insert(batch.product_id.as_str());
        }

        for product_id in touched {
            sync_product_stock(&mut tx, product_id, self.settings.low_stock_alerts).await?;
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id: &input.user_id,
                action: "purchase_return.create",
                entity_type: "purchase_return",
                entity_id: &return_id,
                description: format!("Returned {} lines to supplier", input.items.len()),
                changes: Some(json!({ "total_amount": total_amount })),
            },
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            topics::JOURNAL_PURCHASE_RETURN,
            "purchase_return",
            &return_id,
            &ReturnJournal {
                return_id: &return_id,
                supplier_id: header.supplier_id.as_deref(),
                total_amount,
                from_quarantine: false,
            },
        )
        .await?;

        tx.commit().await?;

        info!(return_id = %return_id, total_amount, "Purchase return recorded");
        Ok(return_id)
    }

    // =========================================================================
    // Quarantine
    // =========================================================================

    /// Pulls units out of sellable stock into a pending defective record.
    pub async fn quarantine_defective(&self, input: &NewDefectiveItem) -> DbResult<DefectiveItem> {
        self.quarantine(input).await.inspect_err(|err| {
            warn!(batch_id = %input.batch_id, error = %err, "Quarantine rejected");
        })
    }

    async fn quarantine(&self, input: &NewDefectiveItem) -> DbResult<DefectiveItem> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        let batch = fetch_batch(&mut tx, &input.batch_id).await?;
        if batch.current_stock < input.qty {
            return Err(CoreError::InsufficientBatchStock {
                batch_id: batch.id,
                available: batch.current_stock,
                requested: input.qty,
            }
            .into());
        }

        decrement_batch(&mut tx, &batch.id, input.qty).await?;

        let now = Utc::now();
        let item = DefectiveItem {
            id: new_id(),
            product_id: batch.product_id.clone(),
            batch_id: batch.id.clone(),
            supplier_id: batch.supplier_id.clone(),
            qty: input.qty,
            source: input.source,
            status: DefectStatus::Pending,
            reason: input.reason.clone(),
            return_id: None,
            user_id: input.user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(&format!(
            "INSERT INTO defective_items ({DEFECT_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ))
        .bind(&item.id)
        .bind(&item.product_id)
        .bind(&item.batch_id)
        .bind(&item.supplier_id)
        .bind(item.qty)
        .bind(item.source)
        .bind(item.status.as_str())
        .bind(&item.reason)
        .bind(&item.return_id)
        .bind(&item.user_id)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        sync_product_stock(&mut tx, &item.product_id, self.settings.low_stock_alerts).await?;

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id: &input.user_id,
                action: "defective.quarantine",
                entity_type: "defective_item",
                entity_id: &item.id,
                description: format!("{} units of batch {} quarantined", item.qty, batch.id),
                changes: Some(json!({
                    "batch_id": batch.id,
                    "stock_before": batch.current_stock,
                    "stock_after": batch.current_stock - item.qty,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        info!(defective_id = %item.id, batch_id = %item.batch_id, qty = item.qty, "Units quarantined");
        Ok(item)
    }

    /// Folds pending defective items of one supplier into a purchase return.
    ///
    /// ## Errors
    /// - `NotFound` when an id does not exist
    /// - `MixedSupplier` when the items come from different suppliers
    /// - `InvalidState` when an item was already processed
    pub async fn process_return_from_defectives(
        &self,
        item_ids: &[String],
        user_id: &str,
        notes: Option<&str>,
    ) -> DbResult<String> {
        self.return_defectives(item_ids, user_id, notes)
            .await
            .inspect_err(|err| {
                warn!(user_id = %user_id, error = %err, "Defective return rejected");
            })
    }

    async fn return_defectives(
        &self,
        item_ids: &[String],
        user_id: &str,
        notes: Option<&str>,
    ) -> DbResult<String> {
        validate_non_empty("item_ids", item_ids.len()).map_err(CoreError::from)?;

        let mut seen = BTreeSet::new();
        let ids: Vec<&str> = item_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut tx = self.pool.begin().await?;

        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            let item = sqlx::query_as::<_, DefectiveItem>(&format!(
                "SELECT {DEFECT_COLUMNS} FROM defective_items WHERE id = ?1"
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found("defective_item", *id))?;
            items.push(item);
        }

        let supplier_id = items.first().and_then(|i| i.supplier_id.clone());
        if let Some(other) = items.iter().find(|i| i.supplier_id != supplier_id) {
            return Err(CoreError::MixedSupplier {
                expected: supplier_id.unwrap_or_else(|| "none".to_string()),
                found: other.supplier_id.clone().unwrap_or_else(|| "none".to_string()),
            }
            .into());
        }

        if let Some(done) = items.iter().find(|i| i.status != DefectStatus::Pending) {
            return Err(CoreError::invalid_state(
                "defective_item",
                &done.id,
                done.status.as_str(),
                DefectStatus::Pending.as_str(),
            )
            .into());
        }

        let return_id = new_id();
        let now = Utc::now();

        let mut prices = BTreeMap::new();
        for item in &items {
            if !prices.contains_key(item.batch_id.as_str()) {
                let batch = fetch_batch(&mut tx, &item.batch_id).await?;
                prices.insert(item.batch_id.as_str(), batch.buy_price);
            }
        }
        let price_of = |batch_id: &str| prices.get(batch_id).copied().unwrap_or(0);

        let total_amount = checked_total(
            "total_amount",
            items.iter().map(|i| (price_of(&i.batch_id), i.qty)),
        )
        .map_err(CoreError::from)?
        .minor();

        let header = PurchaseReturn {
            id: return_id.clone(),
            supplier_id: supplier_id.clone(),
            user_id: user_id.to_string(),
            total_amount,
            notes: notes.map(str::to_string),
            created_at: now,
        };
        insert_return_header(&mut tx, &header).await?;

        for item in &items {
            let buy_price = price_of(&item.batch_id);
            insert_return_item(
                &mut tx,
                &PurchaseReturnItem {
                    id: new_id(),
                    return_id: return_id.clone(),
                    batch_id: item.batch_id.clone(),
                    product_id: item.product_id.clone(),
                    defective_item_id: Some(item.id.clone()),
                    qty: item.qty,
                    buy_price,
                    subtotal: item.qty * buy_price,
                    reason: item.reason.clone(),
                },
            )
            .await?;

            let result = sqlx::query(
                r#"
                UPDATE defective_items
                SET status = 'processed', return_id = ?2, updated_at = ?3
                WHERE id = ?1 AND status = 'pending'
                "#,
            )
            .bind(&item.id)
            .bind(&return_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::conflict("defective_item", &item.id).into());
            }
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id,
                action: "purchase_return.from_defectives",
                entity_type: "purchase_return",
                entity_id: &return_id,
                description: format!("Returned {} quarantined items", items.len()),
                changes: Some(json!({ "defective_item_ids": ids, "total_amount": total_amount })),
            },
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            topics::JOURNAL_PURCHASE_RETURN,
            "purchase_return",
            &return_id,
            &ReturnJournal {
                return_id: &return_id,
                supplier_id: supplier_id.as_deref(),
                total_amount,
                from_quarantine: true,
            },
        )
        .await?;

        tx.commit().await?;

        info!(return_id = %return_id, items = items.len(), total_amount, "Defectives returned");
        Ok(return_id)
    }

    // =========================================================================
    // Read Models
    // =========================================================================

    pub async fn get_return(&self, id: &str) -> DbResult<Option<PurchaseReturn>> {
        let header = sqlx::query_as::<_, PurchaseReturn>(
            "SELECT id, supplier_id, user_id, total_amount, notes, created_at FROM purchase_returns WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(header)
    }

    pub async fn get_return_items(&self, return_id: &str) -> DbResult<Vec<PurchaseReturnItem>> {
        let items = sqlx::query_as::<_, PurchaseReturnItem>(&format!(
            "SELECT {RETURN_ITEM_COLUMNS} FROM purchase_return_items WHERE return_id = ?1 ORDER BY rowid ASC"
        ))
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_defective(&self, id: &str) -> DbResult<Option<DefectiveItem>> {
        let item = sqlx::query_as::<_, DefectiveItem>(&format!(
            "SELECT {DEFECT_COLUMNS} FROM defective_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Quarantined items still waiting for a return, oldest first.
    pub async fn list_pending_defectives(&self) -> DbResult<Vec<DefectiveItem>> {
        let items = sqlx::query_as::<_, DefectiveItem>(&format!(
            "SELECT {DEFECT_COLUMNS} FROM defective_items WHERE status = 'pending' ORDER BY rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::testing::*;
    use toko_core::input::ReturnLine;
    use toko_core::{DefectSource, Variant};

    fn defect(batch_id: &str, qty: i64) -> NewDefectiveItem {
        NewDefectiveItem {
            batch_id: batch_id.to_string(),
            qty,
            source: DefectSource::SalesReturn,
            reason: Some("retak".into()),
            user_id: "gudang-1".into(),
        }
    }

    #[tokio::test]
    async fn test_direct_return_decrements_batch() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Tempered Glass", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 2_000, 10, ts(1)).await;

        let return_id = db
            .returns()
            .create_purchase_return(&NewPurchaseReturn {
                supplier_id: None,
                user_id: "gudang-1".into(),
                items: vec![ReturnLine {
                    batch_id: batch.id.clone(),
                    qty: 4,
                    reason: Some("salah ukuran".into()),
                }],
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(batch_stock(&db, &batch.id).await, 6);
        assert_eq!(product_stock(&db, &product.id).await, 6);

        let header = db.returns().get_return(&return_id).await.unwrap().unwrap();
        assert_eq!(header.supplier_id.as_deref(), Some(supplier.id.as_str()));
        assert_eq!(header.total_amount, 8_000);
        let items = db.returns().get_return_items(&return_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].defective_item_id, None);
    }

    #[tokio::test]
    async fn test_return_more_than_batch_holds() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Tempered Glass", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 2_000, 3, ts(1)).await;

        let line = |qty| ReturnLine {
            batch_id: batch.id.clone(),
            qty,
            reason: None,
        };
        let err = db
            .returns()
            .create_purchase_return(&NewPurchaseReturn {
                supplier_id: None,
                user_id: "gudang-1".into(),
                items: vec![line(2), line(2)],
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Ledger(CoreError::InsufficientBatchStock { available: 3, requested: 4, .. })
        ));
        assert_eq!(batch_stock(&db, &batch.id).await, 3);
        assert_eq!(count_rows(&db, "purchase_returns").await, 0);
    }

    #[tokio::test]
    async fn test_direct_return_single_supplier_only() {
        let db = test_db().await;
        let a = seed_supplier(&db, "PT A").await;
        let b = seed_supplier(&db, "PT B").await;
        let c = seed_supplier(&db, "PT C").await;
        let product = seed_product(&db, "Softcase", 0).await;
        let from_a = seed_batch(&db, &product.id, &a.id, Variant::standard(), 8_000, 5, ts(1)).await;
        let from_b = seed_batch(&db, &product.id, &b.id, Variant::standard(), 7_500, 5, ts(2)).await;

        let line = |batch_id: &str| ReturnLine {
            batch_id: batch_id.to_string(),
            qty: 1,
            reason: None,
        };
        let request = |supplier_id: Option<&str>, items: Vec<ReturnLine>| NewPurchaseReturn {
            supplier_id: supplier_id.map(str::to_string),
            user_id: "gudang-1".into(),
            items,
            notes: None,
        };

        // Batches of two suppliers in one document
        let err = db
            .returns()
            .create_purchase_return(&request(None, vec![line(&from_a.id), line(&from_b.id)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(CoreError::MixedSupplier { ref expected, ref found })
                if *expected == a.id && *found == b.id
        ));

        // Header supplier that owns none of the batches
        let err = db
            .returns()
            .create_purchase_return(&request(Some(&c.id), vec![line(&from_a.id)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::MixedSupplier { .. })));

        assert_eq!(batch_stock(&db, &from_a.id).await, 5);
        assert_eq!(batch_stock(&db, &from_b.id).await, 5);
        assert_eq!(count_rows(&db, "purchase_returns").await, 0);

        // Matching supplier goes through
        let return_id = db
            .returns()
            .create_purchase_return(&request(Some(&b.id), vec![line(&from_b.id), line(&from_b.id)]))
            .await
            .unwrap();
        let header = db.returns().get_return(&return_id).await.unwrap().unwrap();
        assert_eq!(header.supplier_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(batch_stock(&db, &from_b.id).await, 3);
        assert_eq!(batch_stock(&db, &from_a.id).await, 5);
        assert_invariants(&db).await;
    }

    #[tokio::test]
    async fn test_quarantine_then_return() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Earphone", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 15_000, 10, ts(1)).await;

        let first = db.returns().quarantine_defective(&defect(&batch.id, 2)).await.unwrap();
        let second = db.returns().quarantine_defective(&defect(&batch.id, 1)).await.unwrap();
        assert_eq!(first.status, DefectStatus::Pending);
        assert_eq!(batch_stock(&db, &batch.id).await, 7);
        assert_eq!(product_stock(&db, &product.id).await, 7);
        assert_eq!(db.returns().list_pending_defectives().await.unwrap().len(), 2);

        let return_id = db
            .returns()
            .process_return_from_defectives(
                &[first.id.clone(), second.id.clone(), first.id.clone()],
                "gudang-1",
                Some("retur bulanan"),
            )
            .await
            .unwrap();

        // No further stock movement
        assert_eq!(batch_stock(&db, &batch.id).await, 7);

        let items = db.returns().get_return_items(&return_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.defective_item_id.is_some()));
        let header = db.returns().get_return(&return_id).await.unwrap().unwrap();
        assert_eq!(header.total_amount, 45_000);

        let processed = db.returns().get_defective(&first.id).await.unwrap().unwrap();
        assert_eq!(processed.status, DefectStatus::Processed);
        assert_eq!(processed.return_id.as_deref(), Some(return_id.as_str()));
        assert!(db.returns().list_pending_defectives().await.unwrap().is_empty());

        // Second attempt hits the state rule
        let err = db
            .returns()
            .process_return_from_defectives(&[first.id.clone()], "gudang-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_quarantine_beyond_stock() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Earphone", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 15_000, 1, ts(1)).await;

        let err = db.returns().quarantine_defective(&defect(&batch.id, 2)).await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::InsufficientBatchStock { .. })));
        assert_eq!(count_rows(&db, "defective_items").await, 0);
    }

    #[tokio::test]
    async fn test_mixed_suppliers_rejected() {
        let db = test_db().await;
        let a = seed_supplier(&db, "PT A").await;
        let b = seed_supplier(&db, "PT B").await;
        let product = seed_product(&db, "Earphone", 0).await;
        let from_a = seed_batch(&db, &product.id, &a.id, Variant::standard(), 15_000, 5, ts(1)).await;
        let from_b = seed_batch(&db, &product.id, &b.id, Variant::standard(), 16_000, 5, ts(2)).await;

        let x = db.returns().quarantine_defective(&defect(&from_a.id, 1)).await.unwrap();
        let y = db.returns().quarantine_defective(&defect(&from_b.id, 1)).await.unwrap();

        let err = db
            .returns()
            .process_return_from_defectives(&[x.id.clone(), y.id.clone()], "gudang-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::MixedSupplier { .. })));
        assert_eq!(db.returns().list_pending_defectives().await.unwrap().len(), 2);
        assert_eq!(count_rows(&db, "purchase_returns").await, 0);

        let err = db
            .returns()
            .process_return_from_defectives(&[x.id.clone(), "nope".to_string()], "gudang-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::NotFound { .. })));
    }
}
