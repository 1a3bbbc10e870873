//! # Stock Opname Engine
//!
//! Physical count sessions and their reconciliation into batch stock.
//!
//! ## Session Lifecycle
//! ```text
//! create_session ──► draft ──update_item()*──► finalize_session ──► completed
//!                      │                            │
//!                      │                            └─ per counted group:
//!                      │                               plan_adjustment()
//!                      │                               apply to batches
//!                      │                               log each batch touch
//!                      │
//!                      └──────cancel_session──────────────────────► cancelled
//! ```
//!
//! Items never counted are left alone on finalize.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::pool::LedgerSettings;
use crate::repository::activity::{self, ActivityEntry};
use crate::repository::batch::{decrement_batch, fetch_group, increment_batch, insert_batch};
use crate::repository::new_id;
use crate::repository::outbox::{self, topics};
use crate::repository::product::sync_product_stock;
use toko_core::input::NewOpnameSession;
use toko_core::opname::{count_difference, plan_adjustment, BatchAdjustment};
use toko_core::validation::validate_physical_count;
use toko_core::{
    CoreError, OpnameStatus, ProductBatch, StockOpnameItem, StockOpnameSession, ValidationError,
    Variant,
};

const SESSION_COLUMNS: &str = "id, user_id, status, notes, category_id, created_at, \
                               completed_at, completed_by, cancelled_at";

const ITEM_COLUMNS: &str = "id, session_id, product_id, variant, system_stock, \
                            physical_stock, difference, reason, updated_at";

/// Outcome of a finalized session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpnameSummary {
    pub session_id: String,
    /// Groups whose count differed from the snapshot.
    pub adjusted_groups: usize,
    pub units_added: i64,
    pub units_removed: i64,
}

#[derive(Debug, Serialize)]
struct AdjustmentJournal<'a> {
    session_id: &'a str,
    lines: Vec<AdjustmentLine>,
    /// Σ delta × buy price.
    net_value: i64,
}

#[derive(Debug, Serialize)]
struct AdjustmentLine {
    product_id: String,
    variant: String,
    batch_id: String,
    delta: i64,
    buy_price: i64,
}

async fn fetch_session(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> DbResult<StockOpnameSession> {
    let session = sqlx::query_as::<_, StockOpnameSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM stock_opname_sessions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    session.ok_or_else(|| CoreError::not_found("stock_opname_session", id).into())
}

fn require_draft(session: &StockOpnameSession) -> Result<(), CoreError> {
    if session.status != OpnameStatus::Draft {
        return Err(CoreError::invalid_state(
            "stock_opname_session",
            &session.id,
            session.status.as_str(),
            OpnameStatus::Draft.as_str(),
        ));
    }
    Ok(())
}

/// Stock opname sessions.
#[derive(Debug, Clone)]
pub struct OpnameRepository {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl OpnameRepository {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        OpnameRepository { pool, settings }
    }

    /// Opens a draft session with one item per `(product, variant)` group.
    ///
    /// Products without any batch get a single `Standard` item at zero so a
    /// count can still record stock found on the shelf.
    pub async fn create_session(&self, input: &NewOpnameSession) -> DbResult<StockOpnameSession> {
        let mut tx = self.pool.begin().await?;

        if let Some(category_id) = input.category_id.as_deref() {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?1")
                .bind(category_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                return Err(CoreError::not_found("category", category_id).into());
            }
        }

        let now = Utc::now();
        let session = StockOpnameSession {
            id: new_id(),
            user_id: input.user_id.clone(),
            status: OpnameStatus::Draft,
            notes: input.notes.clone(),
            category_id: input.category_id.clone(),
            created_at: now,
            completed_at: None,
            completed_by: None,
            cancelled_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_opname_sessions (id, user_id, status, notes, category_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.status.as_str())
        .bind(&session.notes)
        .bind(&session.category_id)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await?;

        let groups: Vec<(String, Variant, i64)> = sqlx::query_as(
            r#"
            SELECT b.product_id, b.variant, COALESCE(SUM(b.current_stock), 0)
            FROM product_batches b
            JOIN products p ON p.id = b.product_id
            WHERE (?1 IS NULL OR p.category_id = ?1)
            GROUP BY b.product_id, b.variant
            UNION ALL
            SELECT p.id, 'Standard', 0
            FROM products p
            WHERE (?1 IS NULL OR p.category_id = ?1)
              AND NOT EXISTS (SELECT 1 FROM product_batches b WHERE b.product_id = p.id)
            ORDER BY 1, 2
            "#,
        )
        .bind(&input.category_id)
        .fetch_all(&mut *tx)
        .await?;

        for (product_id, variant, system_stock) in &groups {
            sqlx::query(
                r#"
                INSERT INTO stock_opname_items (id, session_id, product_id, variant, system_stock, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(new_id())
            .bind(&session.id)
            .bind(product_id)
            .bind(variant.as_str())
            .bind(system_stock)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id: &input.user_id,
                action: "opname.create",
                entity_type: "stock_opname_session",
                entity_id: &session.id,
                description: format!("Stock opname opened with {} groups", groups.len()),
                changes: None,
            },
        )
        .await?;

        tx.commit().await?;

        info!(session_id = %session.id, groups = groups.len(), "Opname session created");
        Ok(session)
    }

    /// Records the physical count of one item.
    pub async fn update_item(
        &self,
        item_id: &str,
        physical_stock: i64,
        reason: Option<&str>,
    ) -> DbResult<StockOpnameItem> {
        validate_physical_count(physical_stock).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let mut item = sqlx::query_as::<_, StockOpnameItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_opname_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::not_found("stock_opname_item", item_id))?;

        let session = fetch_session(&mut tx, &item.session_id).await?;
        require_draft(&session)?;

        item.physical_stock = Some(physical_stock);
        item.difference = Some(count_difference(item.system_stock, physical_stock));
        item.reason = reason.map(str::to_string);
        item.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE stock_opname_items
            SET physical_stock = ?2, difference = ?3, reason = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(item.physical_stock)
        .bind(item.difference)
        .bind(&item.reason)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(item_id = %item.id, physical_stock, difference = ?item.difference, "Opname count recorded");
        Ok(item)
    }

    /// Applies every counted difference to the batches and completes the
    /// session.
    ///
    /// ## Errors
    /// - `InvalidState` when the session is not `draft`
    /// - `InsufficientStock` when a shortage exceeds what the batches hold;
    ///   the session stays `draft`
    pub async fn finalize_session(&self, session_id: &str, user_id: &str) -> DbResult<OpnameSummary> {
        self.reconcile(session_id, user_id).await.inspect_err(|err| {
            warn!(session_id = %session_id, error = %err, "Opname finalize rejected");
        })
    }

    async fn reconcile(&self, session_id: &str, user_id: &str) -> DbResult<OpnameSummary> {
        let mut tx = self.pool.begin().await?;

        let session = fetch_session(&mut tx, session_id).await?;
        require_draft(&session)?;

        let counted = sqlx::query_as::<_, StockOpnameItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_opname_items \
             WHERE session_id = ?1 AND physical_stock IS NOT NULL AND difference <> 0 \
             ORDER BY product_id, variant"
        ))
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        let mut summary = OpnameSummary {
            session_id: session_id.to_string(),
            ..OpnameSummary::default()
        };
        let mut journal_lines = Vec::new();
        let mut touched = BTreeSet::new();

        for item in &counted {
            let difference = item.difference.unwrap_or(0);
            let group = fetch_group(&mut tx, &item.product_id, &item.variant).await?;
            let views: Vec<_> = group.iter().map(ProductBatch::stock_view).collect();
            let plan = plan_adjustment(&item.product_id, &item.variant, difference, &views)?;

            for step in plan {
                let (batch_id, buy_price, before) = match &step {
                    BatchAdjustment::Decrement { batch_id, qty } => {
                        decrement_batch(&mut tx, batch_id, *qty).await?;
                        summary.units_removed += qty;
                        let batch = group.iter().find(|b| &b.id == batch_id);
                        (
                            batch_id.clone(),
                            batch.map_or(0, |b| b.buy_price),
                            batch.map_or(0, |b| b.current_stock),
                        )
                    }
                    BatchAdjustment::Increment { batch_id, qty } => {
                        increment_batch(&mut tx, batch_id, *qty, false).await?;
                        summary.units_added += qty;
                        let batch = group.iter().find(|b| &b.id == batch_id);
                        (
                            batch_id.clone(),
                            batch.map_or(0, |b| b.buy_price),
                            batch.map_or(0, |b| b.current_stock),
                        )
                    }
                    BatchAdjustment::CreateAdjustmentBatch { qty } => {
                        let batch = ProductBatch {
                            id: new_id(),
                            product_id: item.product_id.clone(),
                            variant: item.variant.clone(),
                            supplier_id: None,
                            supplier_name: None,
                            buy_price: 0,
                            sell_price: 0,
                            initial_stock: *qty,
                            current_stock: *qty,
                            created_at: now,
                            updated_at: now,
                        };
                        insert_batch(&mut tx, &batch).await?;
                        summary.units_added += qty;
                        (batch.id, 0, 0)
                    }
                };

                let delta = step.delta();
                activity::record(
                    &mut tx,
                    ActivityEntry {
                        user_id,
                        action: "opname.adjust",
                        entity_type: "product_batch",
                        entity_id: &batch_id,
                        description: format!(
                            "Opname adjustment {:+} on {} ({})",
                            delta, item.product_id, item.variant
                        ),
                        changes: Some(json!({
                            "session_id": session_id,
                            "stock_before": before,
                            "stock_after": before + delta,
                            "reason": item.reason,
                        })),
                    },
                )
                .await?;

                journal_lines.push(AdjustmentLine {
                    product_id: item.product_id.clone(),
                    variant: item.variant.as_str().to_string(),
                    batch_id,
                    delta,
                    buy_price,
                });
            }

            summary.adjusted_groups += 1;
            touched.insert(item.product_id.as_str());
        }

        for product_id in touched {
            sync_product_stock(&mut tx, product_id, self.settings.low_stock_alerts).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE stock_opname_sessions
            SET status = 'completed', completed_at = ?2, completed_by = ?3
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(session_id)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::conflict("stock_opname_session", session_id).into());
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id,
                action: "opname.finalize",
                entity_type: "stock_opname_session",
                entity_id: session_id,
                description: format!("Stock opname completed, {} groups adjusted", summary.adjusted_groups),
                changes: Some(json!({
                    "units_added": summary.units_added,
                    "units_removed": summary.units_removed,
                })),
            },
        )
        .await?;

        if !journal_lines.is_empty() {
            let net_value = journal_lines
                .iter()
                .try_fold(0i64, |net, l| l.delta.checked_mul(l.buy_price).and_then(|v| net.checked_add(v)))
                .ok_or_else(|| {
                    CoreError::from(ValidationError::OutOfRange {
                        field: "net_value".to_string(),
                        min: i64::MIN,
                        max: i64::MAX,
                    })
                })?;
            outbox::enqueue(
                &mut tx,
                topics::JOURNAL_STOCK_ADJUSTMENT,
                "stock_opname_session",
                session_id,
                &AdjustmentJournal {
                    session_id,
                    lines: journal_lines,
                    net_value,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            session_id = %session_id,
            groups = summary.adjusted_groups,
            added = summary.units_added,
            removed = summary.units_removed,
            "Opname session finalized"
        );
        Ok(summary)
    }

    /// Abandons a draft session. Stock is not touched.
    pub async fn cancel_session(&self, session_id: &str, user_id: &str) -> DbResult<StockOpnameSession> {
        let mut tx = self.pool.begin().await?;

        let session = fetch_session(&mut tx, session_id).await?;
        require_draft(&session)?;

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE stock_opname_sessions SET status = 'cancelled', cancelled_at = ?2 \
             WHERE id = ?1 AND status = 'draft'",
        )
        .bind(session_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::conflict("stock_opname_session", session_id).into());
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id,
                action: "opname.cancel",
                entity_type: "stock_opname_session",
                entity_id: session_id,
                description: "Stock opname cancelled".to_string(),
                changes: None,
            },
        )
        .await?;

        let cancelled = fetch_session(&mut tx, session_id).await?;
        tx.commit().await?;

        info!(session_id = %session_id, "Opname session cancelled");
        Ok(cancelled)
    }

    pub async fn get_session(&self, id: &str) -> DbResult<Option<StockOpnameSession>> {
        let session = sqlx::query_as::<_, StockOpnameSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM stock_opname_sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn get_items(&self, session_id: &str) -> DbResult<Vec<StockOpnameItem>> {
        let items = sqlx::query_as::<_, StockOpnameItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_opname_items WHERE session_id = ?1 ORDER BY product_id, variant"
        ))
        .bind(session_id)
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

    fn session_input() -> NewOpnameSession {
        NewOpnameSession {
            user_id: "gudang-1".into(),
            ..NewOpnameSession::default()
        }
    }

    async fn item_for(db: &crate::Database, session_id: &str, product_id: &str) -> StockOpnameItem {
        db.opname()
            .get_items(session_id)
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.product_id == product_id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_shortage_taken_from_oldest_batch() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Baterai", 0).await;
        let x = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 3_000, 12, ts(1)).await;
        let y = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 3_200, 8, ts(2)).await;

        let session = db.opname().create_session(&session_input()).await.unwrap();
        let item = item_for(&db, &session.id, &product.id).await;
        assert_eq!(item.system_stock, 20);

        let counted = db.opname().update_item(&item.id, 15, Some("hilang")).await.unwrap();
        assert_eq!(counted.difference, Some(-5));

        let summary = db.opname().finalize_session(&session.id, "gudang-1").await.unwrap();
        assert_eq!(summary.units_removed, 5);
        assert_eq!(batch_stock(&db, &x.id).await, 7);
        assert_eq!(batch_stock(&db, &y.id).await, 8);
        assert_eq!(product_stock(&db, &product.id).await, 15);

        let session = db.opname().get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.status, OpnameStatus::Completed);
        assert!(session.completed_at.is_some());
        assert_eq!(session.completed_by.as_deref(), Some("gudang-1"));

        let logs = db.activity().list_for_entity("product_batch", &x.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "opname.adjust");
    }

    #[tokio::test]
    async fn test_surplus_goes_to_oldest_batch() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Baterai", 0).await;
        let x = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 3_000, 12, ts(1)).await;
        let y = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 3_200, 8, ts(2)).await;

        let session = db.opname().create_session(&session_input()).await.unwrap();
        let item = item_for(&db, &session.id, &product.id).await;
        db.opname().update_item(&item.id, 23, None).await.unwrap();
        db.opname().finalize_session(&session.id, "gudang-1").await.unwrap();

        assert_eq!(batch_stock(&db, &x.id).await, 15);
        assert_eq!(batch_stock(&db, &y.id).await, 8);
        assert_eq!(product_stock(&db, &product.id).await, 23);
        // Intake history is untouched by a count
        let x = db.batches().get_by_id(&x.id).await.unwrap().unwrap();
        assert_eq!(x.initial_stock, 12);
    }

    #[tokio::test]
    async fn test_surplus_without_batches_creates_adjustment_batch() {
        let db = test_db().await;
        let product = seed_product(&db, "Casing", 0).await;

        let session = db.opname().create_session(&session_input()).await.unwrap();
        let item = item_for(&db, &session.id, &product.id).await;
        assert_eq!(item.system_stock, 0);
        assert!(item.variant.is_standard());

        db.opname().update_item(&item.id, 3, Some("temuan gudang")).await.unwrap();
        db.opname().finalize_session(&session.id, "gudang-1").await.unwrap();

        let batches = db.batches().list_for_product(&product.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].supplier_id, None);
        assert_eq!((batches[0].buy_price, batches[0].sell_price), (0, 0));
        assert_eq!((batches[0].initial_stock, batches[0].current_stock), (3, 3));
        assert_eq!(product_stock(&db, &product.id).await, 3);
    }

    #[tokio::test]
    async fn test_shortage_beyond_stock_keeps_draft() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Baterai", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 3_000, 4, ts(1)).await;

        let session = db.opname().create_session(&session_input()).await.unwrap();
        let item = item_for(&db, &session.id, &product.id).await;
        db.opname().update_item(&item.id, 0, None).await.unwrap();

        // Stock leaves between snapshot and finalize
        db.sales()
            .create_sale(&sale_input(vec![sale_line(&product.id, 2, 5_000)], vec![tender("cash", 10_000)]))
            .await
            .unwrap();

        let err = db.opname().finalize_session(&session.id, "gudang-1").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(CoreError::InsufficientStock { available: 2, requested: 4, .. })
        ));
        assert_eq!(batch_stock(&db, &batch.id).await, 2);
        let session = db.opname().get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.status, OpnameStatus::Draft);
    }

    /// Batch and product rows as JSON, for whole-row comparisons.
    async fn stock_rows(
        db: &crate::Database,
        batch_id: &str,
        product_id: &str,
    ) -> (serde_json::Value, serde_json::Value) {
        let batch = db.batches().get_by_id(batch_id).await.unwrap().unwrap();
        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        (serde_json::to_value(batch).unwrap(), serde_json::to_value(product).unwrap())
    }

    #[tokio::test]
    async fn test_cancel_leaves_stock_alone() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Baterai", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 3_000, 4, ts(1)).await;

        let before = stock_rows(&db, &batch.id, &product.id).await;

        let session = db.opname().create_session(&session_input()).await.unwrap();
        let item = item_for(&db, &session.id, &product.id).await;
        db.opname().update_item(&item.id, 1, None).await.unwrap();

        let cancelled = db.opname().cancel_session(&session.id, "gudang-1").await.unwrap();
        assert_eq!(cancelled.status, OpnameStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        // Batch and product rows untouched, timestamps included
        assert_eq!(stock_rows(&db, &batch.id, &product.id).await, before);
        assert_eq!(batch_stock(&db, &batch.id).await, 4);
        assert_eq!(product_stock(&db, &product.id).await, 4);
        assert_eq!(before.0["initial_stock"], 4);

        // Terminal states stay terminal
        let err = db.opname().finalize_session(&session.id, "gudang-1").await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::InvalidState { .. })));
        let err = db.opname().update_item(&item.id, 2, None).await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::InvalidState { .. })));
        let err = db.opname().cancel_session(&session.id, "gudang-1").await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_category_filter_and_variants() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let category = db.products().insert_category("Aksesoris").await.unwrap();
        let product = seed_product(&db, "Strap", 0).await;
        sqlx::query("UPDATE products SET category_id = ?1 WHERE id = ?2")
            .bind(&category.id)
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();
        let other = seed_product(&db, "Laptop", 0).await;
        seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 1_000, 2, ts(1)).await;
        seed_batch(&db, &product.id, &supplier.id, Variant::from("Hitam"), 1_000, 5, ts(2)).await;
        seed_batch(&db, &other.id, &supplier.id, Variant::standard(), 9_000, 1, ts(1)).await;

        let session = db
            .opname()
            .create_session(&NewOpnameSession {
                user_id: "gudang-1".into(),
                notes: Some("rak depan".into()),
                category_id: Some(category.id.clone()),
            })
            .await
            .unwrap();

        let items = db.opname().get_items(&session.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.product_id == product.id));
        let black = items.iter().find(|i| i.variant.as_str() == "Hitam").unwrap();
        assert_eq!(black.system_stock, 5);

        let err = db.opname().update_item(&black.id, -1, None).await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::Validation(_))));
    }
}
