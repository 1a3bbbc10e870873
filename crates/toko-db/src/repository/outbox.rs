//! # Ledger Outbox
//!
//! Hands committed ledger events to the accounting journal and the
//! notification dispatcher without calling them from inside a transaction.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LEDGER OPERATION (e.g. create_sale)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. batches, sale rows, member debt                            │   │
//! │  │  2. INSERT INTO ledger_outbox (topic, entity, payload)         │   │
//! │  │     ('journal.sale', 'sale', ?, <journal JSON>)                │   │
//! │  │     ('stock.low', 'product', ?, <stock JSON>)  when relevant   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← ledger rows and events land together or not at all          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            EXTERNAL DISPATCHER                                  │   │
//! │  │  get_pending → post journal / send notification                │   │
//! │  │     success → mark_delivered                                    │   │
//! │  │     failure → mark_failed (attempts += 1, last_error)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use toko_core::OutboxEntry;

/// Outbox topics.
pub mod topics {
    pub const JOURNAL_SALE: &str = "journal.sale";
    pub const JOURNAL_PURCHASE: &str = "journal.purchase";
    pub const JOURNAL_PURCHASE_REVERSAL: &str = "journal.purchase_reversal";
    pub const JOURNAL_PURCHASE_RETURN: &str = "journal.purchase_return";
    pub const JOURNAL_STOCK_ADJUSTMENT: &str = "journal.stock_adjustment";
    pub const STOCK_LOW: &str = "stock.low";
}

const OUTBOX_COLUMNS: &str = "id, topic, entity_type, entity_id, payload, attempts, last_error, \
                              created_at, attempted_at, delivered_at";

/// Queues an event inside `tx`.
pub async fn enqueue<T: Serialize>(
    tx: &mut Transaction<'_, Sqlite>,
    topic: &str,
    entity_type: &str,
    entity_id: &str,
    payload: &T,
) -> DbResult<()> {
    let payload = serde_json::to_string(payload)?;

    debug!(topic = %topic, entity_id = %entity_id, "Queuing ledger event");

    sqlx::query(
        r#"
        INSERT INTO ledger_outbox (
            id, topic, entity_type, entity_id, payload, attempts, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(topic)
    .bind(entity_type)
    .bind(entity_id)
    .bind(payload)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Dispatcher-side access to the outbox.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Undelivered entries in insertion order.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM ledger_outbox \
             WHERE delivered_at IS NULL ORDER BY rowid ASC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Undelivered entries for one topic.
    pub async fn get_pending_by_topic(&self, topic: &str, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM ledger_outbox \
             WHERE delivered_at IS NULL AND topic = ?1 ORDER BY rowid ASC LIMIT ?2"
        ))
        .bind(topic)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn mark_delivered(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE ledger_outbox SET
                delivered_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE ledger_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_outbox WHERE delivered_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries delivered more than `days_old` days ago.
    ///
    /// Returns the number of deleted rows.
    pub async fn cleanup_delivered(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM ledger_outbox WHERE delivered_at IS NOT NULL AND delivered_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_cycle() {
        let db = test_db().await;
        let outbox = db.outbox();

        let mut tx = db.pool().begin().await.unwrap();
        enqueue(&mut tx, topics::JOURNAL_SALE, "sale", "s-1", &json!({ "amount": 10 }))
            .await
            .unwrap();
        enqueue(&mut tx, topics::STOCK_LOW, "product", "p-1", &json!({ "stock": 1 }))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outbox.count_pending().await.unwrap(), 2);
        let low = outbox.get_pending_by_topic(topics::STOCK_LOW, 10).await.unwrap();
        assert_eq!(low.len(), 1);

        let pending = outbox.get_pending(10).await.unwrap();
        assert_eq!(pending[0].topic, topics::JOURNAL_SALE);

        outbox.mark_failed(&pending[0].id, "journal offline").await.unwrap();
        let retry = outbox.get_pending(10).await.unwrap();
        assert_eq!(retry[0].attempts, 1);
        assert_eq!(retry[0].last_error.as_deref(), Some("journal offline"));

        outbox.mark_delivered(&pending[0].id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);

        // Delivered just now, so nothing is old enough yet
        assert_eq!(outbox.cleanup_delivered(7).await.unwrap(), 0);
    }
}
