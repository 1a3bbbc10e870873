//! # Activity Log
//!
//! Audit rows written inside the transaction of the operation they describe,
//! so a rolled-back sale leaves no trace here either.

use chrono::Utc;
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use toko_core::ActivityLog;

/// Actor recorded for maintenance operations without a user.
pub const SYSTEM_USER: &str = "system";

/// One activity entry, before it gets an id and timestamp.
#[derive(Debug, Clone)]
pub struct ActivityEntry<'a> {
    pub user_id: &'a str,
    /// Dotted verb, e.g. `sale.create`, `opname.adjust`.
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub description: String,
    /// Before/after snapshot.
    pub changes: Option<Value>,
}

/// Appends an activity row inside `tx`.
pub async fn record(tx: &mut Transaction<'_, Sqlite>, entry: ActivityEntry<'_>) -> DbResult<()> {
    debug!(
        action = %entry.action,
        entity_type = %entry.entity_type,
        entity_id = %entry.entity_id,
        "Recording activity"
    );

    let changes = entry.changes.map(|v| v.to_string());

    sqlx::query(
        r#"
        INSERT INTO activity_logs (
            id, user_id, action, entity_type, entity_id, description, changes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.description)
    .bind(changes)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Read access to the activity log.
#[derive(Debug, Clone)]
pub struct ActivityLogRepository {
    pool: SqlitePool,
}

impl ActivityLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ActivityLogRepository { pool }
    }

    /// Entries for one entity, oldest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DbResult<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, description, changes, created_at
            FROM activity_logs
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Entries with a given action, newest first.
    pub async fn list_by_action(&self, action: &str, limit: u32) -> DbResult<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, description, changes, created_at
            FROM activity_logs
            WHERE action = ?1
            ORDER BY rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_rolled_back_entries_disappear() {
        let db = test_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        record(
            &mut tx,
            ActivityEntry {
                user_id: "u-1",
                action: "sale.create",
                entity_type: "sale",
                entity_id: "s-1",
                description: "kept".into(),
                changes: Some(json!({ "final_amount": 1000 })),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        record(
            &mut tx,
            ActivityEntry {
                user_id: "u-1",
                action: "sale.create",
                entity_type: "sale",
                entity_id: "s-1",
                description: "dropped".into(),
                changes: None,
            },
        )
        .await
        .unwrap();
        drop(tx);

        let rows = db.activity().list_for_entity("sale", "s-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "kept");
        assert!(rows[0].changes.as_deref().unwrap().contains("final_amount"));
    }
}
