//! # Member Repository
//!
//! Customers and their tempo debt.
//!
//! ## Debt Updates
//! ```text
//! tempo sale   : UPDATE members SET debt = debt + :t
//!                WHERE id = :id AND (credit_limit = 0 OR debt + :t <= credit_limit)
//! repayment    : UPDATE members SET debt = debt - :a
//!                WHERE id = :id AND debt >= :a
//!
//! 0 rows after a successful read in the same transaction → ConcurrencyConflict
//! ```

use chrono::Utc;
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::activity::{self, ActivityEntry};
use crate::repository::new_id;
use toko_core::input::NewMember;
use toko_core::validation::validate_payment_amount;
use toko_core::{CoreError, Member, ValidationError};

const MEMBER_COLUMNS: &str = "id, name, phone, debt, credit_limit, created_at, updated_at";

/// Loads a member inside `tx`, `None` when absent.
pub async fn find_member(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(member)
}

/// Adds `amount` to a member's debt, enforcing the credit limit in the
/// same statement.
pub async fn charge_debt(
    tx: &mut Transaction<'_, Sqlite>,
    member_id: &str,
    amount: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE members
        SET debt = debt + ?2, updated_at = ?3
        WHERE id = ?1 AND (credit_limit = 0 OR debt + ?2 <= credit_limit)
        "#,
    )
    .bind(member_id)
    .bind(amount)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("member", member_id).into());
    }

    debug!(member_id = %member_id, amount, "Member debt charged");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MemberRepository { pool }
    }

    pub async fn insert(&self, input: &NewMember) -> DbResult<Member> {
        input.validate()?;

        let now = Utc::now();
        let member = Member {
            id: new_id(),
            name: input.name.trim().to_string(),
            phone: input.phone.clone(),
            debt: 0,
            credit_limit: input.credit_limit,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO members (id, name, phone, debt, credit_limit, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&member.id)
        .bind(&member.name)
        .bind(&member.phone)
        .bind(member.debt)
        .bind(member.credit_limit)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Records a debt repayment. Paying more than the outstanding debt is
    /// rejected.
    pub async fn settle_debt(&self, member_id: &str, amount: i64, user_id: &str) -> DbResult<Member> {
        validate_payment_amount(amount).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let member = find_member(&mut tx, member_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(member_id.to_string()))?;

        if amount > member.debt {
            return Err(CoreError::from(ValidationError::OutOfRange {
                field: "amount".to_string(),
                min: 1,
                max: member.debt,
            })
            .into());
        }

        let result = sqlx::query(
            "UPDATE members SET debt = debt - ?2, updated_at = ?3 WHERE id = ?1 AND debt >= ?2",
        )
        .bind(member_id)
        .bind(amount)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::conflict("member", member_id).into());
        }

        activity::record(
            &mut tx,
            ActivityEntry {
                user_id,
                action: "member.settle_debt",
                entity_type: "member",
                entity_id: member_id,
                description: format!("Debt repayment of {}", toko_core::Money::from_minor(amount)),
                changes: Some(json!({ "debt_before": member.debt, "debt_after": member.debt - amount })),
            },
        )
        .await?;

        let updated = find_member(&mut tx, member_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(member_id.to_string()))?;

        tx.commit().await?;

        info!(member_id = %member_id, amount, debt = updated.debt, "Debt settled");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::testing::{seed_member, test_db};

    #[tokio::test]
    async fn test_insert_member() {
        let db = test_db().await;
        let member = db
            .members()
            .insert(&NewMember {
                name: "Siti".into(),
                phone: Some("0812".into()),
                credit_limit: 250_000,
            })
            .await
            .unwrap();
        let stored = db.members().get_by_id(&member.id).await.unwrap().unwrap();
        assert_eq!(stored.credit_limit, 250_000);
        assert_eq!(stored.debt, 0);
    }

    #[tokio::test]
    async fn test_settle_debt() {
        let db = test_db().await;
        let member = seed_member(&db, 40_000, 100_000).await;

        let after = db.members().settle_debt(&member.id, 15_000, "kasir").await.unwrap();
        assert_eq!(after.debt, 25_000);

        let err = db.members().settle_debt(&member.id, 30_000, "kasir").await.unwrap_err();
        assert!(matches!(err.ledger(), Some(CoreError::Validation(_))));
        assert_eq!(db.members().get_by_id(&member.id).await.unwrap().unwrap().debt, 25_000);

        let err = db.members().settle_debt("nobody", 1, "kasir").await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::CustomerNotFound(_))));
    }

    #[tokio::test]
    async fn test_charge_debt_respects_limit_in_sql() {
        let db = test_db().await;
        let member = seed_member(&db, 50_000, 100_000).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = charge_debt(&mut tx, &member.id, 60_000).await.unwrap_err();
        assert!(err.is_retryable());
        charge_debt(&mut tx, &member.id, 50_000).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.members().get_by_id(&member.id).await.unwrap().unwrap().debt, 100_000);
    }
}
