//! Supplier rows referenced by batches, purchases and returns.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;
use crate::repository::new_id;
use toko_core::validation::validate_name;
use toko_core::{CoreError, Supplier};

/// Loads a supplier inside `tx`.
pub async fn fetch_supplier(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<Supplier> {
    let supplier = sqlx::query_as::<_, Supplier>(
        "SELECT id, name, phone, created_at FROM suppliers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    supplier.ok_or_else(|| CoreError::not_found("supplier", id).into())
}

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn insert(&self, name: &str, phone: Option<&str>) -> DbResult<Supplier> {
        validate_name("name", name).map_err(CoreError::from)?;

        let supplier = Supplier {
            id: new_id(),
            name: name.trim().to_string(),
            phone: phone.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO suppliers (id, name, phone, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&supplier.id)
            .bind(&supplier.name)
            .bind(&supplier.phone)
            .bind(supplier.created_at)
            .execute(&self.pool)
            .await?;

        Ok(supplier)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, phone, created_at FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }
}
