//! # Sale Engine
//!
//! Records a completed sale in one transaction.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_sale(input)                                │
//! │                                                                         │
//! │  quote_sale()  ── totals, tender split, tempo, status   (no I/O)       │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       │                                                                 │
//! │  1. member lookup; tempo → credit rule + guarded debt UPDATE           │
//! │  2. INSERT sales header, INSERT sale_payments                          │
//! │  3. per line: FIFO over (product, variant) batches                      │
//! │        └── per allocation: guarded batch UPDATE + sale_items row       │
//! │  4. products.stock ← Σ batch stock; stock.low when crossed             │
//! │  5. activity_logs row, journal.sale outbox row                         │
//! │       │                                                                 │
//! │  COMMIT  (any failure above → nothing persisted)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::pool::LedgerSettings;
use crate::repository::activity::{self, ActivityEntry};
use crate::repository::batch::{allocate_in_tx, decrement_batch};
use crate::repository::member::{charge_debt, find_member};
use crate::repository::new_id;
use crate::repository::outbox::{self, topics};
use crate::repository::product::{fetch_product, sync_product_stock};
use toko_core::checkout::{check_credit_limit, quote_sale, NewSale};
use toko_core::validation::checked_total;
use toko_core::{CoreError, Money, PaymentMethodKind, PaymentStatus, Sale, SaleItem, SalePayment};

const SALE_COLUMNS: &str = "id, member_id, user_id, total_amount, discount_amount, final_amount, \
                            paid_amount, tempo_amount, change_amount, payment_method, \
                            payment_status, notes, created_at";

/// Result of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    pub sale_id: String,
    pub final_amount: i64,
    pub change_amount: i64,
    pub payment_method: PaymentMethodKind,
    pub payment_status: PaymentStatus,
    /// Σ allocated qty × batch buy price.
    pub cost_of_goods: i64,
}

#[derive(Debug, Serialize)]
struct SaleJournal<'a> {
    sale_id: &'a str,
    member_id: Option<&'a str>,
    total_amount: i64,
    discount_amount: i64,
    final_amount: i64,
    cash_received: i64,
    tempo_amount: i64,
    change_amount: i64,
    cost_of_goods: i64,
    payments: Vec<JournalPayment<'a>>,
}

#[derive(Debug, Serialize)]
struct JournalPayment<'a> {
    method: &'a str,
    method_id: Option<&'a str>,
    amount: i64,
    is_tempo: bool,
}

/// Sale engine and sale read models.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        SaleRepository { pool, settings }
    }

    /// Validates, allocates and persists a sale atomically.
    ///
    /// ## Errors
    /// - `InsufficientPayment`, `Validation` from the quote
    /// - `CustomerNotFound`, `CreditLimitExceeded` for member checks
    /// - `InsufficientStock` when a line cannot be covered by its batches
    /// - `ConcurrencyConflict` when a guarded update loses a race
    pub async fn create_sale(&self, input: &NewSale) -> DbResult<SaleReceipt> {
        self.record_sale(input).await.inspect_err(|err| {
            warn!(user_id = %input.user_id, error = %err, "Sale rejected");
        })
    }

    async fn record_sale(&self, input: &NewSale) -> DbResult<SaleReceipt> {
        let rules = &self.settings.tender_rules;
        let quote = quote_sale(input, rules)?;
        let member_id = input
            .member_id
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());

        let sale_id = new_id();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // 1. Member and tempo debt
        if let Some(member_id) = member_id {
            let member = find_member(&mut tx, member_id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(member_id.to_string()))?;

            if quote.uses_tempo() {
                let tempo = quote.tempo_amount.minor();
                check_credit_limit(&member.id, member.debt, member.credit_limit, tempo)?;
                charge_debt(&mut tx, &member.id, tempo).await?;
            }
        }

        // 2. Header and payments
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, member_id, user_id, total_amount, discount_amount, final_amount,
                paid_amount, tempo_amount, change_amount, payment_method, payment_status,
                notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&sale_id)
        .bind(member_id)
        .bind(&input.user_id)
        .bind(quote.subtotal.minor())
        .bind(quote.discount.minor())
        .bind(quote.final_amount.minor())
        .bind(quote.total_paid.minor())
        .bind(quote.tempo_amount.minor())
        .bind(quote.change.minor())
        .bind(quote.payment_method.as_str())
        .bind(quote.payment_status.as_str())
        .bind(&input.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut journal_payments = Vec::with_capacity(input.payments.len());
        for tender in &input.payments {
            let is_tempo = rules.is_tempo(tender);
            sqlx::query(
                r#"
                INSERT INTO sale_payments (
                    id, sale_id, method, amount, method_id, variant_id, reference,
                    is_tempo, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(new_id())
            .bind(&sale_id)
            .bind(tender.method.trim())
            .bind(tender.amount)
            .bind(&tender.method_id)
            .bind(&tender.variant_id)
            .bind(&tender.reference)
            .bind(is_tempo)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            journal_payments.push(JournalPayment {
                method: tender.method.trim(),
                method_id: tender.method_id.as_deref(),
                amount: tender.amount,
                is_tempo,
            });
        }

        // 3. FIFO allocation per line
        let mut cost_of_goods = Money::zero();
        let mut touched = BTreeSet::new();
        let mut item_count = 0usize;

        for line in &input.items {
            fetch_product(&mut tx, &line.product_id).await?;
            let plan = allocate_in_tx(&mut tx, &line.product_id, &line.variant, line.qty).await?;

            for (allocation, batch) in plan {
                decrement_batch(&mut tx, &allocation.batch_id, allocation.qty).await?;

                sqlx::query(
                    r#"
                    INSERT INTO sale_items (
                        id, sale_id, product_id, batch_id, variant, qty, price, subtotal, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )
                .bind(new_id())
                .bind(&sale_id)
                .bind(&line.product_id)
                .bind(&allocation.batch_id)
                .bind(line.variant.as_str())
                .bind(allocation.qty)
                .bind(line.price)
                .bind(allocation.qty * line.price)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                cost_of_goods = checked_total(
                    "cost_of_goods",
                    [(cost_of_goods.minor(), 1), (batch.buy_price, allocation.qty)],
                )
                .map_err(CoreError::from)?;
                item_count += 1;

                debug!(
                    sale_id = %sale_id,
                    batch_id = %allocation.batch_id,
                    qty = allocation.qty,
                    "Sale item allocated"
                );
            }

            touched.insert(line.product_id.as_str());
        }

        // 4. Aggregates
        for product_id in touched {
            sync_product_stock(&mut tx, product_id, self.settings.low_stock_alerts).await?;
        }

        // 5. Collaborators
        activity::record(
            &mut tx,
            ActivityEntry {
                user_id: &input.user_id,
                action: "sale.create",
                entity_type: "sale",
                entity_id: &sale_id,
                description: format!(
                    "Sale of {} item rows, total {}",
                    item_count, quote.final_amount
                ),
                changes: Some(json!({
                    "final_amount": quote.final_amount.minor(),
                    "tempo_amount": quote.tempo_amount.minor(),
                    "payment_status": quote.payment_status.as_str(),
                })),
            },
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            topics::JOURNAL_SALE,
            "sale",
            &sale_id,
            &SaleJournal {
                sale_id: &sale_id,
                member_id,
                total_amount: quote.subtotal.minor(),
                discount_amount: quote.discount.minor(),
                final_amount: quote.final_amount.minor(),
                cash_received: quote.non_tempo_paid.minor(),
                tempo_amount: quote.tempo_amount.minor(),
                change_amount: quote.change.minor(),
                cost_of_goods: cost_of_goods.minor(),
                payments: journal_payments,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            final_amount = quote.final_amount.minor(),
            status = quote.payment_status.as_str(),
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale_id,
            final_amount: quote.final_amount.minor(),
            change_amount: quote.change.minor(),
            payment_method: quote.payment_method,
            payment_status: quote.payment_status,
            cost_of_goods: cost_of_goods.minor(),
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Sale items in allocation order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, batch_id, variant, qty, price, subtotal, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<SalePayment>> {
        let payments = sqlx::query_as::<_, SalePayment>(
            r#"
            SELECT id, sale_id, method, amount, method_id, variant_id, reference, is_tempo, created_at
            FROM sale_payments
            WHERE sale_id = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Cost basis of a sale: Σ qty × buy price of the batch each unit came from.
    pub async fn cost_of_goods(&self, sale_id: &str) -> DbResult<i64> {
        let cost: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(si.qty * b.buy_price), 0)
            FROM sale_items si
            JOIN product_batches b ON b.id = si.batch_id
            WHERE si.sale_id = ?1
            "#,
        )
        .bind(sale_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::testing::*;
    use toko_core::checkout::{SaleLine, TenderLine};
    use toko_core::{ValidationError, Variant};

    #[tokio::test]
    async fn test_fifo_sale_straddles_batches() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Powerbank", 0).await;
        let a = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 1_000, 5, ts(1)).await;
        let b = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 1_200, 10, ts(2)).await;

        let receipt = db
            .sales()
            .create_sale(&sale_input(
                vec![sale_line(&product.id, 8, 2_000)],
                vec![tender("cash", 20_000)],
            ))
            .await
            .unwrap();

        let items = db.sales().get_items(&receipt.sale_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].batch_id.as_str(), items[0].qty), (a.id.as_str(), 5));
        assert_eq!((items[1].batch_id.as_str(), items[1].qty), (b.id.as_str(), 3));

        assert_eq!(batch_stock(&db, &a.id).await, 0);
        assert_eq!(batch_stock(&db, &b.id).await, 7);
        assert_eq!(product_stock(&db, &product.id).await, 7);

        // Cost basis follows the batches: 5 × 1000 + 3 × 1200
        assert_eq!(receipt.cost_of_goods, 8_600);
        assert_eq!(db.sales().cost_of_goods(&receipt.sale_id).await.unwrap(), 8_600);

        // Σ item subtotals equals the pre-discount total
        let sale = db.sales().get_by_id(&receipt.sale_id).await.unwrap().unwrap();
        assert_eq!(items.iter().map(|i| i.subtotal).sum::<i64>(), sale.total_amount);
        assert_eq!(receipt.change_amount, 4_000);
        assert_invariants(&db).await;
    }

    #[tokio::test]
    async fn test_split_tempo_sale_charges_member() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Headset", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 6_000, 3, ts(1)).await;
        let member = seed_member(&db, 0, 100_000).await;

        let mut input = sale_input(
            vec![sale_line(&product.id, 1, 10_000)],
            vec![tender("cash", 5_000), tender("tempo", 5_000)],
        );
        input.member_id = Some(member.id.clone());

        let receipt = db.sales().create_sale(&input).await.unwrap();

        let sale = db.sales().get_by_id(&receipt.sale_id).await.unwrap().unwrap();
        assert_eq!(sale.payment_status, PaymentStatus::Partial);
        assert_eq!(sale.payment_method, PaymentMethodKind::Mixed);
        assert_eq!(sale.tempo_amount, 5_000);
        assert_eq!(receipt.change_amount, 0);
        assert_eq!(db.members().get_by_id(&member.id).await.unwrap().unwrap().debt, 5_000);
        assert_eq!(batch_stock(&db, &batch.id).await, 2);

        let payments = db.sales().get_payments(&receipt.sale_id).await.unwrap();
        assert_eq!(payments.iter().filter(|p| p.is_tempo).count(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Flashdisk", 0).await;
        let a = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 40_000, 5, ts(1)).await;
        let b = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 42_000, 10, ts(2)).await;

        let err = db
            .sales()
            .create_sale(&sale_input(
                vec![sale_line(&product.id, 20, 60_000)],
                vec![tender("cash", 1_200_000)],
            ))
            .await
            .unwrap_err();

        match err {
            DbError::Ledger(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!((available, requested), (15, 20));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(batch_stock(&db, &a.id).await, 5);
        assert_eq!(batch_stock(&db, &b.id).await, 10);
        assert_eq!(product_stock(&db, &product.id).await, 15);
        assert_eq!(count_rows(&db, "sales").await, 0);
        assert_eq!(count_rows(&db, "sale_payments").await, 0);
        assert_eq!(count_rows(&db, "activity_logs").await, 0);
        assert_eq!(count_rows(&db, "ledger_outbox").await, 0);
    }

    #[tokio::test]
    async fn test_credit_limit_blocks_whole_sale() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Speaker", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 40_000, 4, ts(1)).await;
        let member = seed_member(&db, 50_000, 100_000).await;

        let mut input = sale_input(
            vec![sale_line(&product.id, 1, 60_000)],
            vec![tender("tempo", 60_000)],
        );
        input.member_id = Some(member.id.clone());

        let err = db.sales().create_sale(&input).await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::CreditLimitExceeded { .. })));

        assert_eq!(db.members().get_by_id(&member.id).await.unwrap().unwrap().debt, 50_000);
        assert_eq!(batch_stock(&db, &batch.id).await, 4);
        assert_eq!(count_rows(&db, "sales").await, 0);
        assert_eq!(count_rows(&db, "sale_payments").await, 0);
        assert_eq!(count_rows(&db, "sale_items").await, 0);
    }

    #[tokio::test]
    async fn test_failure_after_debt_charge_rolls_debt_back() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Mouse", 0).await;
        seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 40_000, 1, ts(1)).await;
        let member = seed_member(&db, 0, 0).await;

        let mut input = sale_input(
            vec![sale_line(&product.id, 2, 50_000)],
            vec![tender("kredit", 100_000)],
        );
        input.member_id = Some(member.id.clone());

        let err = db.sales().create_sale(&input).await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::InsufficientStock { .. })));
        assert_eq!(db.members().get_by_id(&member.id).await.unwrap().unwrap().debt, 0);
    }

    #[tokio::test]
    async fn test_unknown_member_rejected() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Mouse", 0).await;
        seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 40_000, 1, ts(1)).await;

        let mut input = sale_input(
            vec![sale_line(&product.id, 1, 50_000)],
            vec![tender("tempo", 50_000)],
        );
        input.member_id = Some("ghost".into());

        let err = db.sales().create_sale(&input).await.unwrap_err();
        assert!(matches!(err, DbError::Ledger(CoreError::CustomerNotFound(ref id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_exact_stock_drains_batches_and_alerts() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Kabel HDMI", 2).await;
        let a = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 10_000, 2, ts(1)).await;
        let b = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 11_000, 3, ts(2)).await;

        db.sales()
            .create_sale(&sale_input(
                vec![sale_line(&product.id, 5, 15_000)],
                vec![tender("qris", 75_000)],
            ))
            .await
            .unwrap();

        assert_eq!(batch_stock(&db, &a.id).await, 0);
        assert_eq!(batch_stock(&db, &b.id).await, 0);
        assert_eq!(product_stock(&db, &product.id).await, 0);

        let low = db.outbox().get_pending_by_topic(topics::STOCK_LOW, 10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].entity_id, product.id);
        let journal = db.outbox().get_pending_by_topic(topics::JOURNAL_SALE, 10).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert!(journal[0].payload.contains("\"cost_of_goods\":53000"));
    }

    #[tokio::test]
    async fn test_discount_larger_than_subtotal_clamps() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Stiker", 0).await;
        seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 500, 10, ts(1)).await;

        let mut input = sale_input(vec![sale_line(&product.id, 2, 1_000)], vec![tender("cash", 500)]);
        input.discount_amount = 5_000;

        let receipt = db.sales().create_sale(&input).await.unwrap();
        let sale = db.sales().get_by_id(&receipt.sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_amount, 2_000);
        assert_eq!(sale.final_amount, 0);
        assert_eq!(receipt.change_amount, 500);
        assert_eq!(sale.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_variant_spellings_share_batches() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Adaptor", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 5_000, 4, ts(1)).await;

        let json = format!(
            r#"{{
                "user_id": "kasir-1",
                "items": [
                    {{ "product_id": "{pid}", "variant": "", "qty": 1, "price": 8000 }},
                    {{ "product_id": "{pid}", "variant": null, "qty": 1, "price": 8000 }},
                    {{ "product_id": "{pid}", "qty": 1, "price": 8000 }}
                ],
                "payments": [ {{ "method": "Tunai", "amount": 24000 }} ]
            }}"#,
            pid = product.id
        );
        let input: NewSale = serde_json::from_str(&json).unwrap();

        let receipt = db.sales().create_sale(&input).await.unwrap();
        assert_eq!(receipt.payment_method, PaymentMethodKind::Cash);
        assert_eq!(batch_stock(&db, &batch.id).await, 1);
        assert_invariants(&db).await;
    }

    #[tokio::test]
    async fn test_named_variant_does_not_touch_standard() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Softcase", 0).await;
        let standard = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 5_000, 4, ts(1)).await;
        let red = seed_batch(&db, &product.id, &supplier.id, Variant::from("Merah"), 5_000, 2, ts(2)).await;

        let line = SaleLine {
            product_id: product.id.clone(),
            variant: Variant::from("Merah"),
            qty: 2,
            price: 9_000,
        };
        db.sales()
            .create_sale(&sale_input(vec![line], vec![tender("transfer", 18_000)]))
            .await
            .unwrap();

        assert_eq!(batch_stock(&db, &standard.id).await, 4);
        assert_eq!(batch_stock(&db, &red.id).await, 0);
        assert_eq!(product_stock(&db, &product.id).await, 4);
    }

    #[tokio::test]
    async fn test_underpayment_rejected_before_storage() {
        let db = test_db().await;
        let err = db
            .sales()
            .create_sale(&sale_input(
                vec![sale_line("p-any", 1, 10_000)],
                vec![TenderLine {
                    method: "cash".into(),
                    amount: 9_999,
                    method_id: None,
                    variant_id: None,
                    reference: None,
                }],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(CoreError::InsufficientPayment { required: 10_000, paid: 9_999 })
        ));
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected_before_storage() {
        let db = test_db().await;
        let supplier = seed_supplier(&db, "PT Sumber").await;
        let product = seed_product(&db, "Charger", 0).await;
        let batch = seed_batch(&db, &product.id, &supplier.id, Variant::standard(), 1_000, 10, ts(1)).await;

        let attempts = [
            sale_input(vec![sale_line(&product.id, 2, i64::MAX / 2 + 1)], vec![tender("cash", 1)]),
            sale_input(
                vec![sale_line(&product.id, 1, 1_000)],
                vec![tender("cash", i64::MAX), tender("transfer", i64::MAX)],
            ),
            sale_input(
                vec![sale_line(&product.id, 5, toko_core::MAX_AMOUNT)],
                vec![tender("cash", toko_core::MAX_AMOUNT)],
            ),
        ];

        for input in &attempts {
            let err = db.sales().create_sale(input).await.unwrap_err();
            assert!(matches!(
                err,
                DbError::Ledger(CoreError::Validation(ValidationError::OutOfRange { .. }))
            ));
        }

        assert_eq!(batch_stock(&db, &batch.id).await, 10);
        assert_eq!(count_rows(&db, "sales").await, 0);
        assert_invariants(&db).await;
    }
}
