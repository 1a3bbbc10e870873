//! # Domain Types
//!
//! Ledger entities as they are persisted.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Product ──1:N──► ProductBatch ◄──── PurchaseItem (intake)            │
//! │   stock = Σ           │   ▲                                             │
//! │   batch.current       │   └────────── SaleItem (FIFO split, cost basis)│
//! │                       │                                                 │
//! │                       ├──► DefectiveItem ──► PurchaseReturnItem        │
//! │                       │                                                 │
//! │                       └──► StockOpnameItem (grouped per variant)       │
//! │                                                                         │
//! │   Sale ──1:N──► SaleItem        Sale ──1:N──► SalePayment              │
//! │   Member (debt, credit_limit) ◄── tempo payments                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All monetary fields are integer minor units. All ids are UUID v4 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::fifo::BatchStock;
use crate::money::Money;
use crate::variant::Variant;

// =============================================================================
// Catalog
// =============================================================================

/// Product category, used to scope stock-opname sessions.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sellable product.
///
/// `stock` is denormalized: it always equals the sum of `current_stock` over
/// the product's batches and is rewritten by every ledger operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Optional unique SKU.
    pub code: Option<String>,

    pub name: String,

    pub category_id: Option<String>,

    /// Total on-hand stock across batches.
    pub stock: i64,

    /// Reorder threshold; reaching it queues a low-stock notification.
    pub min_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.min_stock > 0 && self.stock <= self.min_stock
    }
}

// =============================================================================
// Product Batch
// =============================================================================

/// A procurement lot: one product, one supplier, one buy price, one variant.
///
/// ## Lifecycle
/// ```text
/// first purchase of (product, supplier, buy_price, variant)
///      │  initial_stock = current_stock = qty
///      ▼
/// repeat purchase ──► initial_stock += qty, current_stock += qty
/// sale / return / defect / opname shortage ──► current_stock -= qty
/// opname surplus ──► current_stock += qty
/// ```
///
/// `current_stock >= 0` is enforced by every mutation and by a CHECK
/// constraint in storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductBatch {
    pub id: String,
    pub product_id: String,
    pub variant: Variant,
    /// `None` only for opname adjustment batches.
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub buy_price: i64,
    pub sell_price: i64,
    /// Cumulative intake, never decreases through sales.
    pub initial_stock: i64,
    pub current_stock: i64,
    /// FIFO ordering key.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProductBatch {
    #[inline]
    pub fn buy_price(&self) -> Money {
        Money::from_minor(self.buy_price)
    }

    /// Projection used by the FIFO allocator.
    pub fn stock_view(&self) -> BatchStock {
        BatchStock {
            batch_id: self.id.clone(),
            created_at: self.created_at,
            current_stock: self.current_stock,
        }
    }
}

// =============================================================================
// Member
// =============================================================================

/// A customer with a debt ledger for tempo sales.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub debt: i64,
    /// `0` means unlimited credit.
    pub credit_limit: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Remaining credit, `None` when the limit is unlimited.
    pub fn available_credit(&self) -> Option<i64> {
        if self.credit_limit > 0 {
            Some((self.credit_limit - self.debt).max(0))
        } else {
            None
        }
    }
}

// =============================================================================
// Payment Method / Status
// =============================================================================

/// Overall tender category recorded on a sale header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodKind {
    Cash,
    Transfer,
    Qris,
    /// More than one payment, or a single payment of no known category.
    Mixed,
}

impl PaymentMethodKind {
    /// Maps free-text method names onto a known category.
    ///
    /// ```rust
    /// use toko_core::PaymentMethodKind;
    ///
    /// assert_eq!(PaymentMethodKind::categorize("Tunai"), Some(PaymentMethodKind::Cash));
    /// assert_eq!(PaymentMethodKind::categorize("QRIS"), Some(PaymentMethodKind::Qris));
    /// assert_eq!(PaymentMethodKind::categorize("tempo"), None);
    /// ```
    pub fn categorize(method: &str) -> Option<Self> {
        match method.trim().to_lowercase().as_str() {
            "cash" | "tunai" => Some(PaymentMethodKind::Cash),
            "transfer" | "bank_transfer" | "bank transfer" => Some(PaymentMethodKind::Transfer),
            "qris" => Some(PaymentMethodKind::Qris),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodKind::Cash => "cash",
            PaymentMethodKind::Transfer => "transfer",
            PaymentMethodKind::Qris => "qris",
            PaymentMethodKind::Mixed => "mixed",
        }
    }
}

/// Settlement state of a sale, measured on non-tempo payments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Unpaid => "unpaid",
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header. Persisted together with its items and payments or not at all.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub member_id: Option<String>,
    pub user_id: String,
    /// Σ item subtotals, before discount.
    pub total_amount: i64,
    pub discount_amount: i64,
    /// `max(0, total_amount - discount_amount)`.
    pub final_amount: i64,
    /// Σ payment amounts, tempo included.
    pub paid_amount: i64,
    /// Portion charged to the member's debt.
    pub tempo_amount: i64,
    pub change_amount: i64,
    pub payment_method: PaymentMethodKind,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One (sale, batch) row produced by FIFO splitting.
///
/// A requested line straddling two batches becomes two `SaleItem`s with the
/// same `price`; `batch_id` recovers the buy price for cost-of-goods.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub batch_id: String,
    pub variant: Variant,
    pub qty: i64,
    /// Selling price actually charged per unit.
    pub price: i64,
    /// `qty * price`.
    pub subtotal: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_minor(self.subtotal)
    }
}

/// One payment instrument used on a sale (split tender).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub method: String,
    pub amount: i64,
    /// Bank / e-wallet account.
    pub method_id: Option<String>,
    pub variant_id: Option<String>,
    pub reference: Option<String>,
    pub is_tempo: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,
    /// Supplier's invoice number; unique when present.
    pub invoice_number: Option<String>,
    pub total_amount: i64,
    pub user_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Intake line linking a purchase to the batch it replenished.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub batch_id: String,
    pub variant: Variant,
    pub qty_received: i64,
    pub buy_price: i64,
    pub sell_price: i64,
    pub subtotal: i64,
}

// =============================================================================
// Defective Items & Purchase Returns
// =============================================================================

/// Where a defective unit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DefectSource {
    Manual,
    SalesReturn,
    ServiceReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DefectStatus {
    /// Pulled from sellable stock, waiting to be returned.
    Pending,
    /// Folded into a purchase return.
    Processed,
}

impl DefectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectStatus::Pending => "pending",
            DefectStatus::Processed => "processed",
        }
    }
}

/// Quarantine record for units pulled out of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DefectiveItem {
    pub id: String,
    pub product_id: String,
    pub batch_id: String,
    pub supplier_id: Option<String>,
    pub qty: i64,
    pub source: DefectSource,
    pub status: DefectStatus,
    pub reason: Option<String>,
    /// Set once processed.
    pub return_id: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Return-to-supplier document.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseReturn {
    pub id: String,
    pub supplier_id: Option<String>,
    pub user_id: String,
    /// Σ qty × batch buy price.
    pub total_amount: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseReturnItem {
    pub id: String,
    pub return_id: String,
    pub batch_id: String,
    pub product_id: String,
    pub defective_item_id: Option<String>,
    pub qty: i64,
    pub buy_price: i64,
    pub subtotal: i64,
    pub reason: Option<String>,
}

// =============================================================================
// Stock Opname
// =============================================================================

/// ```text
/// draft ──finalize──► completed
///   │
///   └────cancel─────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OpnameStatus {
    Draft,
    Completed,
    Cancelled,
}

impl OpnameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpnameStatus::Draft => "draft",
            OpnameStatus::Completed => "completed",
            OpnameStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockOpnameSession {
    pub id: String,
    pub user_id: String,
    pub status: OpnameStatus,
    pub notes: Option<String>,
    /// Category the snapshot was restricted to, if any.
    pub category_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Physical count for one `(product, variant)` group.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockOpnameItem {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    pub variant: Variant,
    /// Σ batch stock at snapshot time.
    pub system_stock: i64,
    /// `None` until counted.
    pub physical_stock: Option<i64>,
    /// `physical_stock - system_stock`.
    pub difference: Option<i64>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Collaborator Records
// =============================================================================

/// Audit trail row written inside the owning transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityLog {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
    /// Before/after JSON.
    pub changes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Event waiting for the journal poster or notification dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OutboxEntry {
    pub id: String,
    /// e.g. `journal.sale`, `stock.low`.
    pub topic: String,
    pub entity_type: String,
    pub entity_id: String,
    /// JSON payload.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn member(debt: i64, credit_limit: i64) -> Member {
        let now = Utc::now();
        Member {
            id: "m-1".into(),
            name: "Budi".into(),
            phone: None,
            debt,
            credit_limit,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_available_credit() {
        assert_eq!(member(30_000, 100_000).available_credit(), Some(70_000));
        assert_eq!(member(120_000, 100_000).available_credit(), Some(0));
        assert_eq!(member(500_000, 0).available_credit(), None);
    }

    #[test]
    fn test_categorize_payment_methods() {
        assert_eq!(PaymentMethodKind::categorize(" CASH "), Some(PaymentMethodKind::Cash));
        assert_eq!(PaymentMethodKind::categorize("Transfer"), Some(PaymentMethodKind::Transfer));
        assert_eq!(PaymentMethodKind::categorize("ovo"), None);
    }

    #[test]
    fn test_low_stock_threshold() {
        let now = Utc::now();
        let mut product = Product {
            id: "p-1".into(),
            code: None,
            name: "Charger".into(),
            category_id: None,
            stock: 3,
            min_stock: 3,
            created_at: now,
            updated_at: now,
        };
        assert!(product.is_low_stock());
        product.stock = 4;
        assert!(!product.is_low_stock());
        product.min_stock = 0;
        product.stock = 0;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&DefectSource::SalesReturn).unwrap(), "\"sales_return\"");
        assert_eq!(serde_json::to_string(&PaymentStatus::Partial).unwrap(), "\"partial\"");
        assert_eq!(OpnameStatus::Cancelled.as_str(), "cancelled");
    }
}
